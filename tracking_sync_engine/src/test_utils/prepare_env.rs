use std::path::Path;

use log::*;
use pts_common::Secret;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{
    db_types::{Merchant, NewMerchant, Plan, PlanStatus},
    MerchantManagement,
    SqliteDatabase,
};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

/// A fresh database file in the system temp directory.
pub fn random_db_path() -> String {
    let path = std::env::temp_dir().join(format!("pts_test_store_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 1).await.expect("Error creating connection to database");
    db.run_migrations().await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    if let Err(e) = Sqlite::drop_database(p).await {
        trace!("Could not drop database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("Created Sqlite database {p}");
}

/// Registers `{id}.myshopify.com` on the given plan and connects it to the provider with the token pair
/// `access-0` / `refresh-0`.
pub async fn connected_merchant(db: &SqliteDatabase, id: &str, plan: Plan) -> Merchant {
    let merchant = NewMerchant::new(id, format!("{id}.myshopify.com"), Secret::from("shpat_test"))
        .with_plan(plan, PlanStatus::Active);
    db.register_merchant(merchant).await.expect("Error registering merchant");
    db.store_provider_credentials(id, &Secret::from("access-0"), &Secret::from("refresh-0"), None)
        .await
        .expect("Error storing provider credentials");
    db.fetch_merchant(id).await.expect("Error fetching merchant").expect("Merchant should exist")
}
