//! # SQLite backend
//!
//! The low-level queries live in [`merchants`], [`orders`] and [`backfill_jobs`] as plain functions that accept a
//! `&mut SqliteConnection`. Callers can pass a pooled connection, or `&mut *tx` when several calls must be atomic.
//! [`SqliteDatabase`] stitches them together into the backend traits.
mod db;
mod errors;

pub mod backfill_jobs;
pub mod merchants;
pub mod orders;

use std::env;

pub use db::SqliteDatabase;
pub use errors::SqliteDatabaseError;
use log::info;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

const SQLITE_DB_URL: &str = "sqlite://data/tracking_sync.db";

pub fn db_url() -> String {
    let result = env::var("PTS_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ PTS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqliteDatabaseError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
