//! `SqliteDatabase` is the concrete SQLite backend of the tracking sync engine.
//!
//! It implements all the traits defined in [`crate::db::traits`].
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use pts_common::Secret;
use sqlx::{migrate, SqlitePool};

use super::{backfill_jobs, db_url, merchants, new_pool, orders, SqliteDatabaseError};
use crate::{
    db::traits::{
        BackfillManagement,
        LiveOrderInsert,
        MerchantManagement,
        OrderRecordManagement,
        SyncDatabase,
        SyncDatabaseError,
    },
    db_types::{
        BackfillJob,
        Merchant,
        NewMerchant,
        NewOrderRecord,
        OrderRecord,
        OrderRecordFilter,
        Plan,
        PlanStatus,
        Quota,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SyncDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }
}

impl MerchantManagement for SqliteDatabase {
    async fn register_merchant(&self, merchant: NewMerchant) -> Result<Merchant, SyncDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let merchant = merchants::upsert_merchant(merchant, &mut conn).await?;
        debug!("🗃️ Merchant {} ({}) registered", merchant.id, merchant.shop_domain);
        Ok(merchant)
    }

    async fn fetch_merchant(&self, merchant_id: &str) -> Result<Option<Merchant>, SyncDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        merchants::fetch_merchant(merchant_id, &mut conn).await
    }

    async fn fetch_merchant_by_domain(&self, shop_domain: &str) -> Result<Option<Merchant>, SyncDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        merchants::fetch_merchant_by_domain(shop_domain, &mut conn).await
    }

    async fn update_plan(
        &self,
        merchant_id: &str,
        plan: Plan,
        status: PlanStatus,
    ) -> Result<Merchant, SyncDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let merchant = merchants::update_plan(merchant_id, plan, status, &mut conn)
            .await?
            .ok_or_else(|| SyncDatabaseError::MerchantNotFound(merchant_id.to_string()))?;
        info!("🗃️ Merchant {merchant_id} is now on plan {plan} ({status})");
        Ok(merchant)
    }

    async fn store_provider_credentials(
        &self,
        merchant_id: &str,
        access_token: &Secret<String>,
        refresh_token: &Secret<String>,
        email: Option<&str>,
    ) -> Result<(), SyncDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        if merchants::store_provider_credentials(merchant_id, access_token, refresh_token, email, &mut conn).await? {
            Ok(())
        } else {
            Err(SyncDatabaseError::MerchantNotFound(merchant_id.to_string()))
        }
    }

    async fn update_provider_access_token(
        &self,
        merchant_id: &str,
        access_token: &Secret<String>,
    ) -> Result<(), SyncDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        if merchants::update_provider_access_token(merchant_id, access_token, &mut conn).await? {
            Ok(())
        } else {
            Err(SyncDatabaseError::MerchantNotFound(merchant_id.to_string()))
        }
    }

    async fn mark_uninstalled(&self, shop_domain: &str) -> Result<Option<Merchant>, SyncDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        merchants::mark_uninstalled(shop_domain, &mut conn).await
    }
}

impl OrderRecordManagement for SqliteDatabase {
    async fn record_live_order(
        &self,
        order: NewOrderRecord,
        quota: Quota,
        period_start: DateTime<Utc>,
    ) -> Result<LiveOrderInsert, SyncDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_live_order(order, quota, period_start, &mut conn).await
    }

    async fn finalize_live_order(&self, id: i64, synced: bool) -> Result<Option<OrderRecord>, SyncDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        if !orders::finalize_live_order(id, synced, &mut conn).await? {
            warn!("🗃️ Order record {id} is not PROCESSING. Its status was left unchanged.");
        }
        orders::fetch_by_id(id, &mut conn).await
    }

    async fn fetch_order_records(&self, filter: OrderRecordFilter) -> Result<Vec<OrderRecord>, SyncDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::search_orders(filter, &mut conn).await
    }

    async fn mark_chunk_processed(
        &self,
        merchant_id: &str,
        chunk: &[(i64, String)],
    ) -> Result<u64, SyncDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let mut updated = 0u64;
        for (shopify_id, transaction_id) in chunk {
            if orders::mark_processed(merchant_id, *shopify_id, transaction_id, now, &mut tx).await? {
                updated += 1;
            } else {
                trace!("🗃️ Order {shopify_id} of {merchant_id} is not PENDING. Skipping.");
            }
        }
        tx.commit().await?;
        debug!("🗃️ {updated} of {} orders of {merchant_id} marked PROCESSED", chunk.len());
        Ok(updated)
    }
}

impl BackfillManagement for SqliteDatabase {
    async fn begin_backfill(
        &self,
        merchant_id: &str,
        records: Vec<NewOrderRecord>,
    ) -> Result<Option<BackfillJob>, SyncDatabaseError> {
        let mut tx = self.pool.begin().await?;
        // Write first, so the transaction holds the write lock from the start.
        if !merchants::claim_backfill(merchant_id, &mut tx).await? {
            return match merchants::fetch_merchant(merchant_id, &mut tx).await? {
                Some(_) => {
                    debug!("🗃️ Backfill for {merchant_id} was already claimed");
                    Ok(None)
                },
                None => Err(SyncDatabaseError::MerchantNotFound(merchant_id.to_string())),
            };
        }
        let mut inserted = 0i64;
        for record in records {
            if orders::insert_historical_order(record, &mut tx).await? {
                inserted += 1;
            }
        }
        let job = backfill_jobs::insert_job(merchant_id, inserted, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Backfill job #{} created for {merchant_id} with {inserted} pending orders", job.id);
        Ok(Some(job))
    }

    async fn fetch_unfinished_backfill_jobs(&self) -> Result<Vec<BackfillJob>, SyncDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        backfill_jobs::fetch_unfinished_jobs(&mut conn).await
    }

    async fn complete_backfill_job(&self, job_id: i64) -> Result<(), SyncDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        backfill_jobs::complete_job(job_id, &mut conn).await
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `PTS_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date.
    pub async fn run_migrations(&self) -> Result<(), SqliteDatabaseError> {
        migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
