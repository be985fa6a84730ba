use chrono::{DateTime, Utc};

use crate::{
    db::traits::{LiveOrderInsert, SyncDatabaseError},
    db_types::{NewOrderRecord, OrderRecord, OrderRecordFilter, Quota},
};

#[allow(async_fn_in_trait)]
pub trait OrderRecordManagement {
    /// Inserts a non-historical order record in a single atomic statement.
    ///
    /// The merchant's usage for the period is the number of non-historical records that were PROCESSED since
    /// `period_start`, plus the PROCESSING records created since then. If the quota allows another sync, the record is
    /// created as PROCESSING, otherwise as INSUFFICIENT_CREDITS. If a record for the same (merchant, storefront order)
    /// already exists, nothing is written and [`LiveOrderInsert::AlreadyExists`] is returned.
    async fn record_live_order(
        &self,
        order: NewOrderRecord,
        quota: Quota,
        period_start: DateTime<Utc>,
    ) -> Result<LiveOrderInsert, SyncDatabaseError>;

    /// Moves a PROCESSING record to PROCESSED (stamping `synchronized_at`) if `synced` is true, or to FAILED otherwise.
    /// Records in any other state are left alone. Returns the record as it is after the call.
    async fn finalize_live_order(&self, id: i64, synced: bool) -> Result<Option<OrderRecord>, SyncDatabaseError>;

    /// Fetches records matching the filter, oldest first.
    async fn fetch_order_records(&self, filter: OrderRecordFilter) -> Result<Vec<OrderRecord>, SyncDatabaseError>;

    /// Marks every PENDING record of the chunk as PROCESSED in one transaction. Each entry is a
    /// (storefront order id, transaction id) pair. The transaction id is only written if the record does not have one
    /// yet. Returns the number of records that changed.
    async fn mark_chunk_processed(
        &self,
        merchant_id: &str,
        orders: &[(i64, String)],
    ) -> Result<u64, SyncDatabaseError>;
}
