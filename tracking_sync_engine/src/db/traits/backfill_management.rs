use crate::{
    db::traits::SyncDatabaseError,
    db_types::{BackfillJob, NewOrderRecord},
};

#[allow(async_fn_in_trait)]
pub trait BackfillManagement {
    /// Accepts the historical backfill for a merchant, in one transaction:
    /// * flips `backfill_done` from false to true. If it was already true, nothing is written and `None` is returned,
    /// * inserts `records` as PENDING historical order records, skipping storefront orders that already have one,
    /// * creates the durable job record.
    async fn begin_backfill(
        &self,
        merchant_id: &str,
        records: Vec<NewOrderRecord>,
    ) -> Result<Option<BackfillJob>, SyncDatabaseError>;

    async fn fetch_unfinished_backfill_jobs(&self) -> Result<Vec<BackfillJob>, SyncDatabaseError>;

    async fn complete_backfill_job(&self, job_id: i64) -> Result<(), SyncDatabaseError>;
}
