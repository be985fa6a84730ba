use crate::db::traits::{BackfillManagement, MerchantManagement, OrderRecordManagement};

/// The highest level of behaviour for backends supporting the tracking sync engine.
pub trait SyncDatabase: Clone + MerchantManagement + OrderRecordManagement + BackfillManagement {
    /// The URL of the database
    fn url(&self) -> &str;
}
