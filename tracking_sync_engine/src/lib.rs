//! Tracking Sync Engine
//!
//! The engine copies storefront fulfilments (shipped orders and their tracking numbers) into the payment provider's
//! shipment-tracking API, so that the provider sees the captured payment as shipped. It is provider-agnostic: the
//! storefront and the provider are reached through the traits in [`mod@traits`], which the host implements.
//!
//! The library is divided into these sections:
//! 1. Database management ([`mod@db`]). The backend traits describe the order record store; SQLite is the supported
//!    backend. The data types stored in the database live in [`mod@db_types`].
//! 2. The public API ([`mod@sync_api`]):
//!    * [`FulfillmentApi`] handles live fulfilment webhooks, one order at a time.
//!    * [`BackfillApi`] accepts a merchant's one-time historical backfill and synchronises it in rate-limited chunks.
//!    * [`MerchantApi`] manages merchants, their plans and their provider connection.
//! 3. Background work ([`mod@jobs`]). Accepted backfills are handed to a single [`BackfillWorker`].
pub mod db;
pub mod db_types;
pub mod helpers;
pub mod jobs;
pub mod sync_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{
    BackfillManagement,
    InsertOrderResult,
    LiveOrderInsert,
    MerchantManagement,
    OrderRecordManagement,
    SyncDatabase,
    SyncDatabaseError,
};
pub use jobs::{BackfillQueue, BackfillWorker, JobHandler};
pub use sync_api::{
    backfill_api::BackfillApi,
    credential_guard::{CredentialGuard, GuardedOutcome},
    errors::SyncError,
    fulfillment_api::FulfillmentApi,
    merchant_api::{MerchantApi, WEBHOOK_SUBSCRIPTIONS},
    rate_limit::TokenBucket,
    sync_config::SyncConfig,
    sync_objects,
};
