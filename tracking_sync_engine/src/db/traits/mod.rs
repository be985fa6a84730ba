//! #  Order Record Store Adapter.
//!
//! This module defines the interface contracts that database *backends* must satisfy in order to back the tracking
//! sync engine.
//!
//! ## Merchants
//! A merchant is one storefront tenant. It carries the storefront access token, the payment provider token pair, the
//! subscription plan and the one-shot `backfill_done` flag.
//!
//! ## Order records
//! An order record is the synchronisation trail of a single storefront order. Records are keyed by
//! (merchant id, storefront order id), so a live webhook and a backfill can never both create a record for the same
//! order.
//!
//! ## Traits
//! * [`MerchantManagement`] reads and writes merchants and their credentials.
//! * [`OrderRecordManagement`] creates, finalises and queries order records, including the atomic quota-checked
//!   insert used by the webhook path and the batched chunk commit used by backfills.
//! * [`BackfillManagement`] accepts a backfill exactly once per merchant and keeps a durable job record.
//! * [`SyncDatabase`] is the umbrella trait the engine APIs are generic over.
mod backfill_management;
mod data_objects;
mod errors;
mod merchant_management;
mod order_record_management;
mod sync_database;

pub use backfill_management::BackfillManagement;
pub use data_objects::{InsertOrderResult, LiveOrderInsert};
pub use errors::SyncDatabaseError;
pub use merchant_management::MerchantManagement;
pub use order_record_management::OrderRecordManagement;
pub use sync_database::SyncDatabase;
