//! # Tracking sync engine public API
//!
//! Each API is constructed from a database backend and the remote collaborators it needs, so that the host can pick
//! and choose the functionality it exposes.
//!
//! * [`fulfillment_api`] is the live path: one storefront fulfilment event in, one synchronised order record out.
//! * [`backfill_api`] accepts a merchant's one-time historical backfill and runs it in the background.
//! * [`merchant_api`] registers merchants, changes their plans and connects their payment provider account.
//!
//! The rate limiter and the credential guard in [`rate_limit`] and [`credential_guard`] are shared building blocks of
//! the two synchronisation paths.
//!
//! # API usage
//!
//! ```rust,ignore
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = FulfillmentApi::new(SyncConfig::default(), db, storefront, provider, CredentialGuard::default());
//! let outcome = api.handle_fulfilled_order("my-shop.myshopify.com", order).await?;
//! ```
pub mod backfill_api;
pub mod credential_guard;
pub mod errors;
pub mod fulfillment_api;
pub mod merchant_api;
pub mod rate_limit;
pub mod sync_config;
pub mod sync_objects;
