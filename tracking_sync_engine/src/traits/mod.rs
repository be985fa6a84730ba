//! # Remote collaborators
//!
//! The engine never talks to the storefront or the payment provider directly. The host application supplies an
//! implementation of these traits, usually thin wrappers around the REST clients in `shopify_tools` and
//! `paypal_tools`.
//!
//! * [`StorefrontApi`] lists orders and order transactions, and installs webhooks.
//! * [`TrackingProvider`] submits tracker batches and manages the provider's OAuth tokens.
mod storefront;
mod tracking_provider;

pub use storefront::{StorefrontApi, StorefrontError};
pub use tracking_provider::{TrackingProvider, TrackingProviderError};
