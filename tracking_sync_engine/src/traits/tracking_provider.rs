use pts_common::Secret;
use thiserror::Error;

use crate::sync_objects::{ProviderGrant, ShipmentTracker, SyncOutcome};

#[derive(Debug, Clone, Error)]
pub enum TrackingProviderError {
    #[error("The tracking provider could not be reached: {0}")]
    Transport(String),
    #[error("The tracking provider refused to refresh the access token: {0}")]
    RefreshRejected(String),
    #[error("The tracking provider refused the authorization code: {0}")]
    AuthorizationRejected(String),
    #[error("Too many trackers in one batch: {count} (max {max})")]
    BatchTooLarge { count: usize, max: usize },
}

/// The payment provider's shipment-tracking API.
#[allow(async_fn_in_trait)]
pub trait TrackingProvider {
    /// Submits one batch of trackers with the given access token.
    ///
    /// Every response the provider sends back maps to an outcome: an `invalid_token` error is
    /// [`SyncOutcome::AuthFailure`], anything else (including item-level errors) is [`SyncOutcome::Success`]. An
    /// `Err` means that no response was received at all.
    async fn submit_trackers(
        &self,
        trackers: &[ShipmentTracker],
        access_token: &Secret<String>,
    ) -> Result<SyncOutcome, TrackingProviderError>;

    /// Exchanges a refresh token for a new access token. A single remote call; a rejection is not retried.
    async fn refresh_access_token(
        &self,
        refresh_token: &Secret<String>,
    ) -> Result<Secret<String>, TrackingProviderError>;

    /// Completes the provider OAuth flow for a merchant.
    async fn exchange_authorization_code(&self, code: &str) -> Result<ProviderGrant, TrackingProviderError>;
}
