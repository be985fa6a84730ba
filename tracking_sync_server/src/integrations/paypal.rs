use log::*;
use paypal_tools::{PaypalApi, PaypalApiError, Tracker, TrackerBatchOutcome};
use pts_common::Secret;
use tracking_sync_engine::{
    sync_objects::{ProviderGrant, ShipmentTracker, SyncOutcome},
    traits::{TrackingProvider, TrackingProviderError},
};

/// [`TrackingProvider`] over the PayPal client. Carrier names are mapped to PayPal carrier codes here.
#[derive(Clone)]
pub struct PaypalTracking {
    api: PaypalApi,
}

impl PaypalTracking {
    pub fn new(api: PaypalApi) -> Self {
        Self { api }
    }
}

impl TrackingProvider for PaypalTracking {
    async fn submit_trackers(
        &self,
        trackers: &[ShipmentTracker],
        access_token: &Secret<String>,
    ) -> Result<SyncOutcome, TrackingProviderError> {
        let trackers = trackers.iter().map(to_paypal_tracker).collect::<Vec<_>>();
        let outcome = self.api.add_trackers_batch(&trackers, access_token).await.map_err(|e| match e {
            PaypalApiError::TooManyTrackers { count, max } => TrackingProviderError::BatchTooLarge { count, max },
            e => TrackingProviderError::Transport(e.to_string()),
        })?;
        Ok(sync_outcome(outcome))
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &Secret<String>,
    ) -> Result<Secret<String>, TrackingProviderError> {
        let grant = self
            .api
            .refresh_access_token(refresh_token)
            .await
            .map_err(|e| TrackingProviderError::RefreshRejected(e.to_string()))?;
        Ok(grant.access_token)
    }

    async fn exchange_authorization_code(&self, code: &str) -> Result<ProviderGrant, TrackingProviderError> {
        let grant = self
            .api
            .exchange_authorization_code(code)
            .await
            .map_err(|e| TrackingProviderError::AuthorizationRejected(e.to_string()))?;
        let refresh_token = grant.refresh_token.ok_or_else(|| {
            TrackingProviderError::AuthorizationRejected("PayPal did not issue a refresh token".to_string())
        })?;
        // The e-mail is informational, so a failed identity lookup does not fail the connection
        let email = match self.api.fetch_identity(&grant.access_token).await {
            Ok(identity) => identity.primary_email().map(String::from),
            Err(e) => {
                warn!("💳️ Could not look up the PayPal account identity. {e}");
                None
            },
        };
        Ok(ProviderGrant { access_token: grant.access_token, refresh_token, email })
    }
}

pub fn to_paypal_tracker(tracker: &ShipmentTracker) -> Tracker {
    Tracker::shipped(tracker.transaction_id.as_str(), tracker.tracking_number.as_str(), tracker.carrier.as_deref())
}

fn sync_outcome(outcome: TrackerBatchOutcome) -> SyncOutcome {
    match outcome {
        TrackerBatchOutcome::Accepted | TrackerBatchOutcome::AcceptedWithErrors(_) => SyncOutcome::Success,
        TrackerBatchOutcome::InvalidToken => SyncOutcome::AuthFailure,
    }
}
