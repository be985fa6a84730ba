//! Recovery from rejected provider access tokens.
//!
//! The guard runs a submission with the merchant's current access token. If the provider answers with
//! [`SyncOutcome::AuthFailure`], the guard refreshes the token once, persists it on the merchant and retries the
//! submission once. Whatever the retry returns is final.
//!
//! The webhook path and a backfill can hit an expired token for the same merchant at the same time. Refreshes are
//! therefore serialised per merchant: the second caller waits, re-reads the merchant, and reuses the token the first
//! caller stored instead of refreshing again.
use std::{
    collections::HashMap,
    fmt::Debug,
    future::Future,
    sync::{Arc, Mutex},
};

use log::*;
use pts_common::Secret;

use crate::{
    db::traits::MerchantManagement,
    db_types::Merchant,
    sync_api::errors::SyncError,
    sync_objects::SyncOutcome,
    traits::{TrackingProvider, TrackingProviderError},
};

/// The final outcome of a guarded submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardedOutcome {
    pub outcome: SyncOutcome,
    /// True if this call refreshed the access token
    pub refreshed: bool,
}

impl GuardedOutcome {
    pub fn is_success(&self) -> bool {
        self.outcome == SyncOutcome::Success
    }
}

#[derive(Clone, Default)]
pub struct CredentialGuard {
    refresh_locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl Debug for CredentialGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CredentialGuard")
    }
}

impl CredentialGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn refresh_lock(&self, merchant_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.refresh_locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.entry(merchant_id.to_string()).or_default().clone()
    }

    /// Runs `submit` with the merchant's stored access token, refreshing and retrying once on an auth failure.
    ///
    /// `submit` may be called at most twice. An `Err` from `submit` or from the refresh ends the attempt immediately.
    pub async fn submit_with_refresh<B, P, F, Fut>(
        &self,
        db: &B,
        provider: &P,
        merchant_id: &str,
        mut submit: F,
    ) -> Result<GuardedOutcome, SyncError>
    where
        B: MerchantManagement,
        P: TrackingProvider,
        F: FnMut(Secret<String>) -> Fut,
        Fut: Future<Output = Result<SyncOutcome, TrackingProviderError>>,
    {
        let merchant = fetch_connected_merchant(db, merchant_id).await?;
        let used_token = merchant.paypal_access_token;
        let outcome = submit(used_token.clone()).await?;
        if outcome == SyncOutcome::Success {
            return Ok(GuardedOutcome { outcome, refreshed: false });
        }
        info!("🔑️ The provider rejected the access token of {merchant_id}. Refreshing it.");
        let (token, refreshed) = self.refreshed_token(db, provider, merchant_id, &used_token).await?;
        let outcome = submit(token).await?;
        if outcome == SyncOutcome::AuthFailure {
            warn!("🔑️ The provider rejected the access token of {merchant_id} again, straight after a refresh.");
        }
        Ok(GuardedOutcome { outcome, refreshed })
    }

    /// Returns a token that is newer than `rejected`. Only one caller per merchant refreshes at a time; a caller that
    /// finds the stored token already replaced uses it without another remote call.
    async fn refreshed_token<B, P>(
        &self,
        db: &B,
        provider: &P,
        merchant_id: &str,
        rejected: &Secret<String>,
    ) -> Result<(Secret<String>, bool), SyncError>
    where
        B: MerchantManagement,
        P: TrackingProvider,
    {
        let lock = self.refresh_lock(merchant_id);
        let _guard = lock.lock().await;
        let merchant = fetch_connected_merchant(db, merchant_id).await?;
        if merchant.paypal_access_token != *rejected {
            debug!("🔑️ The access token of {merchant_id} was refreshed by another task. Using the new one.");
            return Ok((merchant.paypal_access_token, false));
        }
        let token = provider.refresh_access_token(&merchant.paypal_refresh_token).await.map_err(|e| {
            error!("🔑️ Could not refresh the access token of {merchant_id}. {e}");
            e
        })?;
        db.update_provider_access_token(merchant_id, &token).await?;
        info!("🔑️ Access token of {merchant_id} refreshed and stored");
        Ok((token, true))
    }
}

async fn fetch_connected_merchant<B: MerchantManagement>(db: &B, merchant_id: &str) -> Result<Merchant, SyncError> {
    let merchant =
        db.fetch_merchant(merchant_id).await?.ok_or_else(|| SyncError::MerchantNotFound(merchant_id.to_string()))?;
    if merchant.has_provider_credentials() {
        Ok(merchant)
    } else {
        Err(SyncError::ProviderNotConnected(merchant_id.to_string()))
    }
}

#[cfg(test)]
mod test {
    use std::pin::Pin;

    use super::*;
    use crate::{
        db_types::Plan,
        sync_objects::ShipmentTracker,
        test_utils::{
            fakes::FakeProvider,
            prepare_env::{connected_merchant, prepare_test_env, random_db_path},
        },
        SqliteDatabase,
    };

    async fn setup() -> SqliteDatabase {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.unwrap();
        connected_merchant(&db, "guarded-shop", Plan::Micro).await;
        db
    }

    type SubmitFuture<'a> = Pin<Box<dyn Future<Output = Result<SyncOutcome, TrackingProviderError>> + 'a>>;

    fn submit_with<'a>(provider: &'a FakeProvider) -> impl FnMut(Secret<String>) -> SubmitFuture<'a> + 'a {
        move |token: Secret<String>| -> SubmitFuture<'a> {
            Box::pin(async move {
                let trackers: Vec<ShipmentTracker> = vec![];
                provider.submit_trackers(&trackers, &token).await
            })
        }
    }

    #[tokio::test]
    async fn success_needs_no_refresh() {
        let db = setup().await;
        let provider = FakeProvider::default();
        let guard = CredentialGuard::new();
        let result = guard.submit_with_refresh(&db, &provider, "guarded-shop", submit_with(&provider)).await.unwrap();
        assert_eq!(result, GuardedOutcome { outcome: SyncOutcome::Success, refreshed: false });
        assert_eq!(provider.refresh_count(), 0);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn auth_failure_refreshes_once_and_retries_once() {
        let db = setup().await;
        let provider = FakeProvider::default().with_outcomes(vec![SyncOutcome::AuthFailure, SyncOutcome::AuthFailure]);
        let guard = CredentialGuard::new();
        let result = guard.submit_with_refresh(&db, &provider, "guarded-shop", submit_with(&provider)).await.unwrap();
        assert_eq!(result, GuardedOutcome { outcome: SyncOutcome::AuthFailure, refreshed: true });
        assert_eq!(provider.refresh_count(), 1);
        assert_eq!(provider.call_count(), 2);
        let tokens = provider.tokens_used();
        assert_eq!(tokens, vec!["access-0".to_string(), "access-1".to_string()]);
        let merchant = db.fetch_merchant("guarded-shop").await.unwrap().unwrap();
        assert_eq!(merchant.paypal_access_token.reveal(), "access-1");
        assert_eq!(merchant.paypal_refresh_token.reveal(), "refresh-0");
    }

    #[tokio::test]
    async fn rejected_refresh_is_an_error() {
        let db = setup().await;
        let provider = FakeProvider::default().with_outcomes(vec![SyncOutcome::AuthFailure]).with_failing_refresh();
        let guard = CredentialGuard::new();
        let err = guard.submit_with_refresh(&db, &provider, "guarded-shop", submit_with(&provider)).await.unwrap_err();
        assert!(matches!(err, SyncError::ProviderError(TrackingProviderError::RefreshRejected(_))));
        assert_eq!(provider.refresh_count(), 1);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_failures_share_one_refresh() {
        let db = setup().await;
        let provider = FakeProvider::default().rejecting_token("access-0");
        let guard = CredentialGuard::new();
        let first = guard.submit_with_refresh(&db, &provider, "guarded-shop", submit_with(&provider));
        let second = guard.submit_with_refresh(&db, &provider, "guarded-shop", submit_with(&provider));
        let (a, b) = tokio::join!(first, second);
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(a.is_success() && b.is_success());
        assert_eq!(provider.refresh_count(), 1);
        assert_eq!(u8::from(a.refreshed) + u8::from(b.refreshed), 1);
    }

    #[tokio::test]
    async fn unconnected_merchant_is_rejected() {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.unwrap();
        let provider = FakeProvider::default();
        let err = CredentialGuard::new()
            .submit_with_refresh(&db, &provider, "nobody", submit_with(&provider))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::MerchantNotFound(_)));
        assert_eq!(provider.call_count(), 0);
    }
}
