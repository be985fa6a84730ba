//! The live path: one storefront fulfilment event per call.
//!
//! The call runs to completion before returning. Benign conditions (unknown merchant, order not paid through the
//! tracked gateway, no successful transaction, ...) are reported as [`FulfillmentOutcome::Skipped`]. A provider
//! failure ends as a FAILED order record, never as an `Err`. Only store errors propagate.
use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db::traits::{LiveOrderInsert, SyncDatabase},
    db_types::{Merchant, NewOrderRecord},
    helpers::start_of_month,
    sync_api::{
        credential_guard::{CredentialGuard, GuardedOutcome},
        errors::SyncError,
        sync_config::SyncConfig,
    },
    sync_objects::{
        successful_transaction_id,
        FulfilledOrder,
        FulfillmentOutcome,
        ShipmentTracker,
        SkipReason,
        SyncOutcome,
    },
    traits::{StorefrontApi, TrackingProvider},
};

pub struct FulfillmentApi<B, S, P> {
    config: SyncConfig,
    db: B,
    storefront: S,
    provider: P,
    guard: CredentialGuard,
}

impl<B, S, P> Debug for FulfillmentApi<B, S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FulfillmentApi")
    }
}

impl<B, S, P> FulfillmentApi<B, S, P> {
    pub fn new(config: SyncConfig, db: B, storefront: S, provider: P, guard: CredentialGuard) -> Self {
        Self { config, db, storefront, provider, guard }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn storefront(&self) -> &S {
        &self.storefront
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<B, S, P> FulfillmentApi<B, S, P>
where
    B: SyncDatabase,
    S: StorefrontApi,
    P: TrackingProvider,
{
    /// Handles one fulfilled order for the shop with the given domain.
    ///
    /// 1. The merchant is looked up by domain. Unknown and uninstalled merchants are skipped.
    /// 2. Orders not paid through the tracked gateway are skipped.
    /// 3. The transaction id of the first successful transaction is resolved. Without one, the order is skipped.
    /// 4. The order record is created as PROCESSING, or as INSUFFICIENT_CREDITS if the monthly quota is used up. The
    ///    quota check and the insert are one atomic store operation.
    /// 5. An order without usable tracking numbers is finalised as FAILED straight away and reported as skipped. Its
    ///    record stays for the audit trail and does not count towards the quota.
    /// 6. Otherwise the tracking numbers are submitted through the credential guard (one refresh, one retry).
    /// 7. The record is finalised exactly once: PROCESSED on success, FAILED on anything else.
    pub async fn handle_fulfilled_order(
        &self,
        shop_domain: &str,
        order: FulfilledOrder,
    ) -> Result<FulfillmentOutcome, SyncError> {
        let Some(merchant) = self.db.fetch_merchant_by_domain(shop_domain).await? else {
            info!("🚚️ {shop_domain} is not a registered merchant. Ignoring order {}", order.name);
            return Ok(FulfillmentOutcome::Skipped(SkipReason::UnknownMerchant));
        };
        if merchant.uninstalled {
            info!("🚚️ {shop_domain} has uninstalled the app. Ignoring order {}", order.name);
            return Ok(FulfillmentOutcome::Skipped(SkipReason::MerchantUninstalled));
        }
        if !order.is_paid_with(&self.config.tracked_gateway) {
            debug!("🚚️ Order {} of {shop_domain} was not paid with {}", order.name, self.config.tracked_gateway);
            return Ok(FulfillmentOutcome::Skipped(SkipReason::NotProviderPaid));
        }
        let Some(transaction_id) = resolve_transaction_id(&self.storefront, &merchant, order.id).await else {
            info!("🚚️ Order {} of {shop_domain} has no successful transaction", order.name);
            return Ok(FulfillmentOutcome::Skipped(SkipReason::NoTransaction));
        };
        let trackers = order
            .tracking
            .iter()
            .filter_map(|entry| ShipmentTracker::from_entry(transaction_id.as_str(), entry))
            .collect::<Vec<_>>();
        let record = NewOrderRecord::live(merchant.id.as_str(), order.id, order.name.as_str(), transaction_id.as_str())
            .with_tracking(order.tracking.clone());
        let quota = merchant.plan.quota();
        let id = match self.db.record_live_order(record, quota, start_of_month(Utc::now())).await? {
            LiveOrderInsert::Processing(id) => id,
            LiveOrderInsert::InsufficientCredits(id) => {
                info!(
                    "🚚️ {} has used its {} quota for the month. Order {} (#{id}) is not synchronised",
                    merchant.id, merchant.plan, order.name
                );
                return Ok(FulfillmentOutcome::InsufficientCredits);
            },
            LiveOrderInsert::AlreadyExists(id) => {
                info!("🚚️ Order {} of {} is already recorded (#{id})", order.name, merchant.id);
                return Ok(FulfillmentOutcome::Skipped(SkipReason::Duplicate));
            },
        };
        if trackers.is_empty() {
            info!("🚚️ Order {} of {shop_domain} has no tracking numbers. It is recorded as FAILED (#{id})", order.name);
            self.db.finalize_live_order(id, false).await?;
            return Ok(FulfillmentOutcome::Skipped(SkipReason::NoTrackingNumbers));
        }
        let synced = match self.synchronize(&merchant.id, &trackers).await {
            Ok(outcome) => outcome.is_success(),
            Err(e) => {
                warn!("🚚️ Could not synchronise order {} of {}. {e}", order.name, merchant.id);
                false
            },
        };
        self.db.finalize_live_order(id, synced).await?;
        if synced {
            info!("🚚️ Order {} of {} synchronised ({} trackers)", order.name, merchant.id, trackers.len());
            Ok(FulfillmentOutcome::Processed)
        } else {
            warn!("🚚️ Order {} of {} could not be synchronised and is marked FAILED", order.name, merchant.id);
            Ok(FulfillmentOutcome::Failed)
        }
    }

    /// Submits the order's trackers in provider-sized batches. An auth failure on any batch fails the attempt, and the
    /// retry after the refresh resubmits all of them.
    async fn synchronize(&self, merchant_id: &str, trackers: &[ShipmentTracker]) -> Result<GuardedOutcome, SyncError> {
        let provider = &self.provider;
        let batch_size = self.config.chunk_size();
        self.guard
            .submit_with_refresh(&self.db, &self.provider, merchant_id, move |token| async move {
                for batch in trackers.chunks(batch_size) {
                    if provider.submit_trackers(batch, &token).await? == SyncOutcome::AuthFailure {
                        return Ok(SyncOutcome::AuthFailure);
                    }
                }
                Ok(SyncOutcome::Success)
            })
            .await
    }
}

/// Finds the provider transaction id for a storefront order. Lookup failures are logged and treated as "no
/// transaction".
pub(crate) async fn resolve_transaction_id<S: StorefrontApi>(
    storefront: &S,
    merchant: &Merchant,
    order_id: i64,
) -> Option<String> {
    match storefront.fetch_transactions(merchant, order_id).await {
        Ok(transactions) => successful_transaction_id(&transactions),
        Err(e) => {
            warn!("🛍️ Could not fetch the transactions of order {order_id} for {}. {e}", merchant.id);
            None
        },
    }
}
