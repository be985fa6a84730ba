//! The historical backfill.
//!
//! A backfill happens once per merchant and is split in two:
//!
//! * [`BackfillApi::start_historical_backfill`] runs while the trigger waits. It fetches the storefront's order
//!   history, keeps the fulfilled orders paid through the tracked gateway, and, in one store transaction, sets the
//!   merchant's `backfill_done` flag, stores a PENDING record per order and creates a durable job.
//! * [`BackfillApi::run_backfill`] runs later on the background worker. It resolves transaction ids concurrently,
//!   then pushes the records to the provider in chunks, one chunk at a time, through the shared token bucket and the
//!   credential guard. A successful chunk is committed as PROCESSED in one transaction. A failed chunk is left
//!   PENDING and the run carries on with the next one.
use std::{fmt::Debug, sync::Arc};

use futures_util::{stream, StreamExt};
use log::*;

use crate::{
    db::traits::SyncDatabase,
    db_types::{BackfillJob, NewOrderRecord, OrderRecord, OrderRecordFilter, OrderStatusType},
    sync_api::{
        credential_guard::{CredentialGuard, GuardedOutcome},
        errors::SyncError,
        fulfillment_api::resolve_transaction_id,
        rate_limit::TokenBucket,
        sync_config::SyncConfig,
    },
    sync_objects::{BackfillAck, BackfillReport, ShipmentTracker},
    traits::{StorefrontApi, TrackingProvider},
};

pub struct BackfillApi<B, S, P> {
    config: SyncConfig,
    db: B,
    storefront: S,
    provider: P,
    guard: CredentialGuard,
    bucket: Arc<TokenBucket>,
}

impl<B, S, P> Debug for BackfillApi<B, S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BackfillApi({:?})", self.bucket)
    }
}

impl<B, S, P> BackfillApi<B, S, P> {
    pub fn new(config: SyncConfig, db: B, storefront: S, provider: P, guard: CredentialGuard) -> Self {
        let bucket = Arc::new(TokenBucket::from_config(&config));
        Self { config, db, storefront, provider, guard, bucket }
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

    pub fn guard(&self) -> &CredentialGuard {
        &self.guard
    }
}

impl<B, S, P> BackfillApi<B, S, P>
where
    B: SyncDatabase,
    S: StorefrontApi,
    P: TrackingProvider,
{
    /// Accepts the merchant's one-time backfill and stores its PENDING records.
    ///
    /// Returns [`BackfillAck::AlreadyDone`] without touching the storefront if the merchant's backfill has already been
    /// accepted. Uninstalled merchants and merchants without provider credentials are refused before the storefront is
    /// read. In those cases, and when the storefront cannot be read, the error is returned and the flag stays unset, so
    /// the backfill can be requested again.
    pub async fn start_historical_backfill(&self, merchant_id: &str) -> Result<BackfillAck, SyncError> {
        let merchant = self
            .db
            .fetch_merchant(merchant_id)
            .await?
            .ok_or_else(|| SyncError::MerchantNotFound(merchant_id.to_string()))?;
        if merchant.backfill_done {
            info!("📦️ The backfill for {merchant_id} has already been done. Ignoring the request.");
            return Ok(BackfillAck::AlreadyDone);
        }
        if merchant.uninstalled {
            warn!("📦️ {merchant_id} has uninstalled the app. The backfill was not started.");
            return Err(SyncError::MerchantUninstalled(merchant_id.to_string()));
        }
        if !merchant.has_provider_credentials() {
            warn!("📦️ {merchant_id} has not connected a provider account yet. The backfill was not started.");
            return Err(SyncError::ProviderNotConnected(merchant_id.to_string()));
        }
        let orders = self.storefront.fetch_orders(&merchant).await?;
        let total = orders.len();
        let records = orders
            .into_iter()
            .filter(|o| o.has_fulfillments() && o.is_paid_with(&self.config.tracked_gateway))
            .map(|o| NewOrderRecord::historical(merchant_id, o.id, o.name.as_str()).with_tracking(o.tracking))
            .collect::<Vec<_>>();
        info!("📦️ {} of {total} historical orders of {merchant_id} are eligible for the backfill", records.len());
        match self.db.begin_backfill(merchant_id, records).await? {
            Some(job) => Ok(BackfillAck::Started(job)),
            None => {
                info!("📦️ The backfill for {merchant_id} was accepted by another request in the meantime");
                Ok(BackfillAck::AlreadyDone)
            },
        }
    }

    /// Jobs that were accepted but never finished, e.g. because the process stopped.
    pub async fn unfinished_jobs(&self) -> Result<Vec<BackfillJob>, SyncError> {
        Ok(self.db.fetch_unfinished_backfill_jobs().await?)
    }

    /// Synchronises the PENDING records of a backfill job, then marks the job complete.
    ///
    /// Chunk failures do not abort the run. They are counted in the report and their records stay PENDING.
    pub async fn run_backfill(&self, job: &BackfillJob) -> Result<BackfillReport, SyncError> {
        let merchant_id = job.merchant_id.as_str();
        let merchant = self
            .db
            .fetch_merchant(merchant_id)
            .await?
            .ok_or_else(|| SyncError::MerchantNotFound(merchant_id.to_string()))?;
        let filter = OrderRecordFilter::for_merchant(merchant_id)
            .with_historical(true)
            .with_status(OrderStatusType::Pending);
        let pending = self.db.fetch_order_records(filter).await?;
        info!("📦️ Backfill job #{} for {merchant_id}: {} pending orders", job.id, pending.len());

        let storefront = &self.storefront;
        let merchant = &merchant;
        let resolved = stream::iter(pending)
            .map(move |record| async move {
                let transaction_id = if record.transaction_id.is_empty() {
                    resolve_transaction_id(storefront, merchant, record.shopify_id).await.unwrap_or_default()
                } else {
                    record.transaction_id.clone()
                };
                (record, transaction_id)
            })
            .buffer_unordered(self.config.resolve_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;
        let unresolved = resolved.iter().filter(|(_, tx)| tx.is_empty()).count();
        if unresolved > 0 {
            warn!("📦️ {unresolved} orders of {merchant_id} have no resolvable transaction and will not be sent");
        }

        let mut report = BackfillReport {
            job_id: job.id,
            merchant_id: merchant_id.to_string(),
            orders: resolved.len(),
            ..Default::default()
        };
        for (n, chunk) in resolved.chunks(self.config.chunk_size()).enumerate() {
            report.chunks += 1;
            let trackers = chunk_trackers(chunk);
            if trackers.is_empty() {
                info!("📦️ Chunk {n} of {merchant_id} has nothing to send. Its orders stay PENDING.");
                report.chunks_failed += 1;
                continue;
            }
            match self.sync_chunk(merchant_id, &trackers).await {
                Ok(outcome) if outcome.is_success() => {
                    report.token_refreshes += usize::from(outcome.refreshed);
                    let orders = chunk.iter().map(|(r, tx)| (r.shopify_id, tx.clone())).collect::<Vec<_>>();
                    match self.db.mark_chunk_processed(merchant_id, &orders).await {
                        Ok(count) => {
                            debug!("📦️ Chunk {n} of {merchant_id} synchronised. {count} orders PROCESSED");
                            report.chunks_synced += 1;
                            report.orders_processed += count;
                        },
                        Err(e) => {
                            error!("📦️ Chunk {n} of {merchant_id} was synchronised, but could not be committed. {e}");
                            report.chunks_failed += 1;
                        },
                    }
                },
                Ok(outcome) => {
                    report.token_refreshes += usize::from(outcome.refreshed);
                    warn!("📦️ Chunk {n} of {merchant_id} was rejected after a token refresh. Its orders stay PENDING");
                    report.chunks_failed += 1;
                },
                Err(e) => {
                    warn!("📦️ Chunk {n} of {merchant_id} could not be synchronised. Its orders stay PENDING. {e}");
                    report.chunks_failed += 1;
                },
            }
        }
        self.db.complete_backfill_job(job.id).await?;
        info!(
            "📦️ Backfill job #{} for {merchant_id} finished. {} of {} chunks synchronised, {} orders PROCESSED",
            job.id, report.chunks_synced, report.chunks, report.orders_processed
        );
        Ok(report)
    }

    /// One chunk, one guarded attempt. Every provider call, including the retry, goes through the token bucket.
    async fn sync_chunk(&self, merchant_id: &str, trackers: &[ShipmentTracker]) -> Result<GuardedOutcome, SyncError> {
        let provider = &self.provider;
        let bucket = &*self.bucket;
        self.guard
            .submit_with_refresh(&self.db, &self.provider, merchant_id, move |token| async move {
                bucket.run(provider.submit_trackers(trackers, &token)).await
            })
            .await
    }
}

/// The trackers to send for a chunk: one per order that has a transaction id and a successful fulfilment with a
/// tracking number.
fn chunk_trackers(chunk: &[(OrderRecord, String)]) -> Vec<ShipmentTracker> {
    chunk
        .iter()
        .filter(|(_, transaction_id)| !transaction_id.is_empty())
        .filter_map(|(record, transaction_id)| {
            record
                .tracking
                .iter()
                .find(|e| e.is_successful() && e.has_tracking_number())
                .and_then(|e| ShipmentTracker::from_entry(transaction_id.as_str(), e))
        })
        .collect()
}
