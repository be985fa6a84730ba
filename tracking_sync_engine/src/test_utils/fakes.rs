//! Scriptable in-memory stand-ins for the storefront and the tracking provider.
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use pts_common::Secret;

use crate::{
    db_types::Merchant,
    sync_api::sync_config::PROVIDER_MAX_BATCH_SIZE,
    sync_objects::{FulfilledOrder, PaymentTransaction, ProviderGrant, ShipmentTracker, SyncOutcome},
    traits::{StorefrontApi, StorefrontError, TrackingProvider, TrackingProviderError},
};

#[derive(Default)]
pub struct FakeStorefront {
    orders: Vec<FulfilledOrder>,
    transactions: HashMap<i64, Vec<PaymentTransaction>>,
    failing_lookups: HashSet<i64>,
    fail_order_fetch: bool,
    fail_webhooks: bool,
    webhooks: Mutex<Vec<(String, String)>>,
    order_fetches: AtomicUsize,
}

impl FakeStorefront {
    pub fn with_order(mut self, order: FulfilledOrder) -> Self {
        self.orders.push(order);
        self
    }

    /// Gives the order a pending transaction followed by a successful one carrying `transaction_id`.
    pub fn with_transaction(mut self, order_id: i64, transaction_id: &str) -> Self {
        let pending = PaymentTransaction {
            id: order_id * 10,
            authorization: None,
            gateway: "paypal".into(),
            status: "pending".into(),
        };
        let success = PaymentTransaction {
            id: order_id * 10 + 1,
            authorization: Some(transaction_id.to_string()),
            gateway: "paypal".into(),
            status: "success".into(),
        };
        self.transactions.insert(order_id, vec![pending, success]);
        self
    }

    pub fn with_failed_transaction_lookup(mut self, order_id: i64) -> Self {
        self.failing_lookups.insert(order_id);
        self
    }

    pub fn with_failing_order_fetch(mut self) -> Self {
        self.fail_order_fetch = true;
        self
    }

    pub fn with_failing_webhooks(mut self) -> Self {
        self.fail_webhooks = true;
        self
    }

    /// (topic, address) pairs, in installation order
    pub fn installed_webhooks(&self) -> Vec<(String, String)> {
        self.webhooks.lock().unwrap().clone()
    }

    pub fn order_fetch_count(&self) -> usize {
        self.order_fetches.load(Ordering::SeqCst)
    }
}

impl StorefrontApi for FakeStorefront {
    async fn fetch_orders(&self, _merchant: &Merchant) -> Result<Vec<FulfilledOrder>, StorefrontError> {
        self.order_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_order_fetch {
            return Err(StorefrontError::Unavailable("orders endpoint is down".into()));
        }
        Ok(self.orders.clone())
    }

    async fn fetch_transactions(
        &self,
        _merchant: &Merchant,
        order_id: i64,
    ) -> Result<Vec<PaymentTransaction>, StorefrontError> {
        if self.failing_lookups.contains(&order_id) {
            return Err(StorefrontError::Unavailable(format!("transactions for {order_id}")));
        }
        Ok(self.transactions.get(&order_id).cloned().unwrap_or_default())
    }

    async fn install_webhook(&self, _merchant: &Merchant, address: &str, topic: &str) -> Result<(), StorefrontError> {
        if self.fail_webhooks {
            return Err(StorefrontError::Rejected(format!("{topic} is not allowed")));
        }
        self.webhooks.lock().unwrap().push((topic.to_string(), address.to_string()));
        Ok(())
    }
}

/// A provider that answers from a script. Once the script runs out, every call succeeds.
#[derive(Default)]
pub struct FakeProvider {
    outcomes: Mutex<VecDeque<SyncOutcome>>,
    rejected_token: Option<String>,
    transport_error: bool,
    failing_refresh: bool,
    batches: Mutex<Vec<Vec<ShipmentTracker>>>,
    tokens: Mutex<Vec<String>>,
    refreshes: AtomicUsize,
}

impl FakeProvider {
    pub fn with_outcomes(self, outcomes: Vec<SyncOutcome>) -> Self {
        *self.outcomes.lock().unwrap() = outcomes.into();
        self
    }

    /// Every call made with `token` is an auth failure; every other token succeeds.
    pub fn rejecting_token(mut self, token: &str) -> Self {
        self.rejected_token = Some(token.to_string());
        self
    }

    pub fn with_transport_error(mut self) -> Self {
        self.transport_error = true;
        self
    }

    pub fn with_failing_refresh(mut self) -> Self {
        self.failing_refresh = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn batches(&self) -> Vec<Vec<ShipmentTracker>> {
        self.batches.lock().unwrap().clone()
    }

    /// The access token of every call, in call order
    pub fn tokens_used(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl TrackingProvider for FakeProvider {
    async fn submit_trackers(
        &self,
        trackers: &[ShipmentTracker],
        access_token: &Secret<String>,
    ) -> Result<SyncOutcome, TrackingProviderError> {
        if trackers.len() > PROVIDER_MAX_BATCH_SIZE {
            return Err(TrackingProviderError::BatchTooLarge { count: trackers.len(), max: PROVIDER_MAX_BATCH_SIZE });
        }
        self.batches.lock().unwrap().push(trackers.to_vec());
        self.tokens.lock().unwrap().push(access_token.reveal().clone());
        if self.transport_error {
            return Err(TrackingProviderError::Transport("connection reset".into()));
        }
        if self.rejected_token.as_deref() == Some(access_token.reveal().as_str()) {
            return Ok(SyncOutcome::AuthFailure);
        }
        Ok(self.outcomes.lock().unwrap().pop_front().unwrap_or(SyncOutcome::Success))
    }

    async fn refresh_access_token(
        &self,
        _refresh_token: &Secret<String>,
    ) -> Result<Secret<String>, TrackingProviderError> {
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_refresh {
            return Err(TrackingProviderError::RefreshRejected("invalid_grant".into()));
        }
        Ok(Secret::new(format!("access-{n}")))
    }

    async fn exchange_authorization_code(&self, _code: &str) -> Result<ProviderGrant, TrackingProviderError> {
        Ok(ProviderGrant {
            access_token: Secret::from("granted-access"),
            refresh_token: Secret::from("granted-refresh"),
            email: Some("merchant@example.com".to_string()),
        })
    }
}
