use std::fmt::Display;

use pts_common::Secret;
use serde::{Deserialize, Serialize};

use crate::db_types::{BackfillJob, TrackingEntry};

/// The parts of a storefront order the engine needs. Each fulfilment contributes one [`TrackingEntry`] per tracking
/// number, or a single entry without a number if it has none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfilledOrder {
    pub id: i64,
    pub name: String,
    pub payment_gateway_names: Vec<String>,
    pub tracking: Vec<TrackingEntry>,
}

impl FulfilledOrder {
    pub fn new<S: Into<String>>(id: i64, name: S) -> Self {
        Self { id, name: name.into(), ..Default::default() }
    }

    pub fn with_gateway<S: Into<String>>(mut self, gateway: S) -> Self {
        self.payment_gateway_names.push(gateway.into());
        self
    }

    pub fn with_tracking(mut self, entry: TrackingEntry) -> Self {
        self.tracking.push(entry);
        self
    }

    /// True if one of the gateway names equals `gateway`, ignoring case.
    pub fn is_paid_with(&self, gateway: &str) -> bool {
        self.payment_gateway_names.iter().any(|g| g.eq_ignore_ascii_case(gateway))
    }

    pub fn has_fulfillments(&self) -> bool {
        !self.tracking.is_empty()
    }

    /// Entries that actually carry a tracking number.
    pub fn tracking_numbers(&self) -> Vec<TrackingEntry> {
        self.tracking.iter().filter(|e| e.has_tracking_number()).cloned().collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: i64,
    /// The provider's own id for the charge
    pub authorization: Option<String>,
    pub gateway: String,
    pub status: String,
}

impl PaymentTransaction {
    pub fn is_successful(&self) -> bool {
        self.status == "success"
    }
}

/// Picks the transaction id of the first successful transaction in the list.
pub fn successful_transaction_id(transactions: &[PaymentTransaction]) -> Option<String> {
    transactions
        .iter()
        .find(|t| t.is_successful())
        .and_then(|t| t.authorization.clone())
        .filter(|a| !a.is_empty())
}

/// One tracking number, tied to the transaction it ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentTracker {
    pub transaction_id: String,
    pub tracking_number: String,
    /// The carrier as reported by the storefront
    pub carrier: Option<String>,
}

impl ShipmentTracker {
    /// Returns `None` if the entry has no tracking number.
    pub fn from_entry<S: Into<String>>(transaction_id: S, entry: &TrackingEntry) -> Option<Self> {
        if !entry.has_tracking_number() {
            return None;
        }
        let tracking_number = entry.tracking_number.clone()?;
        Some(Self { transaction_id: transaction_id.into(), tracking_number, carrier: entry.tracking_company.clone() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOutcome {
    Success,
    /// The access token was rejected. This is the only outcome that triggers a token refresh.
    AuthFailure,
}

/// The result of a successful provider OAuth exchange.
#[derive(Debug, Clone)]
pub struct ProviderGrant {
    pub access_token: Secret<String>,
    pub refresh_token: Secret<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    UnknownMerchant,
    MerchantUninstalled,
    NotProviderPaid,
    NoTransaction,
    NoTrackingNumbers,
    Duplicate,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            SkipReason::UnknownMerchant => "the merchant is not registered",
            SkipReason::MerchantUninstalled => "the merchant has uninstalled the app",
            SkipReason::NotProviderPaid => "the order was not paid through the tracked gateway",
            SkipReason::NoTransaction => "the order has no successful transaction",
            SkipReason::NoTrackingNumbers => "the order has no tracking numbers",
            SkipReason::Duplicate => "the order has already been recorded",
        };
        f.write_str(reason)
    }
}

/// What the live path did with a fulfilment event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FulfillmentOutcome {
    Skipped(SkipReason),
    InsufficientCredits,
    Processed,
    Failed,
}

impl Display for FulfillmentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FulfillmentOutcome::Skipped(reason) => write!(f, "Skipped, because {reason}"),
            FulfillmentOutcome::InsufficientCredits => write!(f, "Not synchronised: monthly quota used up"),
            FulfillmentOutcome::Processed => write!(f, "Synchronised"),
            FulfillmentOutcome::Failed => write!(f, "Synchronisation failed"),
        }
    }
}

/// The answer to a backfill request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BackfillAck {
    /// The backfill was accepted and its pending records are stored. The job still has to be run.
    Started(BackfillJob),
    /// The merchant's backfill has already happened. Nothing was done.
    AlreadyDone,
}

/// Summary of a finished backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub job_id: i64,
    pub merchant_id: String,
    pub orders: usize,
    pub chunks: usize,
    pub chunks_synced: usize,
    pub chunks_failed: usize,
    pub orders_processed: u64,
    pub token_refreshes: usize,
}

#[cfg(test)]
mod test {
    use super::*;

    fn tx(id: i64, status: &str, auth: Option<&str>) -> PaymentTransaction {
        PaymentTransaction {
            id,
            authorization: auth.map(String::from),
            gateway: "paypal".into(),
            status: status.into(),
        }
    }

    #[test]
    fn picks_first_successful_transaction() {
        let txs = vec![tx(1, "pending", Some("AAA")), tx(2, "success", Some("BBB")), tx(3, "success", Some("CCC"))];
        assert_eq!(successful_transaction_id(&txs).as_deref(), Some("BBB"));
        assert_eq!(successful_transaction_id(&[tx(1, "failure", Some("AAA"))]), None);
        assert_eq!(successful_transaction_id(&[tx(1, "success", None)]), None);
        assert_eq!(successful_transaction_id(&[]), None);
    }

    #[test]
    fn gateway_match_is_exact_but_case_insensitive() {
        let order = FulfilledOrder::new(1, "#1").with_gateway("PayPal");
        assert!(order.is_paid_with("paypal"));
        let order = FulfilledOrder::new(1, "#1").with_gateway("paypal_express");
        assert!(!order.is_paid_with("paypal"));
    }

    #[test]
    fn trackers_need_a_number() {
        assert!(ShipmentTracker::from_entry("TX", &TrackingEntry::default()).is_none());
        let t = ShipmentTracker::from_entry("TX", &TrackingEntry::new("1Z", Some("UPS"))).unwrap();
        assert_eq!(t.tracking_number, "1Z");
        assert_eq!(t.carrier.as_deref(), Some("UPS"));
    }
}
