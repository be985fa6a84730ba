use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::*;
use pts_common::Secret;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------        Plan        -----------------------------------------------------------
/// The subscription tier a merchant is on. Each tier has a monthly synchronisation quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    Free,
    Micro,
    Discovery,
    Adventure,
    Heroic,
}

impl Plan {
    /// Synchronisations allowed per calendar month. Zero means unlimited.
    pub fn sync_limit(&self) -> u32 {
        match self {
            Plan::Free => 30,
            Plan::Micro => 100,
            Plan::Discovery => 1499,
            Plan::Adventure => 4999,
            Plan::Heroic => 0,
        }
    }

    pub fn quota(&self) -> Quota {
        match self.sync_limit() {
            0 => Quota::Unlimited,
            n => Quota::Limited(n),
        }
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self::Free
    }
}

impl Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Plan::Free => write!(f, "FREE"),
            Plan::Micro => write!(f, "MICRO"),
            Plan::Discovery => write!(f, "DISCOVERY"),
            Plan::Adventure => write!(f, "ADVENTURE"),
            Plan::Heroic => write!(f, "HEROIC"),
        }
    }
}

impl FromStr for Plan {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FREE" => Ok(Self::Free),
            "MICRO" => Ok(Self::Micro),
            "DISCOVERY" => Ok(Self::Discovery),
            "ADVENTURE" => Ok(Self::Adventure),
            "HEROIC" => Ok(Self::Heroic),
            s => Err(ConversionError(format!("Invalid plan: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    Limited(u32),
    Unlimited,
}

impl Quota {
    /// The limit as stored in queries: zero is unlimited.
    pub fn as_limit(&self) -> i64 {
        match self {
            Quota::Limited(n) => i64::from(*n),
            Quota::Unlimited => 0,
        }
    }
}

//--------------------------------------     PlanStatus     -----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Active,
    Cancelled,
    Trial,
}

impl Default for PlanStatus {
    fn default() -> Self {
        Self::Trial
    }
}

impl Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanStatus::Active => write!(f, "ACTIVE"),
            PlanStatus::Cancelled => write!(f, "CANCELLED"),
            PlanStatus::Trial => write!(f, "TRIAL"),
        }
    }
}

impl FromStr for PlanStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "CANCELLED" => Ok(Self::Cancelled),
            "TRIAL" => Ok(Self::Trial),
            s => Err(ConversionError(format!("Invalid plan status: {s}"))),
        }
    }
}

//--------------------------------------      Merchant      -----------------------------------------------------------
/// One storefront tenant.
#[derive(Debug, Clone, FromRow)]
pub struct Merchant {
    /// The shop name, i.e. the shop domain without `.myshopify.com`
    pub id: String,
    pub shop_domain: String,
    pub shopify_access_token: Secret<String>,
    pub paypal_access_token: Secret<String>,
    pub paypal_refresh_token: Secret<String>,
    pub paypal_email: Option<String>,
    pub plan: Plan,
    pub plan_status: PlanStatus,
    /// Set once, when the historical backfill is accepted
    pub backfill_done: bool,
    pub uninstalled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Merchant {
    pub fn has_provider_credentials(&self) -> bool {
        !self.paypal_access_token.is_empty() && !self.paypal_refresh_token.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMerchant {
    pub id: String,
    pub shop_domain: String,
    pub shopify_access_token: Secret<String>,
    #[serde(default)]
    pub plan: Plan,
    #[serde(default)]
    pub plan_status: PlanStatus,
}

impl NewMerchant {
    pub fn new<S1: Into<String>, S2: Into<String>>(id: S1, shop_domain: S2, shopify_access_token: Secret<String>) -> Self {
        Self {
            id: id.into(),
            shop_domain: shop_domain.into(),
            shopify_access_token,
            plan: Plan::default(),
            plan_status: PlanStatus::default(),
        }
    }

    pub fn with_plan(mut self, plan: Plan, status: PlanStatus) -> Self {
        self.plan = plan;
        self.plan_status = status;
        self
    }
}

//--------------------------------------   OrderStatusType   ----------------------------------------------------------
/// Lifecycle of an order record.
///
/// ```text
///   PENDING ──────────────> PROCESSED      (backfill chunk accepted)
///   PROCESSING ──┬────────> PROCESSED      (webhook sync succeeded)
///                └────────> FAILED         (webhook sync failed)
///   INSUFFICIENT_CREDITS                   (terminal at creation)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// Ingested by a backfill, waiting for its chunk to be synchronised
    Pending,
    /// Created by the webhook path, provider call in flight
    Processing,
    Processed,
    Failed,
    /// The merchant's monthly quota was used up. No provider call was made.
    InsufficientCredits,
}

impl OrderStatusType {
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!((self, next), (Pending, Processed) | (Processing, Processed) | (Processing, Failed))
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "PENDING"),
            OrderStatusType::Processing => write!(f, "PROCESSING"),
            OrderStatusType::Processed => write!(f, "PROCESSED"),
            OrderStatusType::Failed => write!(f, "FAILED"),
            OrderStatusType::InsufficientCredits => write!(f, "INSUFFICIENT_CREDITS"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "PROCESSED" => Ok(Self::Processed),
            "FAILED" => Ok(Self::Failed),
            "INSUFFICIENT_CREDITS" => Ok(Self::InsufficientCredits),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Failed");
            OrderStatusType::Failed
        })
    }
}

//--------------------------------------    TrackingEntry    ----------------------------------------------------------
/// One tracking number as reported by the storefront, copied verbatim from a fulfilment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEntry {
    pub tracking_number: Option<String>,
    pub tracking_company: Option<String>,
    /// The fulfilment status (e.g. `success`) at the time the entry was captured
    #[serde(default)]
    pub status: Option<String>,
}

impl TrackingEntry {
    pub fn new<S: Into<String>>(tracking_number: S, tracking_company: Option<&str>) -> Self {
        Self {
            tracking_number: Some(tracking_number.into()),
            tracking_company: tracking_company.map(String::from),
            status: Some(SUCCESSFUL_FULFILLMENT.to_string()),
        }
    }

    pub fn with_status<S: Into<String>>(mut self, status: S) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn has_tracking_number(&self) -> bool {
        self.tracking_number.as_deref().is_some_and(|n| !n.trim().is_empty())
    }

    pub fn is_successful(&self) -> bool {
        self.status.as_deref() == Some(SUCCESSFUL_FULFILLMENT)
    }
}

pub const SUCCESSFUL_FULFILLMENT: &str = "success";

//--------------------------------------     OrderRecord     ----------------------------------------------------------
/// The synchronisation trail of one storefront order. There is at most one record per (merchant, storefront order).
#[derive(Debug, Clone, Serialize)]
pub struct OrderRecord {
    pub id: i64,
    pub merchant_id: String,
    pub shopify_id: i64,
    pub name: String,
    /// Empty until resolved; never changed once set
    pub transaction_id: String,
    pub tracking: Vec<TrackingEntry>,
    pub historical: bool,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub synchronized_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewOrderRecord {
    pub merchant_id: String,
    pub shopify_id: i64,
    pub name: String,
    pub transaction_id: String,
    pub tracking: Vec<TrackingEntry>,
    pub historical: bool,
}

impl NewOrderRecord {
    pub fn live<S: Into<String>>(merchant_id: S, shopify_id: i64, name: S, transaction_id: S) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            shopify_id,
            name: name.into(),
            transaction_id: transaction_id.into(),
            tracking: vec![],
            historical: false,
        }
    }

    /// A backfilled record. Its transaction id is resolved later.
    pub fn historical<S: Into<String>>(merchant_id: S, shopify_id: i64, name: S) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            shopify_id,
            name: name.into(),
            transaction_id: String::default(),
            tracking: vec![],
            historical: true,
        }
    }

    pub fn with_tracking(mut self, tracking: Vec<TrackingEntry>) -> Self {
        self.tracking = tracking;
        self
    }
}

//--------------------------------------  OrderRecordFilter  ----------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct OrderRecordFilter {
    pub merchant_id: Option<String>,
    pub shopify_id: Option<i64>,
    pub historical: Option<bool>,
    pub statuses: Vec<OrderStatusType>,
}

impl OrderRecordFilter {
    pub fn for_merchant<S: Into<String>>(merchant_id: S) -> Self {
        Self { merchant_id: Some(merchant_id.into()), ..Default::default() }
    }

    pub fn with_shopify_id(mut self, shopify_id: i64) -> Self {
        self.shopify_id = Some(shopify_id);
        self
    }

    pub fn with_historical(mut self, historical: bool) -> Self {
        self.historical = Some(historical);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.merchant_id.is_none() && self.shopify_id.is_none() && self.historical.is_none() && self.statuses.is_empty()
    }
}

//--------------------------------------     BackfillJob     ----------------------------------------------------------
/// A durable record of an accepted historical backfill.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct BackfillJob {
    pub id: i64,
    pub merchant_id: String,
    /// Number of PENDING records the backfill created
    pub order_count: i64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
