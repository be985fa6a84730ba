use std::fmt::Display;

use chrono::{DateTime, Utc};
use pts_common::Secret;
use serde::{Deserialize, Serialize};
use shopify_tools::shop_name_from_domain;
use tracking_sync_engine::db_types::{Merchant, NewMerchant, OrderStatusType, Plan, PlanStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Body of `POST /api/merchants`. The merchant id is derived from the shop domain.
#[derive(Debug, Clone, Deserialize)]
pub struct MerchantRegistration {
    pub shop_domain: String,
    pub shopify_access_token: Secret<String>,
    #[serde(default)]
    pub plan: Plan,
    #[serde(default)]
    pub plan_status: PlanStatus,
}

impl From<MerchantRegistration> for NewMerchant {
    fn from(value: MerchantRegistration) -> Self {
        let id = shop_name_from_domain(&value.shop_domain).to_string();
        NewMerchant::new(id, value.shop_domain, value.shopify_access_token).with_plan(value.plan, value.plan_status)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanUpdate {
    pub plan: Plan,
    #[serde(default = "active")]
    pub status: PlanStatus,
}

fn active() -> PlanStatus {
    PlanStatus::Active
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderRecordsQuery {
    pub status: Option<OrderStatusType>,
}

/// Query string of the provider's OAuth redirect. `state` carries the merchant id.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderCallbackParams {
    pub code: String,
    pub state: String,
}

/// A merchant as shown by the administration API. Tokens are never included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantView {
    pub id: String,
    pub shop_domain: String,
    pub plan: Plan,
    pub plan_status: PlanStatus,
    pub monthly_sync_limit: u32,
    pub provider_connected: bool,
    pub provider_email: Option<String>,
    pub backfill_done: bool,
    pub uninstalled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Merchant> for MerchantView {
    fn from(m: Merchant) -> Self {
        Self {
            provider_connected: m.has_provider_credentials(),
            monthly_sync_limit: m.plan.sync_limit(),
            id: m.id,
            shop_domain: m.shop_domain,
            plan: m.plan,
            plan_status: m.plan_status,
            provider_email: m.paypal_email,
            backfill_done: m.backfill_done,
            uninstalled: m.uninstalled,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// The 202 answer to a backfill trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillStarted {
    pub status: String,
    pub orders: i64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn registration_derives_the_merchant_id() {
        let json = r#"{"shop_domain": "lucky-socks.myshopify.com", "shopify_access_token": "shpat_1", "plan": "MICRO"}"#;
        let reg: MerchantRegistration = serde_json::from_str(json).unwrap();
        let merchant = NewMerchant::from(reg);
        assert_eq!(merchant.id, "lucky-socks");
        assert_eq!(merchant.plan, Plan::Micro);
        assert_eq!(merchant.plan_status, PlanStatus::Trial);
    }

    #[test]
    fn plan_updates_default_to_active() {
        let update: PlanUpdate = serde_json::from_str(r#"{"plan": "HEROIC"}"#).unwrap();
        assert_eq!(update.status, PlanStatus::Active);
    }
}
