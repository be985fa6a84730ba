use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The subset of a Shopify order that tracking synchronisation needs. Used both for the `orders/fulfilled` webhook
/// payload and for the orders REST endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopifyOrder {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default)]
    pub fulfillment_status: Option<String>,
    #[serde(default)]
    pub payment_gateway_names: Vec<String>,
    #[serde(default)]
    pub fulfillments: Vec<Fulfillment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fulfillment {
    pub id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tracking_company: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub tracking_numbers: Vec<String>,
}

impl ShopifyOrder {
    /// True if one of the order's payment gateways is `gateway`, ignoring case.
    pub fn is_paid_with(&self, gateway: &str) -> bool {
        self.payment_gateway_names.iter().any(|g| g.eq_ignore_ascii_case(gateway))
    }

    pub fn is_fulfilled(&self) -> bool {
        !self.fulfillments.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fulfilled_order_webhook() {
        let json = include_str!("./test_assets/order_fulfilled.json");
        let order: ShopifyOrder = serde_json::from_str(json).unwrap();
        assert_eq!(order.id, 5734224806100);
        assert_eq!(order.name, "#1001");
        assert!(order.is_paid_with("paypal"));
        assert!(order.is_paid_with("PayPal"));
        assert!(!order.is_paid_with("bogus"));
        assert!(order.is_fulfilled());
        let f = &order.fulfillments[0];
        assert_eq!(f.status.as_deref(), Some("success"));
        assert_eq!(f.tracking_company.as_deref(), Some("DHL Express"));
        assert_eq!(f.tracking_number.as_deref(), Some("1Z2345"));
        assert_eq!(order.created_at.unwrap().to_rfc3339(), "2024-03-01T15:30:00+00:00");
    }

    #[test]
    fn sparse_order() {
        let order: ShopifyOrder = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert!(!order.is_fulfilled());
        assert!(!order.is_paid_with("paypal"));
    }
}
