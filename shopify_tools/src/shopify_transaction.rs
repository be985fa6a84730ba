use serde::{Deserialize, Serialize};

/// A payment transaction on a Shopify order. For PayPal payments, `authorization` holds PayPal's transaction id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopifyTransaction {
    pub id: i64,
    pub order_id: i64,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub authorization: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub test: bool,
}

impl ShopifyTransaction {
    pub fn is_successful(&self) -> bool {
        self.status == "success"
    }
}
