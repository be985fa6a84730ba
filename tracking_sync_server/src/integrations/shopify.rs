use log::*;
use shopify_tools::{Fulfillment, ShopSession, ShopifyApi, ShopifyApiError, ShopifyOrder, ShopifyTransaction};
use tracking_sync_engine::{
    db_types::{Merchant, TrackingEntry},
    sync_objects::{FulfilledOrder, PaymentTransaction},
    traits::{StorefrontApi, StorefrontError},
};

/// [`StorefrontApi`] over the Shopify REST client. The shop domain and access token come from the merchant record on
/// every call.
#[derive(Clone)]
pub struct ShopifyStorefront {
    api: ShopifyApi,
}

impl ShopifyStorefront {
    pub fn new(api: ShopifyApi) -> Self {
        Self { api }
    }

    fn session(merchant: &Merchant) -> ShopSession {
        ShopSession::new(merchant.shop_domain.clone(), merchant.shopify_access_token.clone())
    }
}

impl StorefrontApi for ShopifyStorefront {
    async fn fetch_orders(&self, merchant: &Merchant) -> Result<Vec<FulfilledOrder>, StorefrontError> {
        let orders = self.api.fetch_all_orders(&Self::session(merchant)).await.map_err(to_storefront_error)?;
        Ok(orders.into_iter().map(fulfilled_order_from_shopify).collect())
    }

    async fn fetch_transactions(
        &self,
        merchant: &Merchant,
        order_id: i64,
    ) -> Result<Vec<PaymentTransaction>, StorefrontError> {
        let transactions =
            self.api.fetch_transactions(&Self::session(merchant), order_id).await.map_err(to_storefront_error)?;
        Ok(transactions.into_iter().map(payment_transaction_from_shopify).collect())
    }

    async fn install_webhook(&self, merchant: &Merchant, address: &str, topic: &str) -> Result<(), StorefrontError> {
        self.api.install_webhook(&Self::session(merchant), address, topic).await.map_err(to_storefront_error)?;
        Ok(())
    }
}

/// Flattens an order's fulfilments into tracking entries. A fulfilment with several tracking numbers yields one entry
/// per number; one without any yields a single entry with no number.
pub fn fulfilled_order_from_shopify(order: ShopifyOrder) -> FulfilledOrder {
    trace!("🛍️ Converting Shopify order {} ({})", order.name, order.id);
    let tracking = order.fulfillments.iter().flat_map(tracking_entries).collect();
    FulfilledOrder { id: order.id, name: order.name, payment_gateway_names: order.payment_gateway_names, tracking }
}

fn tracking_entries(fulfillment: &Fulfillment) -> Vec<TrackingEntry> {
    let mut numbers = fulfillment.tracking_numbers.clone();
    if numbers.is_empty() {
        if let Some(n) = &fulfillment.tracking_number {
            numbers.push(n.clone());
        }
    }
    if numbers.is_empty() {
        return vec![TrackingEntry {
            tracking_number: None,
            tracking_company: fulfillment.tracking_company.clone(),
            status: fulfillment.status.clone(),
        }];
    }
    numbers
        .into_iter()
        .map(|number| TrackingEntry {
            tracking_number: Some(number),
            tracking_company: fulfillment.tracking_company.clone(),
            status: fulfillment.status.clone(),
        })
        .collect()
}

pub fn payment_transaction_from_shopify(tx: ShopifyTransaction) -> PaymentTransaction {
    PaymentTransaction {
        id: tx.id,
        authorization: tx.authorization,
        gateway: tx.gateway.unwrap_or_default(),
        status: tx.status,
    }
}

fn to_storefront_error(e: ShopifyApiError) -> StorefrontError {
    match e {
        ShopifyApiError::InvalidAccessToken(shop) => StorefrontError::InvalidAccessToken(shop),
        ShopifyApiError::QueryError { status: 401, message } => StorefrontError::InvalidAccessToken(message),
        ShopifyApiError::QueryError { status, message } if (400..500).contains(&status) => {
            StorefrontError::Rejected(format!("{status}: {message}"))
        },
        e => StorefrontError::Unavailable(e.to_string()),
    }
}
