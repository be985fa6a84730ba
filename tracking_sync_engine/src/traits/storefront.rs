use thiserror::Error;

use crate::{
    db_types::Merchant,
    sync_objects::{FulfilledOrder, PaymentTransaction},
};

#[derive(Debug, Clone, Error)]
pub enum StorefrontError {
    #[error("Could not reach the storefront: {0}")]
    Unavailable(String),
    #[error("The storefront rejected the request: {0}")]
    Rejected(String),
    #[error("The storefront access token for {0} is invalid")]
    InvalidAccessToken(String),
}

/// The storefront platform, as seen by the engine. Every call is scoped to a merchant, whose storefront access token
/// is read from the merchant record.
#[allow(async_fn_in_trait)]
pub trait StorefrontApi {
    /// Fetches every order of the merchant, following pagination until the storefront reports no further page.
    async fn fetch_orders(&self, merchant: &Merchant) -> Result<Vec<FulfilledOrder>, StorefrontError>;

    /// Fetches the payment transactions for the given storefront order.
    async fn fetch_transactions(
        &self,
        merchant: &Merchant,
        order_id: i64,
    ) -> Result<Vec<PaymentTransaction>, StorefrontError>;

    /// Subscribes `address` to the webhook `topic` for the merchant's shop.
    async fn install_webhook(&self, merchant: &Merchant, address: &str, topic: &str) -> Result<(), StorefrontError>;
}
