use mockall::mock;
use pts_common::Secret;
use tracking_sync_engine::{
    db_types::Merchant,
    sync_objects::{FulfilledOrder, PaymentTransaction, ProviderGrant, ShipmentTracker, SyncOutcome},
    traits::{StorefrontApi, StorefrontError, TrackingProvider, TrackingProviderError},
};

mock! {
    pub Storefront {}
    impl StorefrontApi for Storefront {
        async fn fetch_orders(&self, merchant: &Merchant) -> Result<Vec<FulfilledOrder>, StorefrontError>;
        async fn fetch_transactions(&self, merchant: &Merchant, order_id: i64) -> Result<Vec<PaymentTransaction>, StorefrontError>;
        async fn install_webhook(&self, merchant: &Merchant, address: &str, topic: &str) -> Result<(), StorefrontError>;
    }
}

mock! {
    pub Provider {}
    impl TrackingProvider for Provider {
        async fn submit_trackers(&self, trackers: &[ShipmentTracker], access_token: &Secret<String>) -> Result<SyncOutcome, TrackingProviderError>;
        async fn refresh_access_token(&self, refresh_token: &Secret<String>) -> Result<Secret<String>, TrackingProviderError>;
        async fn exchange_authorization_code(&self, code: &str) -> Result<ProviderGrant, TrackingProviderError>;
    }
}
