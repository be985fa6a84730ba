//! Merchant administration: registration, plans, uninstalls and connecting the payment provider account.
use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::SyncDatabase,
    db_types::{Merchant, NewMerchant, OrderRecord, OrderRecordFilter, OrderStatusType, Plan, PlanStatus},
    sync_api::errors::SyncError,
    traits::{StorefrontApi, TrackingProvider},
};

/// Storefront webhook topics the engine listens to, with the path (relative to the public URL) they are delivered to.
pub const WEBHOOK_SUBSCRIPTIONS: [(&str, &str); 2] = [
    ("orders/fulfilled", "/shopify/webhook/orders_fulfilled"),
    ("app/uninstalled", "/shopify/webhook/app_uninstalled"),
];

pub struct MerchantApi<B, S, P> {
    db: B,
    storefront: S,
    provider: P,
}

impl<B, S, P> Debug for MerchantApi<B, S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MerchantApi")
    }
}

impl<B, S, P> MerchantApi<B, S, P> {
    pub fn new(db: B, storefront: S, provider: P) -> Self {
        Self { db, storefront, provider }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn storefront(&self) -> &S {
        &self.storefront
    }
}

impl<B, S, P> MerchantApi<B, S, P>
where
    B: SyncDatabase,
    S: StorefrontApi,
    P: TrackingProvider,
{
    pub async fn register_merchant(&self, merchant: NewMerchant) -> Result<Merchant, SyncError> {
        Ok(self.db.register_merchant(merchant).await?)
    }

    pub async fn fetch_merchant(&self, merchant_id: &str) -> Result<Option<Merchant>, SyncError> {
        Ok(self.db.fetch_merchant(merchant_id).await?)
    }

    pub async fn update_plan(&self, merchant_id: &str, plan: Plan, status: PlanStatus) -> Result<Merchant, SyncError> {
        Ok(self.db.update_plan(merchant_id, plan, status).await?)
    }

    /// Handles the storefront's uninstall notification. Unknown domains are ignored.
    pub async fn uninstall(&self, shop_domain: &str) -> Result<Option<Merchant>, SyncError> {
        let merchant = self.db.mark_uninstalled(shop_domain).await?;
        match &merchant {
            Some(m) => info!("🛍️ Merchant {} uninstalled the app. Plan cancelled.", m.id),
            None => debug!("🛍️ Uninstall notification for unknown shop {shop_domain}"),
        }
        Ok(merchant)
    }

    /// The merchant's order records, optionally limited to one status.
    pub async fn order_records(
        &self,
        merchant_id: &str,
        status: Option<OrderStatusType>,
    ) -> Result<Vec<OrderRecord>, SyncError> {
        let mut filter = OrderRecordFilter::for_merchant(merchant_id);
        if let Some(status) = status {
            filter = filter.with_status(status);
        }
        Ok(self.db.fetch_order_records(filter).await?)
    }

    /// Completes the provider OAuth flow for a merchant: the authorization code is exchanged for a token pair, which is
    /// stored on the merchant, and the storefront webhooks are installed.
    ///
    /// Webhook installation failures are logged but do not fail the connection, since the tokens are already stored.
    pub async fn connect_provider(&self, merchant_id: &str, code: &str, public_url: &str) -> Result<Merchant, SyncError> {
        let merchant = self
            .db
            .fetch_merchant(merchant_id)
            .await?
            .ok_or_else(|| SyncError::MerchantNotFound(merchant_id.to_string()))?;
        let grant = self.provider.exchange_authorization_code(code).await?;
        self.db
            .store_provider_credentials(merchant_id, &grant.access_token, &grant.refresh_token, grant.email.as_deref())
            .await?;
        info!("💳️ Payment provider account connected for {merchant_id}");
        let base = public_url.trim_end_matches('/');
        for (topic, path) in WEBHOOK_SUBSCRIPTIONS {
            let address = format!("{base}{path}");
            match self.storefront.install_webhook(&merchant, &address, topic).await {
                Ok(()) => debug!("🛍️ Webhook {topic} installed for {merchant_id} at {address}"),
                Err(e) => error!("🛍️ Could not install the {topic} webhook for {merchant_id}. {e}"),
            }
        }
        self.db
            .fetch_merchant(merchant_id)
            .await?
            .ok_or_else(|| SyncError::MerchantNotFound(merchant_id.to_string()))
    }
}
