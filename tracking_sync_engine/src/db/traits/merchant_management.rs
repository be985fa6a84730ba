use pts_common::Secret;

use crate::{
    db::traits::SyncDatabaseError,
    db_types::{Merchant, NewMerchant, Plan, PlanStatus},
};

/// Merchant storage. Merchants are never deleted; an uninstall only flags the record.
#[allow(async_fn_in_trait)]
pub trait MerchantManagement {
    /// Creates the merchant, or refreshes the storefront token and plan of an existing one. Re-registering an
    /// uninstalled merchant clears the `uninstalled` flag.
    async fn register_merchant(&self, merchant: NewMerchant) -> Result<Merchant, SyncDatabaseError>;

    async fn fetch_merchant(&self, merchant_id: &str) -> Result<Option<Merchant>, SyncDatabaseError>;

    async fn fetch_merchant_by_domain(&self, shop_domain: &str) -> Result<Option<Merchant>, SyncDatabaseError>;

    async fn update_plan(
        &self,
        merchant_id: &str,
        plan: Plan,
        status: PlanStatus,
    ) -> Result<Merchant, SyncDatabaseError>;

    /// Stores a freshly granted provider token pair, along with the provider account e-mail if it is known.
    async fn store_provider_credentials(
        &self,
        merchant_id: &str,
        access_token: &Secret<String>,
        refresh_token: &Secret<String>,
        email: Option<&str>,
    ) -> Result<(), SyncDatabaseError>;

    /// Replaces the provider access token after a refresh. The refresh token is left untouched.
    async fn update_provider_access_token(
        &self,
        merchant_id: &str,
        access_token: &Secret<String>,
    ) -> Result<(), SyncDatabaseError>;

    /// Flags the merchant as uninstalled and cancels its plan. Returns the updated merchant, or `None` if no merchant
    /// has this domain.
    async fn mark_uninstalled(&self, shop_domain: &str) -> Result<Option<Merchant>, SyncDatabaseError>;
}
