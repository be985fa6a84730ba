use thiserror::Error;

use crate::{
    db::traits::SyncDatabaseError,
    traits::{StorefrontError, TrackingProviderError},
};

#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] SyncDatabaseError),
    #[error("Storefront error: {0}")]
    StorefrontError(#[from] StorefrontError),
    #[error("Tracking provider error: {0}")]
    ProviderError(#[from] TrackingProviderError),
    #[error("Merchant {0} does not exist")]
    MerchantNotFound(String),
    #[error("Merchant {0} has not connected a payment provider account")]
    ProviderNotConnected(String),
    #[error("Merchant {0} has uninstalled the app")]
    MerchantUninstalled(String),
}
