use std::time::Duration;

use log::*;
use pts_common::Secret;

pub const DEFAULT_API_VERSION: &str = "2024-04";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings shared by every shop the client talks to.
#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    pub api_version: String,
    pub timeout: Duration,
}

impl Default for ShopifyConfig {
    fn default() -> Self {
        Self { api_version: DEFAULT_API_VERSION.to_string(), timeout: DEFAULT_TIMEOUT }
    }
}

impl ShopifyConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_version = std::env::var("PTS_SHOPIFY_API_VERSION").unwrap_or_else(|_| {
            warn!("🪛️ PTS_SHOPIFY_API_VERSION not set, using {DEFAULT_API_VERSION} as default");
            DEFAULT_API_VERSION.to_string()
        });
        let timeout = std::env::var("PTS_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid value for PTS_HTTP_TIMEOUT_SECS ({s}). {e}"))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        Self { api_version, timeout }
    }
}

/// The credentials for one installed shop.
#[derive(Debug, Clone)]
pub struct ShopSession {
    /// The shop's `myshopify.com` domain
    pub shop: String,
    pub access_token: Secret<String>,
}

impl ShopSession {
    pub fn new<S: Into<String>>(shop: S, access_token: Secret<String>) -> Self {
        Self { shop: shop.into(), access_token }
    }
}
