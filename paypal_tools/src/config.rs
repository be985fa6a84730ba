use std::time::Duration;

use log::*;
use pts_common::Secret;

pub const DEFAULT_PAYPAL_API_URL: &str = "https://api-m.sandbox.paypal.com/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct PaypalConfig {
    /// Base URL of the REST API, including the version segment, e.g. `https://api-m.paypal.com/v1`
    pub api_url: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    /// Applied to every outbound request
    pub timeout: Duration,
}

impl Default for PaypalConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_PAYPAL_API_URL.to_string(),
            client_id: String::default(),
            client_secret: Secret::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PaypalConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("PTS_PAYPAL_API_URL").unwrap_or_else(|_| {
            warn!("🪛️ PTS_PAYPAL_API_URL not set, using the sandbox, {DEFAULT_PAYPAL_API_URL}");
            DEFAULT_PAYPAL_API_URL.to_string()
        });
        let client_id = std::env::var("PTS_PAYPAL_CLIENT_ID").unwrap_or_else(|_| {
            error!("🪛️ PTS_PAYPAL_CLIENT_ID not set. Token exchanges with PayPal will fail.");
            String::default()
        });
        let client_secret = Secret::new(std::env::var("PTS_PAYPAL_CLIENT_SECRET").unwrap_or_else(|_| {
            error!("🪛️ PTS_PAYPAL_CLIENT_SECRET not set. Token exchanges with PayPal will fail.");
            String::default()
        }));
        let timeout = std::env::var("PTS_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid value for PTS_HTTP_TIMEOUT_SECS ({s}). {e}"))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        Self { api_url: api_url.trim_end_matches('/').to_string(), client_id, client_secret, timeout }
    }
}
