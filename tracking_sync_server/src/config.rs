use std::env;

use log::*;
use paypal_tools::PaypalConfig;
use pts_common::{parse_boolean_flag, Secret};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use shopify_tools::ShopifyConfig as ShopifyApiConfig;
use tracking_sync_engine::SyncConfig;

const DEFAULT_PTS_HOST: &str = "127.0.0.1";
const DEFAULT_PTS_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/tracking_sync.db";
const DEFAULT_PUBLIC_URL: &str = "http://localhost:8370";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The externally visible base URL of this server. Storefront webhooks are registered against it.
    pub public_url: String,
    /// Bearer key for the administration API
    pub admin_api_key: Secret<String>,
    pub shopify_config: ShopifyConfig,
    pub paypal_config: PaypalConfig,
    pub sync_config: SyncConfig,
}

#[derive(Clone, Debug, Default)]
pub struct ShopifyConfig {
    pub api: ShopifyApiConfig,
    pub hmac_secret: Secret<String>,
    pub hmac_checks: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PTS_HOST.to_string(),
            port: DEFAULT_PTS_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            admin_api_key: Secret::default(),
            shopify_config: ShopifyConfig::default(),
            paypal_config: PaypalConfig::default(),
            sync_config: SyncConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("PTS_HOST").ok().unwrap_or_else(|| DEFAULT_PTS_HOST.into());
        let port = env::var("PTS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for PTS_PORT. {e} Using the default, {DEFAULT_PTS_PORT}, instead."
                    );
                    DEFAULT_PTS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_PTS_PORT);
        let database_url = env::var("PTS_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ PTS_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let public_url = env::var("PTS_PUBLIC_URL").ok().unwrap_or_else(|| {
            warn!(
                "🪛️ PTS_PUBLIC_URL is not set. Storefront webhooks will be registered against {DEFAULT_PUBLIC_URL}, \
                 which the storefront cannot reach."
            );
            DEFAULT_PUBLIC_URL.to_string()
        });
        let admin_api_key = env::var("PTS_ADMIN_API_KEY").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| {
            let key = random_api_key();
            warn!(
                "🚨️🚨️🚨️ PTS_ADMIN_API_KEY is not set. I'm using a random key for this session: {key}. DO NOT operate \
                 on production like this. 🚨️🚨️🚨️"
            );
            key
        });
        let shopify_config = ShopifyConfig::from_env_or_defaults();
        let paypal_config = PaypalConfig::new_from_env_or_default();
        let sync_config = configure_sync();
        Self {
            host,
            port,
            database_url,
            public_url,
            admin_api_key: Secret::new(admin_api_key),
            shopify_config,
            paypal_config,
            sync_config,
        }
    }
}

impl ShopifyConfig {
    pub fn from_env_or_defaults() -> Self {
        let api = ShopifyApiConfig::new_from_env_or_default();
        let hmac_secret = env::var("PTS_SHOPIFY_HMAC_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ PTS_SHOPIFY_HMAC_SECRET is not set. Please set it to the HMAC signing key for your Shopify app."
            );
            String::default()
        });
        let hmac_checks = parse_boolean_flag(env::var("PTS_SHOPIFY_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ Shopify webhook HMAC checks are DISABLED. Only do this in testing environments.");
        }
        Self { api, hmac_secret: Secret::new(hmac_secret), hmac_checks }
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The part of the configuration that request handlers need. It holds no secrets.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub public_url: String,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { public_url: config.public_url.clone() }
    }
}

fn configure_sync() -> SyncConfig {
    let config = SyncConfig::default();
    match env::var("PTS_RESOLVE_CONCURRENCY") {
        Ok(s) => match s.parse::<usize>() {
            Ok(n) if n > 0 => config.with_resolve_concurrency(n),
            _ => {
                warn!("🪛️ Invalid configuration value for PTS_RESOLVE_CONCURRENCY ({s}). Using the default.");
                config
            },
        },
        Err(_) => {
            info!("🪛️ PTS_RESOLVE_CONCURRENCY is not set. Using {}.", config.resolve_concurrency);
            config
        },
    }
}

fn random_api_key() -> String {
    thread_rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect()
}
