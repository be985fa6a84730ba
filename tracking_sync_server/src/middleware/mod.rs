mod admin_key;
mod shopify_signature;

pub use admin_key::{AdminKeyMiddlewareFactory, AdminKeyMiddlewareService};
pub use shopify_signature::{
    verify_webhook_signature,
    ShopifySignatureFactory,
    ShopifySignatureService,
    SignatureError,
    SHOPIFY_HMAC_HEADER,
};
