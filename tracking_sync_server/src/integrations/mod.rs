//! Bindings between the engine's remote-service traits and the concrete storefront and provider clients.
pub mod paypal;
pub mod shopify;
