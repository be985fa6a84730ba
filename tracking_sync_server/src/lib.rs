//! # Tracking sync server
//! This crate hosts the HTTP server for the tracking sync engine. It is responsible for:
//! * Listening for `orders/fulfilled`, `app/uninstalled` and the privacy compliance webhooks from Shopify and checking
//!   their signatures.
//! * Handing fulfilled orders to the engine, which pushes their tracking numbers to PayPal.
//! * Completing the PayPal OAuth flow for merchants.
//! * The administration API: merchants, plans, order records and historical backfills.
//! * Running accepted backfills on a background worker, and resuming unfinished ones at start-up.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/shopify/webhook/*`: Shopify webhooks. Always answered with 200 once the payload has been accepted.
//! * `/paypal/auth/callback`: The PayPal OAuth redirect.
//! * `/api/*`: Administration. Requires `Authorization: Bearer <PTS_ADMIN_API_KEY>`.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod shopify_routes;

#[cfg(test)]
mod endpoint_tests;
