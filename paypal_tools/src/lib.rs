//! Client for the parts of the PayPal REST API used to mark captured payments as shipped.
//!
//! * [`carriers`] maps storefront carrier names onto PayPal's carrier codes.
//! * [`PaypalApi`] submits tracker batches, exchanges OAuth grants and looks up account identity.
mod api;
pub mod carriers;
mod config;
mod data_objects;
mod error;

pub use api::{classify_batch_response, PaypalApi, MAX_TRACKERS_PER_BATCH};
pub use config::PaypalConfig;
pub use data_objects::{
    PaypalEmail,
    PaypalError,
    PaypalIdentity,
    TokenGrant,
    Tracker,
    TrackerBatchOutcome,
    TrackerBatchRequest,
    TrackerBatchResponse,
};
pub use error::PaypalApiError;
