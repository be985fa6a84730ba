mod api;
mod config;
mod error;
mod helpers;
mod shopify_order;
mod shopify_transaction;

pub mod data_objects;

pub use api::{OrdersPage, ShopifyApi, ORDERS_PAGE_LIMIT};
pub use config::{ShopSession, ShopifyConfig};
pub use error::ShopifyApiError;
pub use helpers::{next_page_info, shop_name_from_domain};
pub use shopify_order::{Fulfillment, ShopifyOrder};
pub use shopify_transaction::ShopifyTransaction;
