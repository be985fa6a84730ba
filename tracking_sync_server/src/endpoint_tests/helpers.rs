use actix_web::{dev::ServiceResponse, http::StatusCode, test};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracking_sync_engine::{
    db_types::{OrderRecord, OrderRecordFilter},
    sync_objects::PaymentTransaction,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    OrderRecordManagement,
    SqliteDatabase,
};

pub const ORDER_FULFILLED: &str = include_str!("../../../shopify_tools/src/test_assets/order_fulfilled.json");
pub const ORDER_ID: i64 = 5734224806100;
pub const TRANSACTION_ID: &str = "8MC585209K746392H";
pub const ADMIN_KEY: &str = "test-admin-key";

pub async fn setup_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database")
}

/// A pending authorisation followed by the successful sale that carries the PayPal transaction id.
pub fn paypal_transactions() -> Vec<PaymentTransaction> {
    vec![
        PaymentTransaction { id: 1, authorization: None, gateway: "paypal".into(), status: "pending".into() },
        PaymentTransaction {
            id: 2,
            authorization: Some(TRANSACTION_ID.into()),
            gateway: "paypal".into(),
            status: "success".into(),
        },
    ]
}

pub async fn records_for(db: &SqliteDatabase, merchant_id: &str) -> Vec<OrderRecord> {
    db.fetch_order_records(OrderRecordFilter::for_merchant(merchant_id)).await.expect("Error fetching records")
}

pub fn bearer() -> (&'static str, String) {
    ("Authorization", format!("Bearer {ADMIN_KEY}"))
}

pub async fn status_and_body(res: ServiceResponse) -> (StatusCode, String) {
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

/// The base64 HMAC-SHA256 of `body`, the way Shopify fills `X-Shopify-Hmac-SHA256`.
pub fn sign_webhook(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC takes keys of any length");
    mac.update(body);
    base64::encode(mac.finalize().into_bytes())
}
