use actix_web::{
    http::{header::ContentType, StatusCode},
    test,
    test::TestRequest,
    web,
    App,
};
use pts_common::Secret;
use tracking_sync_engine::{
    db_types::{OrderStatusType, Plan},
    sync_objects::SyncOutcome,
    test_utils::prepare_env::connected_merchant,
    traits::TrackingProviderError,
    CredentialGuard,
    FulfillmentApi,
    MerchantApi,
    MerchantManagement,
    SqliteDatabase,
    SyncConfig,
};

use super::{
    helpers::{paypal_transactions, records_for, setup_db, sign_webhook, ORDER_FULFILLED, ORDER_ID, TRANSACTION_ID},
    mocks::{MockProvider, MockStorefront},
};
use crate::{
    data_objects::JsonResponse,
    middleware::{ShopifySignatureFactory, SHOPIFY_HMAC_HEADER},
    shopify_routes::{
        customers_data_request,
        customers_redact,
        shop_redact,
        AppUninstalledRoute,
        OrdersFulfilledRoute,
        SHOP_DOMAIN_HEADER,
    },
};

type TestFulfillmentApi = FulfillmentApi<SqliteDatabase, MockStorefront, MockProvider>;
type TestMerchantApi = MerchantApi<SqliteDatabase, MockStorefront, MockProvider>;

const HMAC_SECRET: &str = "webhook-signing-secret";

fn fulfillment_api(db: &SqliteDatabase, storefront: MockStorefront, provider: MockProvider) -> TestFulfillmentApi {
    FulfillmentApi::new(SyncConfig::default(), db.clone(), storefront, provider, CredentialGuard::new())
}

fn webhook_request(shop_domain: &str) -> TestRequest {
    TestRequest::post()
        .uri("/shopify/webhook/orders_fulfilled")
        .insert_header((SHOP_DOMAIN_HEADER, shop_domain))
        .insert_header(ContentType::json())
        .set_payload(ORDER_FULFILLED)
}

fn signed(req: TestRequest, body: &str) -> TestRequest {
    req.insert_header((SHOPIFY_HMAC_HEADER, sign_webhook(HMAC_SECRET, body.as_bytes())))
}

#[actix_web::test]
async fn fulfilled_order_is_synchronised() {
    let db = setup_db().await;
    connected_merchant(&db, "webhook-shop", Plan::Micro).await;
    let mut storefront = MockStorefront::new();
    storefront.expect_fetch_transactions().times(1).returning(|merchant, order_id| {
        assert_eq!(merchant.id, "webhook-shop");
        assert_eq!(order_id, ORDER_ID);
        Ok(paypal_transactions())
    });
    let mut provider = MockProvider::new();
    provider.expect_submit_trackers().times(1).returning(|trackers, token| {
        assert_eq!(trackers.len(), 1);
        assert_eq!(trackers[0].transaction_id, TRANSACTION_ID);
        assert_eq!(trackers[0].tracking_number, "1Z2345");
        assert_eq!(token.reveal(), "access-0");
        Ok(SyncOutcome::Success)
    });
    provider.expect_refresh_access_token().never();
    let api = fulfillment_api(&db, storefront, provider);
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(
            web::scope("/shopify").service(OrdersFulfilledRoute::<SqliteDatabase, MockStorefront, MockProvider>::new()),
        ),
    )
    .await;
    let req = webhook_request("webhook-shop.myshopify.com").to_request();
    let res: JsonResponse = test::call_and_read_body_json(&app, req).await;
    assert!(res.success);
    assert_eq!(res.message, "Synchronised");

    let records = records_for(&db, "webhook-shop").await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].shopify_id, ORDER_ID);
    assert_eq!(records[0].transaction_id, TRANSACTION_ID);
    assert_eq!(records[0].status, OrderStatusType::Processed);
    assert!(!records[0].historical);
}

#[actix_web::test]
async fn unknown_shop_is_acknowledged_and_skipped() {
    let db = setup_db().await;
    let mut storefront = MockStorefront::new();
    storefront.expect_fetch_transactions().never();
    let mut provider = MockProvider::new();
    provider.expect_submit_trackers().never();
    let api = fulfillment_api(&db, storefront, provider);
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(
            web::scope("/shopify").service(OrdersFulfilledRoute::<SqliteDatabase, MockStorefront, MockProvider>::new()),
        ),
    )
    .await;
    let req = webhook_request("stranger.myshopify.com").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: JsonResponse = test::read_body_json(res).await;
    assert!(body.success);
    assert!(body.message.starts_with("Skipped"), "{}", body.message);
}

#[actix_web::test]
async fn provider_outage_marks_the_order_failed_but_still_answers_200() {
    let db = setup_db().await;
    connected_merchant(&db, "outage-shop", Plan::Free).await;
    let mut storefront = MockStorefront::new();
    storefront.expect_fetch_transactions().returning(|_, _| Ok(paypal_transactions()));
    let mut provider = MockProvider::new();
    provider
        .expect_submit_trackers()
        .times(1)
        .returning(|_, _| Err(TrackingProviderError::Transport("connection reset".into())));
    provider.expect_refresh_access_token().never();
    let api = fulfillment_api(&db, storefront, provider);
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(
            web::scope("/shopify").service(OrdersFulfilledRoute::<SqliteDatabase, MockStorefront, MockProvider>::new()),
        ),
    )
    .await;
    let req = webhook_request("outage-shop.myshopify.com").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: JsonResponse = test::read_body_json(res).await;
    assert!(!body.success);
    assert_eq!(body.message, "Synchronisation failed");
    let records = records_for(&db, "outage-shop").await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, OrderStatusType::Failed);
}

#[actix_web::test]
async fn rejected_token_is_refreshed_once_and_retried() {
    let db = setup_db().await;
    connected_merchant(&db, "stale-shop", Plan::Heroic).await;
    let mut storefront = MockStorefront::new();
    storefront.expect_fetch_transactions().returning(|_, _| Ok(paypal_transactions()));
    let mut provider = MockProvider::new();
    provider.expect_submit_trackers().times(2).returning(|_, token| match token.reveal().as_str() {
        "access-0" => Ok(SyncOutcome::AuthFailure),
        _ => Ok(SyncOutcome::Success),
    });
    provider.expect_refresh_access_token().times(1).returning(|refresh| {
        assert_eq!(refresh.reveal(), "refresh-0");
        Ok(Secret::new("access-1".to_string()))
    });
    let api = fulfillment_api(&db, storefront, provider);
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(
            web::scope("/shopify").service(OrdersFulfilledRoute::<SqliteDatabase, MockStorefront, MockProvider>::new()),
        ),
    )
    .await;
    let req = webhook_request("stale-shop.myshopify.com").to_request();
    let res: JsonResponse = test::call_and_read_body_json(&app, req).await;
    assert!(res.success);
    let merchant = db.fetch_merchant("stale-shop").await.unwrap().unwrap();
    assert_eq!(merchant.paypal_access_token.reveal(), "access-1");
    assert_eq!(records_for(&db, "stale-shop").await[0].status, OrderStatusType::Processed);
}

#[actix_web::test]
async fn missing_shop_domain_is_reported() {
    let db = setup_db().await;
    let api = fulfillment_api(&db, MockStorefront::new(), MockProvider::new());
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(
            web::scope("/shopify").service(OrdersFulfilledRoute::<SqliteDatabase, MockStorefront, MockProvider>::new()),
        ),
    )
    .await;
    let req = TestRequest::post()
        .uri("/shopify/webhook/orders_fulfilled")
        .insert_header(ContentType::json())
        .set_payload(ORDER_FULFILLED)
        .to_request();
    let res: JsonResponse = test::call_and_read_body_json(&app, req).await;
    assert!(!res.success);
    assert_eq!(res.message, "Missing shop domain.");
}

#[actix_web::test]
async fn unsigned_webhooks_are_rejected() {
    let db = setup_db().await;
    let mut provider = MockProvider::new();
    provider.expect_submit_trackers().never();
    let api = fulfillment_api(&db, MockStorefront::new(), provider);
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(
            web::scope("/shopify")
                .wrap(ShopifySignatureFactory::new(Secret::new(HMAC_SECRET.to_string()), true))
                .service(OrdersFulfilledRoute::<SqliteDatabase, MockStorefront, MockProvider>::new()),
        ),
    )
    .await;
    let req = webhook_request("webhook-shop.myshopify.com").to_request();
    let err = test::try_call_service(&app, req).await.expect_err("Unsigned request should be rejected");
    assert_eq!(err.as_response_error().status_code(), StatusCode::FORBIDDEN);

    let req = webhook_request("webhook-shop.myshopify.com")
        .insert_header((SHOPIFY_HMAC_HEADER, "bm90IGEgc2lnbmF0dXJl"))
        .to_request();
    let err = test::try_call_service(&app, req).await.expect_err("Forged signature should be rejected");
    assert_eq!(err.as_response_error().status_code(), StatusCode::FORBIDDEN);

    // Signed with the right key, but for a different body
    let req = signed(webhook_request("webhook-shop.myshopify.com"), r#"{"id":1}"#).to_request();
    let err = test::try_call_service(&app, req).await.expect_err("Tampered body should be rejected");
    assert_eq!(err.as_response_error().status_code(), StatusCode::FORBIDDEN);
    assert!(err.to_string().contains("does not match"), "{err}");
}

#[actix_web::test]
async fn signed_webhooks_pass_through() {
    let db = setup_db().await;
    let api = fulfillment_api(&db, MockStorefront::new(), MockProvider::new());
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(
            web::scope("/shopify")
                .wrap(ShopifySignatureFactory::new(Secret::new(HMAC_SECRET.to_string()), true))
                .service(OrdersFulfilledRoute::<SqliteDatabase, MockStorefront, MockProvider>::new()),
        ),
    )
    .await;
    // Unknown shop, so neither mock is called
    let req = signed(webhook_request("stranger.myshopify.com"), ORDER_FULFILLED).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: JsonResponse = test::read_body_json(res).await;
    assert!(body.success);
}

#[actix_web::test]
async fn uninstall_marks_the_merchant() {
    let db = setup_db().await;
    connected_merchant(&db, "leaving-shop", Plan::Micro).await;
    let api: TestMerchantApi = MerchantApi::new(db.clone(), MockStorefront::new(), MockProvider::new());
    let app = test::init_service(
        App::new().app_data(web::Data::new(api)).service(
            web::scope("/shopify").service(AppUninstalledRoute::<SqliteDatabase, MockStorefront, MockProvider>::new()),
        ),
    )
    .await;
    let req = TestRequest::post()
        .uri("/shopify/webhook/app_uninstalled")
        .insert_header((SHOP_DOMAIN_HEADER, "leaving-shop.myshopify.com"))
        .insert_header(ContentType::json())
        .set_payload("{}")
        .to_request();
    let res: JsonResponse = test::call_and_read_body_json(&app, req).await;
    assert!(res.success);
    assert_eq!(res.message, "Merchant uninstalled.");
    let merchant = db.fetch_merchant("leaving-shop").await.unwrap().unwrap();
    assert!(merchant.uninstalled);

    let req = TestRequest::post()
        .uri("/shopify/webhook/app_uninstalled")
        .insert_header((SHOP_DOMAIN_HEADER, "never-installed.myshopify.com"))
        .to_request();
    let res: JsonResponse = test::call_and_read_body_json(&app, req).await;
    assert!(res.success);
    assert_eq!(res.message, "Unknown shop.");
}

#[actix_web::test]
async fn privacy_compliance_webhooks_are_acknowledged() {
    let app = test::init_service(
        App::new().service(
            web::scope("/shopify")
                .wrap(ShopifySignatureFactory::new(Secret::new(HMAC_SECRET.to_string()), true))
                .service(customers_data_request)
                .service(customers_redact)
                .service(shop_redact),
        ),
    )
    .await;
    let body = r#"{"shop_id":954889,"shop_domain":"webhook-shop.myshopify.com","customer":{"id":191167}}"#;
    for topic in ["customers/data_request", "customers/redact", "shop/redact"] {
        let req = TestRequest::post()
            .uri(&format!("/shopify/webhook/{topic}"))
            .insert_header((SHOP_DOMAIN_HEADER, "webhook-shop.myshopify.com"))
            .insert_header(ContentType::json())
            .set_payload(body);
        let res = test::call_service(&app, signed(req, body).to_request()).await;
        assert_eq!(res.status(), StatusCode::OK, "{topic}");
        let res: JsonResponse = test::read_body_json(res).await;
        assert!(res.success, "{topic}");
    }
    // They are signed like any other webhook
    let req = TestRequest::post().uri("/shopify/webhook/shop/redact").set_payload(body).to_request();
    let err = test::try_call_service(&app, req).await.expect_err("Unsigned request should be rejected");
    assert_eq!(err.as_response_error().status_code(), StatusCode::FORBIDDEN);
}
