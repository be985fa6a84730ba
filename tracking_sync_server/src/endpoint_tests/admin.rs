use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use pts_common::Secret;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracking_sync_engine::{
    db_types::{NewMerchant, OrderStatusType, Plan, TrackingEntry},
    sync_objects::{FulfilledOrder, ProviderGrant},
    test_utils::prepare_env::connected_merchant,
    BackfillApi,
    BackfillQueue,
    CredentialGuard,
    MerchantApi,
    MerchantManagement,
    SqliteDatabase,
    SyncConfig,
};

use super::{
    helpers::{bearer, records_for, setup_db, status_and_body, ADMIN_KEY},
    mocks::{MockProvider, MockStorefront},
};
use crate::{
    config::ServerOptions,
    data_objects::{BackfillStarted, MerchantView},
    middleware::AdminKeyMiddlewareFactory,
    routes::{
        MerchantRoute,
        OrderRecordsRoute,
        PaypalCallbackRoute,
        RegisterMerchantRoute,
        TriggerBackfillRoute,
        UpdatePlanRoute,
    },
};

type TestMerchantApi = MerchantApi<SqliteDatabase, MockStorefront, MockProvider>;

fn admin_scope() -> actix_web::Scope<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    web::scope("/api")
        .wrap(AdminKeyMiddlewareFactory::new(Secret::new(ADMIN_KEY.to_string())))
        .service(RegisterMerchantRoute::<SqliteDatabase, MockStorefront, MockProvider>::new())
        .service(MerchantRoute::<SqliteDatabase, MockStorefront, MockProvider>::new())
        .service(UpdatePlanRoute::<SqliteDatabase, MockStorefront, MockProvider>::new())
        .service(OrderRecordsRoute::<SqliteDatabase, MockStorefront, MockProvider>::new())
        .service(TriggerBackfillRoute::<SqliteDatabase, MockStorefront, MockProvider>::new())
}

fn paypal_order(id: i64, name: &str) -> FulfilledOrder {
    FulfilledOrder::new(id, name).with_gateway("paypal").with_tracking(TrackingEntry::new(format!("TRK{id}"), Some("UPS")))
}

#[actix_web::test]
async fn admin_routes_need_the_api_key() {
    let db = setup_db().await;
    let api: TestMerchantApi = MerchantApi::new(db, MockStorefront::new(), MockProvider::new());
    let app = test::init_service(App::new().app_data(web::Data::new(api)).service(admin_scope())).await;

    let req = TestRequest::get().uri("/api/merchants/anyone").to_request();
    let err = test::try_call_service(&app, req).await.expect_err("Request without a key should fail");
    assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

    let req = TestRequest::get().uri("/api/merchants/anyone").insert_header(("Authorization", "Bearer guess")).to_request();
    let err = test::try_call_service(&app, req).await.expect_err("Request with the wrong key should fail");
    assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

    let req = TestRequest::get().uri("/api/merchants/anyone").insert_header(bearer()).to_request();
    let res = test::call_service(&app, req).await;
    let (status, body) = status_and_body(res).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Merchant anyone"), "{body}");
}

#[actix_web::test]
async fn register_and_update_a_merchant() {
    let db = setup_db().await;
    let api: TestMerchantApi = MerchantApi::new(db.clone(), MockStorefront::new(), MockProvider::new());
    let app = test::init_service(App::new().app_data(web::Data::new(api)).service(admin_scope())).await;

    let registration = json!({
        "shop_domain": "lucky-socks.myshopify.com",
        "shopify_access_token": "shpat_secret_value",
        "plan": "MICRO"
    });
    let req = TestRequest::post().uri("/api/merchants").insert_header(bearer()).set_json(&registration).to_request();
    let res = test::call_service(&app, req).await;
    let (status, body) = status_and_body(res).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("shpat_secret_value"), "Tokens must not be returned: {body}");
    let view: MerchantView = serde_json::from_str(&body).unwrap();
    assert_eq!(view.id, "lucky-socks");
    assert_eq!(view.plan, Plan::Micro);
    assert_eq!(view.monthly_sync_limit, 100);
    assert!(!view.provider_connected);

    let req = TestRequest::put()
        .uri("/api/merchants/lucky-socks/plan")
        .insert_header(bearer())
        .set_json(json!({"plan": "ADVENTURE"}))
        .to_request();
    let view: MerchantView = test::call_and_read_body_json(&app, req).await;
    assert_eq!(view.plan, Plan::Adventure);
    assert_eq!(view.monthly_sync_limit, 4999);
    let stored = db.fetch_merchant("lucky-socks").await.unwrap().unwrap();
    assert_eq!(stored.plan, Plan::Adventure);
}

#[actix_web::test]
async fn backfill_is_accepted_once() {
    let db = setup_db().await;
    connected_merchant(&db, "history-shop", Plan::Discovery).await;
    let mut storefront = MockStorefront::new();
    storefront.expect_fetch_orders().times(1).returning(|_| {
        Ok(vec![
            paypal_order(1, "#1001"),
            paypal_order(2, "#1002"),
            FulfilledOrder::new(3, "#1003").with_gateway("manual").with_tracking(TrackingEntry::new("TRK3", None)),
            FulfilledOrder::new(4, "#1004").with_gateway("paypal"),
            paypal_order(5, "#1005"),
        ])
    });
    let mut provider = MockProvider::new();
    provider.expect_submit_trackers().never();
    let backfill_api = BackfillApi::new(SyncConfig::default(), db.clone(), storefront, provider, CredentialGuard::new());
    let merchant_api: TestMerchantApi = MerchantApi::new(db.clone(), MockStorefront::new(), MockProvider::new());
    let (sender, mut receiver) = mpsc::channel(4);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(backfill_api))
            .app_data(web::Data::new(merchant_api))
            .app_data(web::Data::new(BackfillQueue::new(sender)))
            .service(admin_scope()),
    )
    .await;

    let req = TestRequest::post().uri("/api/merchants/history-shop/backfill").insert_header(bearer()).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let started: BackfillStarted = test::read_body_json(res).await;
    assert_eq!(started.status, "started");
    assert_eq!(started.orders, 3);
    let job = receiver.try_recv().expect("The job should have been queued");
    assert_eq!(job.merchant_id, "history-shop");
    assert_eq!(job.order_count, 3);

    let records = records_for(&db, "history-shop").await;
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.historical && r.status == OrderStatusType::Pending));

    let req = TestRequest::post().uri("/api/merchants/history-shop/backfill").insert_header(bearer()).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let again: BackfillStarted = test::read_body_json(res).await;
    assert_eq!(again.status, "already_done");
    assert_eq!(again.orders, 0);
    assert!(receiver.try_recv().is_err());

    let req = TestRequest::get()
        .uri("/api/merchants/history-shop/orders?status=PENDING")
        .insert_header(bearer())
        .to_request();
    let pending: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(pending.as_array().map(Vec::len), Some(3));
    let req = TestRequest::get()
        .uri("/api/merchants/history-shop/orders?status=PROCESSED")
        .insert_header(bearer())
        .to_request();
    let processed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(processed.as_array().map(Vec::len), Some(0));
}

#[actix_web::test]
async fn backfill_for_unknown_merchant_is_not_found() {
    let db = setup_db().await;
    let mut storefront = MockStorefront::new();
    storefront.expect_fetch_orders().never();
    let backfill_api = BackfillApi::new(SyncConfig::default(), db, storefront, MockProvider::new(), CredentialGuard::new());
    let (sender, _receiver) = mpsc::channel(1);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(backfill_api))
            .app_data(web::Data::new(BackfillQueue::new(sender)))
            .service(admin_scope()),
    )
    .await;
    let req = TestRequest::post().uri("/api/merchants/nobody/backfill").insert_header(bearer()).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn backfill_before_connecting_the_provider_is_a_conflict() {
    let db = setup_db().await;
    let merchant = NewMerchant::new("early-shop", "early-shop.myshopify.com", Secret::from("shpat_early"));
    db.register_merchant(merchant).await.unwrap();
    let mut storefront = MockStorefront::new();
    storefront.expect_fetch_orders().never();
    let backfill_api =
        BackfillApi::new(SyncConfig::default(), db.clone(), storefront, MockProvider::new(), CredentialGuard::new());
    let (sender, mut receiver) = mpsc::channel(1);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(backfill_api))
            .app_data(web::Data::new(BackfillQueue::new(sender)))
            .service(admin_scope()),
    )
    .await;
    let req = TestRequest::post().uri("/api/merchants/early-shop/backfill").insert_header(bearer()).to_request();
    let res = test::call_service(&app, req).await;
    let (status, body) = status_and_body(res).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("has not connected"), "{body}");
    assert!(receiver.try_recv().is_err());
    let stored = db.fetch_merchant("early-shop").await.unwrap().unwrap();
    assert!(!stored.backfill_done);
}

#[actix_web::test]
async fn provider_callback_connects_the_merchant() {
    let db = setup_db().await;
    let merchant = NewMerchant::new("new-shop", "new-shop.myshopify.com", Secret::from("shpat_new"));
    db.register_merchant(merchant).await.unwrap();
    let mut storefront = MockStorefront::new();
    storefront.expect_install_webhook().times(2).returning(|merchant, address, _topic| {
        assert_eq!(merchant.id, "new-shop");
        assert!(address.starts_with("https://sync.example.com/shopify/webhook/"), "{address}");
        Ok(())
    });
    let mut provider = MockProvider::new();
    provider.expect_exchange_authorization_code().times(1).returning(|code| {
        assert_eq!(code, "auth-code");
        Ok(ProviderGrant {
            access_token: Secret::from("access-new"),
            refresh_token: Secret::from("refresh-new"),
            email: Some("owner@new-shop.com".into()),
        })
    });
    let api: TestMerchantApi = MerchantApi::new(db.clone(), storefront, provider);
    let options = ServerOptions { public_url: "https://sync.example.com/".into() };
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(options))
            .service(web::scope("/paypal").service(PaypalCallbackRoute::<SqliteDatabase, MockStorefront, MockProvider>::new())),
    )
    .await;
    let req = TestRequest::get().uri("/paypal/auth/callback?code=auth-code&state=new-shop").to_request();
    let view: MerchantView = test::call_and_read_body_json(&app, req).await;
    assert!(view.provider_connected);
    assert_eq!(view.provider_email.as_deref(), Some("owner@new-shop.com"));
    let stored = db.fetch_merchant("new-shop").await.unwrap().unwrap();
    assert_eq!(stored.paypal_refresh_token.reveal(), "refresh-new");
}
