//! Storefront webhook handlers.
//!
//! Shopify retries any delivery that is not answered with a 2xx status, so once a payload has been accepted these
//! handlers always answer 200. The outcome is reported in the [`JsonResponse`] body and in the logs.

use actix_web::{post, web, HttpRequest, HttpResponse};
use log::*;
use shopify_tools::ShopifyOrder;
use tracking_sync_engine::{
    sync_objects::FulfillmentOutcome,
    traits::{StorefrontApi, TrackingProvider},
    FulfillmentApi,
    MerchantApi,
    SyncDatabase,
};

use crate::{data_objects::JsonResponse, integrations::shopify::fulfilled_order_from_shopify, route};

pub const SHOP_DOMAIN_HEADER: &str = "X-Shopify-Shop-Domain";

route!(orders_fulfilled => Post "/webhook/orders_fulfilled" impl SyncDatabase, StorefrontApi, TrackingProvider);
pub async fn orders_fulfilled<B, S, P>(
    req: HttpRequest,
    body: web::Json<ShopifyOrder>,
    api: web::Data<FulfillmentApi<B, S, P>>,
) -> HttpResponse
where
    B: SyncDatabase,
    S: StorefrontApi,
    P: TrackingProvider,
{
    trace!("🚚️ Received orders/fulfilled webhook: {}", req.uri());
    let Some(shop_domain) = shop_domain(&req) else {
        warn!("🚚️ orders/fulfilled webhook without a {SHOP_DOMAIN_HEADER} header. Ignoring it.");
        return HttpResponse::Ok().json(JsonResponse::failure("Missing shop domain."));
    };
    let order = fulfilled_order_from_shopify(body.into_inner());
    let name = order.name.clone();
    let result = match api.handle_fulfilled_order(&shop_domain, order).await {
        Ok(outcome @ FulfillmentOutcome::Skipped(_)) => {
            debug!("🚚️ Order {name} from {shop_domain}: {outcome}");
            JsonResponse::success(outcome)
        },
        Ok(outcome @ (FulfillmentOutcome::Processed | FulfillmentOutcome::InsufficientCredits)) => {
            info!("🚚️ Order {name} from {shop_domain}: {outcome}");
            JsonResponse::success(outcome)
        },
        Ok(outcome @ FulfillmentOutcome::Failed) => {
            warn!("🚚️ Order {name} from {shop_domain}: {outcome}");
            JsonResponse::failure(outcome)
        },
        Err(e) => {
            error!("🚚️ Could not handle order {name} from {shop_domain}. {e}");
            JsonResponse::failure("Unexpected error handling order.")
        },
    };
    HttpResponse::Ok().json(result)
}

route!(app_uninstalled => Post "/webhook/app_uninstalled" impl SyncDatabase, StorefrontApi, TrackingProvider);
pub async fn app_uninstalled<B, S, P>(req: HttpRequest, api: web::Data<MerchantApi<B, S, P>>) -> HttpResponse
where
    B: SyncDatabase,
    S: StorefrontApi,
    P: TrackingProvider,
{
    let Some(shop_domain) = shop_domain(&req) else {
        warn!("🛍️ app/uninstalled webhook without a {SHOP_DOMAIN_HEADER} header. Ignoring it.");
        return HttpResponse::Ok().json(JsonResponse::failure("Missing shop domain."));
    };
    let result = match api.uninstall(&shop_domain).await {
        Ok(Some(_)) => JsonResponse::success("Merchant uninstalled."),
        Ok(None) => JsonResponse::success("Unknown shop."),
        Err(e) => {
            error!("🛍️ Could not mark {shop_domain} as uninstalled. {e}");
            JsonResponse::failure("Unexpected error handling uninstall.")
        },
    };
    HttpResponse::Ok().json(result)
}

//----------------------------------------------   Privacy compliance  ----------------------------------------------
// Shopify requires every app to accept these. Only order ids, order names and tracking numbers are stored, with no
// customer details, so there is nothing to export or erase for a customer. Shop data goes with the merchant record.

#[post("/webhook/customers/data_request")]
pub async fn customers_data_request(req: HttpRequest) -> HttpResponse {
    acknowledge_compliance_webhook("customers/data_request", &req)
}

#[post("/webhook/customers/redact")]
pub async fn customers_redact(req: HttpRequest) -> HttpResponse {
    acknowledge_compliance_webhook("customers/redact", &req)
}

#[post("/webhook/shop/redact")]
pub async fn shop_redact(req: HttpRequest) -> HttpResponse {
    acknowledge_compliance_webhook("shop/redact", &req)
}

fn acknowledge_compliance_webhook(topic: &str, req: &HttpRequest) -> HttpResponse {
    let shop = shop_domain(req).unwrap_or_else(|| "an unknown shop".to_string());
    info!("🛍️ Received {topic} webhook from {shop}. No customer data is held.");
    HttpResponse::Ok().json(JsonResponse::success("No customer data is held."))
}

fn shop_domain(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(SHOP_DOMAIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
