use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use paypal_tools::PaypalApi;
use shopify_tools::ShopifyApi;
use tracking_sync_engine::{
    db_types::BackfillJob,
    traits::{StorefrontApi, TrackingProvider},
    BackfillApi,
    BackfillQueue,
    BackfillWorker,
    CredentialGuard,
    FulfillmentApi,
    JobHandler,
    MerchantApi,
    SqliteDatabase,
    SyncDatabase,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::{paypal::PaypalTracking, shopify::ShopifyStorefront},
    middleware::{AdminKeyMiddlewareFactory, ShopifySignatureFactory},
    routes::{
        health,
        MerchantRoute,
        OrderRecordsRoute,
        PaypalCallbackRoute,
        RegisterMerchantRoute,
        TriggerBackfillRoute,
        UpdatePlanRoute,
    },
    shopify_routes::{customers_data_request, customers_redact, shop_redact, AppUninstalledRoute, OrdersFulfilledRoute},
};

const BACKFILL_QUEUE_SIZE: usize = 64;

pub type ServerBackfillApi = BackfillApi<SqliteDatabase, ShopifyStorefront, PaypalTracking>;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let shopify_api = ShopifyApi::new(config.shopify_config.api.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not create the Shopify client. {e}")))?;
    let paypal_api = PaypalApi::new(config.paypal_config.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not create the PayPal client. {e}")))?;
    let backfill_api = Arc::new(BackfillApi::new(
        config.sync_config.clone(),
        db,
        ShopifyStorefront::new(shopify_api),
        PaypalTracking::new(paypal_api),
        CredentialGuard::new(),
    ));
    let queue = start_backfill_worker(Arc::clone(&backfill_api));
    resume_unfinished_backfills(backfill_api.as_ref(), &queue).await;
    let srv = create_server_instance(config, backfill_api, queue)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Spawns the worker that runs accepted backfills, one at a time. Do not drop the returned queue if you want the
/// worker to keep running.
pub fn start_backfill_worker(api: Arc<ServerBackfillApi>) -> BackfillQueue {
    let handler: JobHandler = Arc::new(move |job: BackfillJob| {
        let api = Arc::clone(&api);
        Box::pin(async move {
            match api.run_backfill(&job).await {
                Ok(report) => info!(
                    "📦️ Backfill #{} for {} finished. {} of {} chunks synchronised, {} orders processed",
                    report.job_id, report.merchant_id, report.chunks_synced, report.chunks, report.orders_processed
                ),
                Err(e) => error!("📦️ Backfill #{} for {} did not run. {e}", job.id, job.merchant_id),
            }
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let worker = BackfillWorker::new(BACKFILL_QUEUE_SIZE, handler);
    let queue = worker.queue();
    tokio::spawn(worker.start());
    queue
}

/// Jobs are persisted when a backfill is accepted, so anything left unfinished by a previous run is queued again.
pub async fn resume_unfinished_backfills<B, S, P>(api: &BackfillApi<B, S, P>, queue: &BackfillQueue)
where
    B: SyncDatabase,
    S: StorefrontApi,
    P: TrackingProvider,
{
    match api.unfinished_jobs().await {
        Ok(jobs) if jobs.is_empty() => debug!("📬️ No unfinished backfills to resume"),
        Ok(jobs) => {
            info!("📬️ Resuming {} unfinished backfills", jobs.len());
            for job in jobs {
                queue.enqueue(job).await;
            }
        },
        Err(e) => error!("📬️ Could not load unfinished backfills. They will not run until the next restart. {e}"),
    }
}

pub fn create_server_instance(
    config: ServerConfig,
    backfill_api: Arc<ServerBackfillApi>,
    queue: BackfillQueue,
) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let (host, port) = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let db = backfill_api.db().clone();
        let storefront = backfill_api.storefront().clone();
        let provider = backfill_api.provider().clone();
        let fulfillment_api = FulfillmentApi::new(
            config.sync_config.clone(),
            db.clone(),
            storefront.clone(),
            provider.clone(),
            backfill_api.guard().clone(),
        );
        let merchant_api = MerchantApi::new(db, storefront, provider);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("pts::access_log"))
            .app_data(web::Data::new(fulfillment_api))
            .app_data(web::Data::new(merchant_api))
            .app_data(web::Data::from(Arc::clone(&backfill_api)))
            .app_data(web::Data::new(queue.clone()))
            .app_data(web::Data::new(options.clone()));
        let shopify_config = &config.shopify_config;
        let shopify_scope = web::scope("/shopify")
            .wrap(ShopifySignatureFactory::new(shopify_config.hmac_secret.clone(), shopify_config.hmac_checks))
            .service(OrdersFulfilledRoute::<SqliteDatabase, ShopifyStorefront, PaypalTracking>::new())
            .service(AppUninstalledRoute::<SqliteDatabase, ShopifyStorefront, PaypalTracking>::new())
            .service(customers_data_request)
            .service(customers_redact)
            .service(shop_redact);
        let paypal_scope =
            web::scope("/paypal").service(PaypalCallbackRoute::<SqliteDatabase, ShopifyStorefront, PaypalTracking>::new());
        let admin_scope = web::scope("/api")
            .wrap(AdminKeyMiddlewareFactory::new(config.admin_api_key.clone()))
            .service(RegisterMerchantRoute::<SqliteDatabase, ShopifyStorefront, PaypalTracking>::new())
            .service(MerchantRoute::<SqliteDatabase, ShopifyStorefront, PaypalTracking>::new())
            .service(UpdatePlanRoute::<SqliteDatabase, ShopifyStorefront, PaypalTracking>::new())
            .service(OrderRecordsRoute::<SqliteDatabase, ShopifyStorefront, PaypalTracking>::new())
            .service(TriggerBackfillRoute::<SqliteDatabase, ShopifyStorefront, PaypalTracking>::new());
        app.service(health).service(shopify_scope).service(paypal_scope).service(admin_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
