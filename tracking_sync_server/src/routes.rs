//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution. Backfills take far longer than any request should, so the backfill trigger only accepts the job and hands
//! it to the background worker.
use actix_web::{get, http::StatusCode, web, HttpResponse, Responder};
use log::*;
use tracking_sync_engine::{
    sync_objects::BackfillAck,
    traits::{StorefrontApi, TrackingProvider},
    BackfillApi,
    BackfillQueue,
    MerchantApi,
    SyncDatabase,
};

use crate::{
    config::ServerOptions,
    data_objects::{
        BackfillStarted,
        MerchantRegistration,
        MerchantView,
        OrderRecordsQuery,
        PlanUpdate,
        ProviderCallbackParams,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Provider OAuth  ----------------------------------------------------
route!(paypal_callback => Get "/auth/callback" impl SyncDatabase, StorefrontApi, TrackingProvider);
/// Route handler for the payment provider's OAuth redirect.
///
/// The merchant started the flow with its merchant id as the `state` parameter. The authorization `code` is exchanged
/// for a token pair, which is stored on the merchant, and the storefront webhooks are installed.
pub async fn paypal_callback<B, S, P>(
    query: web::Query<ProviderCallbackParams>,
    api: web::Data<MerchantApi<B, S, P>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: SyncDatabase,
    S: StorefrontApi,
    P: TrackingProvider,
{
    let params = query.into_inner();
    debug!("💻️ GET provider callback for {}", params.state);
    let merchant = api.connect_provider(&params.state, &params.code, &options.public_url).await.map_err(|e| {
        warn!("💻️ Could not connect the payment provider account of {}. {e}", params.state);
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(MerchantView::from(merchant)))
}

//----------------------------------------------   Merchants  ----------------------------------------------------
route!(register_merchant => Post "/merchants" impl SyncDatabase, StorefrontApi, TrackingProvider);
/// Registers a merchant, or updates the storefront credentials and plan of an existing one.
pub async fn register_merchant<B, S, P>(
    body: web::Json<MerchantRegistration>,
    api: web::Data<MerchantApi<B, S, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: SyncDatabase,
    S: StorefrontApi,
    P: TrackingProvider,
{
    let registration = body.into_inner();
    debug!("💻️ POST register merchant {}", registration.shop_domain);
    let merchant = api.register_merchant(registration.into()).await?;
    Ok(HttpResponse::Ok().json(MerchantView::from(merchant)))
}

route!(merchant => Get "/merchants/{id}" impl SyncDatabase, StorefrontApi, TrackingProvider);
pub async fn merchant<B, S, P>(
    path: web::Path<String>,
    api: web::Data<MerchantApi<B, S, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: SyncDatabase,
    S: StorefrontApi,
    P: TrackingProvider,
{
    let id = path.into_inner();
    debug!("💻️ GET merchant {id}");
    let merchant = api.fetch_merchant(&id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Merchant {id}")))?;
    Ok(HttpResponse::Ok().json(MerchantView::from(merchant)))
}

route!(update_plan => Put "/merchants/{id}/plan" impl SyncDatabase, StorefrontApi, TrackingProvider);
pub async fn update_plan<B, S, P>(
    path: web::Path<String>,
    body: web::Json<PlanUpdate>,
    api: web::Data<MerchantApi<B, S, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: SyncDatabase,
    S: StorefrontApi,
    P: TrackingProvider,
{
    let id = path.into_inner();
    let update = body.into_inner();
    debug!("💻️ PUT plan {} ({}) for {id}", update.plan, update.status);
    let merchant = api.update_plan(&id, update.plan, update.status).await?;
    Ok(HttpResponse::Ok().json(MerchantView::from(merchant)))
}

route!(order_records => Get "/merchants/{id}/orders" impl SyncDatabase, StorefrontApi, TrackingProvider);
/// The merchant's order records, oldest first. Use `?status=PENDING` etc. to limit the list to one status.
pub async fn order_records<B, S, P>(
    path: web::Path<String>,
    query: web::Query<OrderRecordsQuery>,
    api: web::Data<MerchantApi<B, S, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: SyncDatabase,
    S: StorefrontApi,
    P: TrackingProvider,
{
    let id = path.into_inner();
    let status = query.into_inner().status;
    debug!("💻️ GET order records for {id} ({})", status.map(|s| s.to_string()).unwrap_or_else(|| "all".into()));
    let records = api.order_records(&id, status).await?;
    Ok(HttpResponse::Ok().json(records))
}

//----------------------------------------------   Backfill  ----------------------------------------------------
route!(trigger_backfill => Post "/merchants/{id}/backfill" impl SyncDatabase, StorefrontApi, TrackingProvider);
/// Starts the merchant's one-time historical backfill.
///
/// The eligible orders are stored as PENDING before this handler answers `202 Accepted`. Synchronising them happens on
/// the background worker. If the backfill has already been done, the answer is `200 OK` with status `already_done`.
pub async fn trigger_backfill<B, S, P>(
    path: web::Path<String>,
    api: web::Data<BackfillApi<B, S, P>>,
    queue: web::Data<BackfillQueue>,
) -> Result<HttpResponse, ServerError>
where
    B: SyncDatabase,
    S: StorefrontApi,
    P: TrackingProvider,
{
    let id = path.into_inner();
    debug!("💻️ POST backfill for {id}");
    match api.start_historical_backfill(&id).await? {
        BackfillAck::Started(job) => {
            let orders = job.order_count;
            if !queue.enqueue(job).await {
                // The job is durable, so it is picked up again on the next start
                error!("💻️ The backfill worker is not running. The backfill for {id} will resume after a restart.");
            }
            let body = BackfillStarted { status: "started".into(), orders };
            Ok(HttpResponse::build(StatusCode::ACCEPTED).json(body))
        },
        BackfillAck::AlreadyDone => {
            let body = BackfillStarted { status: "already_done".into(), orders: 0 };
            Ok(HttpResponse::Ok().json(body))
        },
    }
}
