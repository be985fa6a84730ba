use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, LINK},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::{ShopSession, ShopifyConfig},
    data_objects::{NewWebhook, Webhook},
    helpers::next_page_info,
    ShopifyApiError,
    ShopifyOrder,
    ShopifyTransaction,
};

/// Page size for order listings. 250 is the maximum Shopify allows.
pub const ORDERS_PAGE_LIMIT: u32 = 250;

/// A REST client for the Shopify Admin API. One client serves every shop; the shop and its access token are passed
/// in with each call as a [`ShopSession`].
#[derive(Clone)]
pub struct ShopifyApi {
    config: ShopifyConfig,
    client: Arc<Client>,
}

#[derive(Debug, Clone, Default)]
pub struct OrdersPage {
    pub orders: Vec<ShopifyOrder>,
    /// Cursor for the next page, if there is one
    pub next_page_info: Option<String>,
}

impl ShopifyApi {
    pub fn new(config: ShopifyConfig) -> Result<Self, ShopifyApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ShopifyApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        session: &ShopSession,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, ShopifyApiError> {
        self.rest_query_with_headers(session, method, path, params, body).await.map(|(result, _)| result)
    }

    /// As [`Self::rest_query`], but also hands back the response headers (e.g. for `Link` pagination).
    pub async fn rest_query_with_headers<T: DeserializeOwned, B: Serialize>(
        &self,
        session: &ShopSession,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<(T, HeaderMap), ShopifyApiError> {
        let url = self.url(session, path);
        trace!("🛍️ Sending REST query: {url}");
        let token = HeaderValue::from_str(session.access_token.reveal().as_str())
            .map_err(|_| ShopifyApiError::InvalidAccessToken(session.shop.clone()))?;
        let mut req = self.client.request(method, url).header("X-Shopify-Access-Token", token);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| ShopifyApiError::RestRequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("🛍️ REST query successful. {}", response.status());
            let headers = response.headers().clone();
            let result = response.json::<T>().await.map_err(|e| ShopifyApiError::JsonError(e.to_string()))?;
            Ok((result, headers))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ShopifyApiError::RestResponseError(e.to_string()))?;
            Err(ShopifyApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, session: &ShopSession, path: &str) -> String {
        format!("https://{}/admin/api/{}{path}", session.shop, self.config.api_version)
    }

    /// Fetches one page of orders, of any status. Pass the cursor from the previous page to continue.
    pub async fn fetch_orders_page(
        &self,
        session: &ShopSession,
        page_info: Option<&str>,
    ) -> Result<OrdersPage, ShopifyApiError> {
        #[derive(Deserialize)]
        struct OrdersResponse {
            orders: Vec<ShopifyOrder>,
        }
        let limit = ORDERS_PAGE_LIMIT.to_string();
        // Shopify rejects filters other than `limit` once a page cursor is supplied
        let params = match page_info {
            Some(cursor) => vec![("limit", limit.as_str()), ("page_info", cursor)],
            None => vec![("limit", limit.as_str()), ("status", "any")],
        };
        let (result, headers) = self
            .rest_query_with_headers::<OrdersResponse, ()>(session, Method::GET, "/orders.json", &params, None)
            .await?;
        let next_page_info = headers.get(LINK).and_then(|v| v.to_str().ok()).and_then(next_page_info);
        Ok(OrdersPage { orders: result.orders, next_page_info })
    }

    /// Walks every page of the shop's order list.
    pub async fn fetch_all_orders(&self, session: &ShopSession) -> Result<Vec<ShopifyOrder>, ShopifyApiError> {
        let mut orders = vec![];
        let mut cursor: Option<String> = None;
        loop {
            let page = self.fetch_orders_page(session, cursor.as_deref()).await?;
            debug!("🛍️ Fetched {} orders from {}", page.orders.len(), session.shop);
            orders.extend(page.orders);
            match page.next_page_info {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        info!("🛍️ Fetched {} orders in total from {}", orders.len(), session.shop);
        Ok(orders)
    }

    pub async fn fetch_transactions(
        &self,
        session: &ShopSession,
        order_id: i64,
    ) -> Result<Vec<ShopifyTransaction>, ShopifyApiError> {
        #[derive(Deserialize)]
        struct TransactionsResponse {
            transactions: Vec<ShopifyTransaction>,
        }
        let path = format!("/orders/{order_id}/transactions.json");
        trace!("🛍️ Fetching transactions for order {order_id}");
        let result = self.rest_query::<TransactionsResponse, ()>(session, Method::GET, &path, &[], None).await?;
        Ok(result.transactions)
    }

    pub async fn install_webhook(
        &self,
        session: &ShopSession,
        address: &str,
        topic: &str,
    ) -> Result<Webhook, ShopifyApiError> {
        #[derive(Serialize)]
        struct WebhookInput {
            webhook: NewWebhook,
        }
        #[derive(Deserialize)]
        struct WebhookResponse {
            webhook: Webhook,
        }
        let webhook = NewWebhook { topic: topic.to_string(), address: address.to_string(), format: "json".to_string() };
        let input = WebhookInput { webhook };
        debug!("🛍️ Installing webhook: {}", serde_json::to_string(&input).unwrap_or_default());
        let result = self
            .rest_query::<WebhookResponse, WebhookInput>(session, Method::POST, "/webhooks.json", &[], Some(input))
            .await?;
        info!("🛍️ Installed {topic} webhook on {}: {:?}", session.shop, result.webhook.id);
        Ok(result.webhook)
    }
}
