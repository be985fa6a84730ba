use std::sync::Arc;

use log::*;
use pts_common::Secret;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Response,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    config::PaypalConfig,
    PaypalApiError,
    PaypalIdentity,
    TokenGrant,
    Tracker,
    TrackerBatchOutcome,
    TrackerBatchRequest,
    TrackerBatchResponse,
};

/// PayPal accepts at most this many trackers in a single `trackers-batch` call.
pub const MAX_TRACKERS_PER_BATCH: usize = 20;

#[derive(Clone)]
pub struct PaypalApi {
    config: PaypalConfig,
    client: Arc<Client>,
}

impl PaypalApi {
    pub fn new(config: PaypalConfig) -> Result<Self, PaypalApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers.insert("Accept-Language", HeaderValue::from_static("en_US"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaypalApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    /// Submits up to [`MAX_TRACKERS_PER_BATCH`] trackers, marking their payments as shipped.
    ///
    /// Only a failure to get any answer from PayPal is an `Err`. Every answer is classified by
    /// [`classify_batch_response`].
    pub async fn add_trackers_batch(
        &self,
        trackers: &[Tracker],
        access_token: &Secret<String>,
    ) -> Result<TrackerBatchOutcome, PaypalApiError> {
        if trackers.len() > MAX_TRACKERS_PER_BATCH {
            return Err(PaypalApiError::TooManyTrackers { count: trackers.len(), max: MAX_TRACKERS_PER_BATCH });
        }
        let body = TrackerBatchRequest { trackers: trackers.to_vec() };
        debug!("💳️ Submitting {} trackers to PayPal", trackers.len());
        let response = self
            .client
            .post(self.url("/shipping/trackers-batch"))
            .bearer_auth(access_token.reveal())
            .json(&body)
            .send()
            .await
            .map_err(|e| PaypalApiError::RestRequestError(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| PaypalApiError::RestResponseError(e.to_string()))?;
        trace!("💳️ trackers-batch response ({status}): {text}");
        Ok(classify_batch_response(status, &text))
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn refresh_access_token(&self, refresh_token: &Secret<String>) -> Result<TokenGrant, PaypalApiError> {
        debug!("💳️ Refreshing PayPal access token");
        self.token_request(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token.reveal().as_str())])
            .await
    }

    /// Exchanges the authorization code handed to the OAuth callback for an access/refresh token pair.
    pub async fn exchange_authorization_code(&self, code: &str) -> Result<TokenGrant, PaypalApiError> {
        debug!("💳️ Exchanging PayPal authorization code");
        self.token_request(&[("grant_type", "authorization_code"), ("code", code)]).await
    }

    pub async fn fetch_identity(&self, access_token: &Secret<String>) -> Result<PaypalIdentity, PaypalApiError> {
        let response = self
            .client
            .get(self.url("/identity/oauth2/userinfo"))
            .query(&[("schema", "paypalv1.1")])
            .bearer_auth(access_token.reveal())
            .send()
            .await
            .map_err(|e| PaypalApiError::RestRequestError(e.to_string()))?;
        parse_json(response).await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenGrant, PaypalApiError> {
        let response = self
            .client
            .post(self.url("/oauth2/token"))
            .basic_auth(&self.config.client_id, Some(self.config.client_secret.reveal()))
            .form(form)
            .send()
            .await
            .map_err(|e| PaypalApiError::RestRequestError(e.to_string()))?;
        parse_json(response).await
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, PaypalApiError> {
    if response.status().is_success() {
        response.json::<T>().await.map_err(|e| PaypalApiError::JsonError(e.to_string()))
    } else {
        let status = response.status().as_u16();
        let message = response.text().await.map_err(|e| PaypalApiError::RestResponseError(e.to_string()))?;
        Err(PaypalApiError::QueryError { status, message })
    }
}

/// Decides what a `trackers-batch` answer means for the caller.
///
/// * 2xx with no `errors`: `Accepted`.
/// * 2xx with item errors: `AcceptedWithErrors`. The errors are logged here and never retried.
/// * Any other status whose body has `"error": "invalid_token"`: `InvalidToken`.
/// * Anything else is logged and reported as `Accepted`, so that one odd response never stalls a batch loop.
pub fn classify_batch_response(status: u16, body: &str) -> TrackerBatchOutcome {
    if (200..300).contains(&status) {
        return match serde_json::from_str::<TrackerBatchResponse>(body) {
            Ok(TrackerBatchResponse { errors: Some(errors), .. }) if !errors.is_empty() => {
                let summary = serde_json::to_string(&errors).unwrap_or_default();
                error!("💳️ PayPal accepted the batch but flagged {} trackers: {summary}", errors.len());
                TrackerBatchOutcome::AcceptedWithErrors(errors)
            },
            Ok(_) => TrackerBatchOutcome::Accepted,
            Err(e) => {
                warn!("💳️ Could not read the trackers-batch response body. {e}. Treating the batch as accepted.");
                TrackerBatchOutcome::Accepted
            },
        };
    }
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<String>,
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error: Some(e) }) if e == "invalid_token" => {
            warn!("💳️ PayPal rejected the access token ({status})");
            TrackerBatchOutcome::InvalidToken
        },
        _ => {
            error!("💳️ PayPal answered the trackers-batch call with status {status}: {body}");
            TrackerBatchOutcome::Accepted
        },
    }
}
