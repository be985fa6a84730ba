use pts_common::Secret;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::carriers::Carrier;

pub const SHIPPED: &str = "SHIPPED";

/// One entry in a `trackers-batch` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    pub transaction_id: String,
    pub tracking_number: String,
    pub status: String,
    pub carrier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier_name_other: Option<String>,
}

impl Tracker {
    /// A tracker marking the payment `transaction_id` as shipped with the given carrier.
    pub fn shipped<S1: Into<String>, S2: Into<String>>(
        transaction_id: S1,
        tracking_number: S2,
        carrier_name: Option<&str>,
    ) -> Self {
        let carrier = Carrier::from_name(carrier_name);
        Self {
            transaction_id: transaction_id.into(),
            tracking_number: tracking_number.into(),
            status: SHIPPED.to_string(),
            carrier: carrier.code().to_string(),
            carrier_name_other: carrier.other_name().map(String::from),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerBatchRequest {
    pub trackers: Vec<Tracker>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerBatchResponse {
    #[serde(default)]
    pub tracker_identifiers: Vec<Value>,
    #[serde(default)]
    pub errors: Option<Vec<PaypalError>>,
}

/// An item-level error reported inside an otherwise successful batch response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaypalError {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
}

/// How PayPal answered a tracker batch.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerBatchOutcome {
    Accepted,
    /// The batch was accepted but some trackers were flagged. These are not retried.
    AcceptedWithErrors(Vec<PaypalError>),
    /// The bearer token was rejected. A fresh access token is needed.
    InvalidToken,
}

impl TrackerBatchOutcome {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, TrackerBatchOutcome::InvalidToken)
    }
}

/// The `oauth2/token` response for both the authorization-code and refresh-token grants. Refresh responses do not
/// carry a new refresh token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: Secret<String>,
    #[serde(default)]
    pub refresh_token: Option<Secret<String>>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaypalIdentity {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub emails: Vec<PaypalEmail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaypalEmail {
    pub value: String,
    #[serde(default)]
    pub primary: bool,
}

impl PaypalIdentity {
    /// The primary e-mail address, or the first one listed if none is flagged as primary.
    pub fn primary_email(&self) -> Option<&str> {
        self.emails.iter().find(|e| e.primary).or_else(|| self.emails.first()).map(|e| e.value.as_str())
    }
}
