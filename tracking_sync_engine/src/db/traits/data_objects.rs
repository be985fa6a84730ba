use serde::{Deserialize, Serialize};

use crate::db_types::OrderStatusType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertOrderResult {
    Inserted(i64),
    AlreadyExists(i64),
}

/// The result of the quota-checked insert on the webhook path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiveOrderInsert {
    /// The record was created as PROCESSING. The caller must finalise it.
    Processing(i64),
    /// The record was created as INSUFFICIENT_CREDITS. Nothing further happens to it.
    InsufficientCredits(i64),
    /// A record for this storefront order already exists.
    AlreadyExists(i64),
}

impl LiveOrderInsert {
    pub fn from_status(id: i64, status: OrderStatusType) -> Self {
        match status {
            OrderStatusType::InsufficientCredits => Self::InsufficientCredits(id),
            _ => Self::Processing(id),
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Self::Processing(id) | Self::InsufficientCredits(id) | Self::AlreadyExists(id) => *id,
        }
    }
}

impl From<LiveOrderInsert> for InsertOrderResult {
    fn from(value: LiveOrderInsert) -> Self {
        match value {
            LiveOrderInsert::AlreadyExists(id) => InsertOrderResult::AlreadyExists(id),
            other => InsertOrderResult::Inserted(other.id()),
        }
    }
}
