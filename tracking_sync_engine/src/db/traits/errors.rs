use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SyncDatabaseError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Merchant {0} does not exist")]
    MerchantNotFound(String),
    #[error("Could not (de)serialize a stored value: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for SyncDatabaseError {
    fn from(e: sqlx::Error) -> Self {
        SyncDatabaseError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for SyncDatabaseError {
    fn from(e: serde_json::Error) -> Self {
        SyncDatabaseError::SerializationError(e.to_string())
    }
}
