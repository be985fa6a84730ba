use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use tracking_sync_engine::{SyncDatabaseError, SyncError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("A valid API key is required.")]
    Unauthorized,
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request could not be completed. {0}")]
    Conflict(String),
    #[error("An upstream service failed. {0}")]
    UpstreamError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<SyncError> for ServerError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::MerchantNotFound(id) => Self::NoRecordFound(format!("Merchant {id}")),
            SyncError::DatabaseError(SyncDatabaseError::MerchantNotFound(id)) => {
                Self::NoRecordFound(format!("Merchant {id}"))
            },
            SyncError::ProviderNotConnected(_) | SyncError::MerchantUninstalled(_) => Self::Conflict(e.to_string()),
            SyncError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            SyncError::StorefrontError(e) => Self::UpstreamError(e.to_string()),
            SyncError::ProviderError(e) => Self::UpstreamError(e.to_string()),
        }
    }
}
