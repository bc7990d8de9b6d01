use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    models::common::ErrorResponse,
    services::{
        receipt_decoder::DecodeError, subscription_store::StoreError,
        transaction_client::ServerApiError, validation_client::TransportError,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Malformed receipt: {0}")]
    MalformedReceipt(#[from] DecodeError),

    #[error("Receipt validation failed: {0}")]
    ReceiptRejected(String),

    #[error("Transaction validation failed: {0}")]
    TransactionRejected(String),

    #[error("Receipt belongs to another application: {0}")]
    BundleMismatch(String),

    #[error("No valid subscription found in receipt")]
    NoSubscription,

    #[error("Unknown product ID: {0}")]
    UnknownProduct(String),

    #[error("Validation service error: {0}")]
    Upstream(#[from] TransportError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MalformedReceipt(_)
            | ApiError::ReceiptRejected(_)
            | ApiError::TransactionRejected(_)
            | ApiError::BundleMismatch(_)
            | ApiError::NoSubscription
            | ApiError::UnknownProduct(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) | ApiError::Store(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ApiError::MalformedReceipt(ref e) => {
                ErrorResponse::new("Malformed receipt data", Some(e.to_string()))
            }
            ApiError::ReceiptRejected(ref details) => {
                ErrorResponse::new("Receipt validation failed", Some(details.clone()))
            }
            ApiError::TransactionRejected(ref details) => {
                ErrorResponse::new("Transaction validation failed", Some(details.clone()))
            }
            ApiError::BundleMismatch(ref details) => {
                ErrorResponse::new("Receipt belongs to another application", Some(details.clone()))
            }
            ApiError::NoSubscription => {
                ErrorResponse::new("No valid subscription found in receipt", None)
            }
            ApiError::UnknownProduct(ref product_id) => {
                tracing::warn!(product_id = %product_id, "Product catalog is missing an entry");
                ErrorResponse::new(format!("Unknown product ID: {}", product_id), None)
            }
            ApiError::Upstream(ref e) => {
                tracing::error!("Validation service error: {:?}", e);
                ErrorResponse::new("Receipt validation service unavailable", Some(e.to_string()))
            }
            ApiError::Store(ref e) => {
                tracing::error!("Storage error: {:?}", e);
                ErrorResponse::new("Failed to save subscription", None)
            }
            ApiError::BadRequest(ref msg) => ErrorResponse::new(msg.clone(), None),
            ApiError::NotFound(ref msg) => ErrorResponse::new(msg.clone(), None),
            ApiError::Unauthorized(ref msg) => ErrorResponse::new(msg.clone(), None),
            ApiError::Internal(ref e) => {
                tracing::error!("Internal error: {:?}", e);
                ErrorResponse::new("Internal server error", None)
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ServerApiError> for ApiError {
    fn from(err: ServerApiError) -> Self {
        match err {
            ServerApiError::Transport(e) => ApiError::Upstream(e),
            other => ApiError::Internal(anyhow::Error::new(other)),
        }
    }
}

// Helper type for results
pub type Result<T> = std::result::Result<T, ApiError>;
