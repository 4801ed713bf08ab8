//! Error handling for the API gateway

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::error::Error;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Message returned for every 5xx; the underlying error is only logged
const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error information
    pub error: ErrorInfo,
    /// Request ID for tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Detailed error information
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorInfo {
    /// Error code (string identifier for the error type)
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

/// API errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Malformed JSON body")]
    InvalidBody(#[from] JsonRejection),

    #[error(transparent)]
    Common(#[from] Error),
}

impl ApiError {
    /// Whether the failure lies with the server rather than the request
    fn is_server_error(&self) -> bool {
        match self {
            ApiError::Common(e) => !e.is_client_error(),
            ApiError::BadRequest(_) | ApiError::InvalidBody(_) => false,
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::InvalidBody(_) => (StatusCode::BAD_REQUEST, "invalid_body"),
            ApiError::Common(e) => match e {
                // Client errors (4xx)
                Error::AccountNotFound(_) => (StatusCode::NOT_FOUND, "account_not_found"),
                Error::UserNotFound(_) => (StatusCode::NOT_FOUND, "user_not_found"),
                Error::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                Error::InsufficientFunds(_) => (StatusCode::BAD_REQUEST, "insufficient_funds"),
                Error::LockContention(_) => (StatusCode::BAD_REQUEST, "lock_contention"),
                Error::DecimalError(_) => (StatusCode::BAD_REQUEST, "amount_out_of_range"),

                // Server errors (5xx)
                Error::ConfigurationError(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
                }
                Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
                Error::Serialization(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "serialization_error")
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Generate a request ID for tracking errors
        let request_id = Uuid::new_v4().to_string();
        let (status, code) = self.status_and_code();

        let (message, details) = if self.is_server_error() {
            tracing::error!("API Error [{}]: {:?}", request_id, &self);
            (INTERNAL_ERROR_MESSAGE.to_string(), None)
        } else {
            tracing::debug!("API Error [{}]: {}", request_id, &self);
            let details = match &self {
                ApiError::InvalidBody(rejection) => {
                    Some(serde_json::Value::String(rejection.body_text()))
                }
                _ => None,
            };
            (self.to_string(), details)
        };

        let error_response = ErrorResponse {
            error: ErrorInfo {
                code: code.to_string(),
                message,
                details,
            },
            request_id: Some(request_id),
        };

        (status, Json(error_response)).into_response()
    }
}
