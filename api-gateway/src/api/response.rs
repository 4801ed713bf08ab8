//! Response envelopes shared by every endpoint
//!
//! Single resources are wrapped in [`ApiResponse`], collections in
//! [`ApiListResponse`]. Balance-changing operations answer with a
//! [`TransactionResponse`] inside the envelope.

use axum::response::{IntoResponse, Response};
use axum::Json;
use common::decimal::Amount;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Wrapper for single resource responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// The response data
    pub data: T,
    /// Optional metadata about the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMetadata>,
}

/// Wrapper for collection responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiListResponse<T> {
    /// The list of items
    pub data: Vec<T>,
    /// Optional metadata about the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMetadata>,
}

/// Additional metadata about the response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// Number of items in a collection response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// Outcome of a deposit, withdrawal or transfer
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    /// Whether the operation was applied
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
    /// Balance of the debited or credited account afterwards
    #[schema(value_type = String, example = "150.00")]
    pub new_balance: Amount,
}

impl TransactionResponse {
    /// A successful transaction leaving `new_balance` on the account
    pub fn succeeded(message: impl Into<String>, new_balance: Amount) -> Self {
        Self {
            success: true,
            message: message.into(),
            new_balance,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

impl<T: Serialize> IntoResponse for ApiListResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

impl<T> ApiResponse<T> {
    /// Create a new API response with just data
    pub fn new(data: T) -> Self {
        Self { data, meta: None }
    }
}

impl<T> ApiListResponse<T> {
    /// Create a list response carrying its item count
    pub fn new(data: Vec<T>) -> Self {
        let count = data.len();
        Self {
            data,
            meta: Some(ResponseMetadata { count: Some(count) }),
        }
    }
}
