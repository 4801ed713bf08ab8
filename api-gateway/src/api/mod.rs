//! API handlers
//!
//! Each handler extracts state and parameters with axum extractors, calls the
//! synchronous services directly, and maps the result into the shared
//! response envelopes. Failures become [`crate::error::ApiError`].

pub mod account;
pub mod health;
pub mod response;
pub mod user;

pub use response::{ApiListResponse, ApiResponse, TransactionResponse};
