//! User API handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use common::model::user::{User, UserId};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::api::response::{ApiListResponse, ApiResponse};
use crate::error::ApiError;
use crate::AppState;

/// Create user request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    /// Unique username
    pub username: String,
    /// Unique email address
    pub email: String,
    /// Grant access to the admin endpoints
    #[serde(default)]
    pub is_admin: bool,
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid email, empty username, or duplicate user"),
        (status = 500, description = "Internal server error")
    ),
    tag = "user"
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, ApiResponse<User>), ApiError> {
    let Json(request) = payload?;
    let user = state
        .user_service
        .create_user(&request.username, &request.email, request.is_admin)?;

    Ok((StatusCode::CREATED, ApiResponse::new(user)))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(
        ("id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, description = "User not found")
    ),
    tag = "user"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<UserId>,
) -> Result<ApiResponse<User>, ApiError> {
    Ok(ApiResponse::new(state.user_service.get_user(id)?))
}

/// List every user
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All users ordered by id", body = [User])
    ),
    tag = "admin"
)]
pub async fn list_users(State(state): State<Arc<AppState>>) -> ApiListResponse<User> {
    ApiListResponse::new(state.user_service.get_all_users())
}
