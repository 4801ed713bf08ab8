//! HTTP surface of the ledger
//!
//! The services are synchronous and thread-safe, so handlers call them
//! directly from the tokio worker threads.

pub mod api;
pub mod config;
pub mod error;

use std::sync::Arc;

use account_service::AccountService;
use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use user_service::UserService;
use utoipa::OpenApi;

use crate::api::{account, health, user};

/// App state shared across handlers
pub struct AppState {
    /// Account service
    pub account_service: Arc<AccountService>,
    /// User service
    pub user_service: Arc<UserService>,
}

impl AppState {
    /// Bundle the services handed to every handler
    pub fn new(account_service: Arc<AccountService>, user_service: Arc<UserService>) -> Self {
        Self {
            account_service,
            user_service,
        }
    }
}

/// API documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::ping,
        // User routes
        user::create_user,
        user::get_user,
        user::list_users,
        // Account routes
        account::create_account,
        account::list_user_accounts,
        account::get_account,
        account::get_account_by_number,
        account::delete_account,
        account::list_accounts,
        account::deposit,
        account::withdraw,
        account::transfer,
    ),
    components(
        schemas(
            user::CreateUserRequest,
            account::CreateAccountRequest,
            account::AmountRequest,
            account::TransferRequest,
            api::response::TransactionResponse,
            api::response::ResponseMetadata,
            error::ErrorResponse,
            error::ErrorInfo,
            common::model::user::User,
            common::model::account::AccountSnapshot,
            common::model::account::AccountType,
        )
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "user", description = "User registration and lookup"),
        (name = "account", description = "Accounts, balances and transfers"),
        (name = "admin", description = "Unfiltered listings")
    ),
    info(
        title = "Ledger API",
        version = "1.0.0",
        description = "In-memory ledger with concurrent deposits, withdrawals and deadlock-free transfers"
    )
)]
pub struct ApiDoc;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ping", get(health::ping))
        // User routes
        .route("/users", post(user::create_user))
        .route("/users/:id", get(user::get_user))
        .route("/admin/users", get(user::list_users))
        // Account routes
        .route(
            "/accounts",
            post(account::create_account).get(account::list_user_accounts),
        )
        .route(
            "/accounts/:id",
            get(account::get_account).delete(account::delete_account),
        )
        .route("/accounts/number/:number", get(account::get_account_by_number))
        .route("/accounts/:id/deposit", post(account::deposit))
        .route("/accounts/:id/withdraw", post(account::withdraw))
        .route("/accounts/:id/transfer", post(account::transfer))
        .route("/admin/accounts", get(account::list_accounts))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
