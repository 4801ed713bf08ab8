//! Account API handlers
//!
//! Handles endpoints related to account management:
//! - Create, look up and delete accounts
//! - Deposit and withdraw funds
//! - Transfer funds between accounts

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use common::decimal::Amount;
use common::error::Error;
use common::model::account::{AccountId, AccountSnapshot, AccountType};
use common::model::user::UserId;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::api::response::{ApiListResponse, ApiResponse, TransactionResponse};
use crate::error::ApiError;
use crate::AppState;

/// Create account request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    /// Owning user
    pub user_id: UserId,
    /// Opening balance, zero when omitted
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "100.00")]
    pub initial_balance: Option<Amount>,
    /// `SAVINGS` or `CHECKING` (any case), savings when omitted
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
}

/// Accounts query
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsQuery {
    /// Owning user
    pub user_id: Option<UserId>,
}

/// Deposit or withdrawal request
#[derive(Debug, Deserialize, ToSchema)]
pub struct AmountRequest {
    /// Amount to move; must not be negative
    #[schema(value_type = String, example = "25.00")]
    pub amount: Amount,
}

/// Transfer request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Destination account
    pub to_account_id: AccountId,
    /// Amount to move; must be positive
    #[schema(value_type = String, example = "25.00")]
    pub amount: Amount,
}

/// Create a new account for an existing user
#[utoipa::path(
    post,
    path = "/accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = AccountSnapshot),
        (status = 400, description = "Negative balance or unknown account type"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "account"
)]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<(StatusCode, ApiResponse<AccountSnapshot>), ApiError> {
    let Json(request) = payload?;

    if !state.user_service.exists(request.user_id) {
        return Err(Error::UserNotFound(format!("User not found: {}", request.user_id)).into());
    }
    let account_type = match request.account_type.as_deref() {
        Some(value) => value.parse::<AccountType>()?,
        None => AccountType::Savings,
    };

    let account = state.account_service.create_account(
        request.user_id,
        request.initial_balance.unwrap_or(Amount::ZERO),
        account_type,
    )?;

    Ok((StatusCode::CREATED, ApiResponse::new(account.snapshot())))
}

/// List the accounts of a user
#[utoipa::path(
    get,
    path = "/accounts",
    params(
        ("userId" = u64, Query, description = "Owning user ID")
    ),
    responses(
        (status = 200, description = "Accounts of the user ordered by id", body = [AccountSnapshot]),
        (status = 400, description = "userId is missing")
    ),
    tag = "account"
)]
pub async fn list_user_accounts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccountsQuery>,
) -> Result<ApiListResponse<AccountSnapshot>, ApiError> {
    let user_id = query
        .user_id
        .ok_or_else(|| ApiError::BadRequest("userId is required".to_string()))?;

    let accounts = state.account_service.get_accounts_by_user(user_id);
    Ok(ApiListResponse::new(accounts.iter().map(|a| a.snapshot()).collect()))
}

/// Get an account by ID
#[utoipa::path(
    get,
    path = "/accounts/{id}",
    params(
        ("id" = u64, Path, description = "Account ID")
    ),
    responses(
        (status = 200, description = "Account found", body = AccountSnapshot),
        (status = 404, description = "Account not found")
    ),
    tag = "account"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AccountId>,
) -> Result<ApiResponse<AccountSnapshot>, ApiError> {
    let account = state
        .account_service
        .get_account(id)
        .ok_or_else(|| Error::AccountNotFound(format!("Account not found: {}", id)))?;

    Ok(ApiResponse::new(account.snapshot()))
}

/// Get an account by account number
#[utoipa::path(
    get,
    path = "/accounts/number/{number}",
    params(
        ("number" = String, Path, description = "Account number, e.g. ACC000001")
    ),
    responses(
        (status = 200, description = "Account found", body = AccountSnapshot),
        (status = 404, description = "Account not found")
    ),
    tag = "account"
)]
pub async fn get_account_by_number(
    State(state): State<Arc<AppState>>,
    Path(number): Path<String>,
) -> Result<ApiResponse<AccountSnapshot>, ApiError> {
    let account = state
        .account_service
        .get_account_by_number(&number)
        .ok_or_else(|| Error::AccountNotFound(format!("Account not found: {}", number)))?;

    Ok(ApiResponse::new(account.snapshot()))
}

/// Delete an account
#[utoipa::path(
    delete,
    path = "/accounts/{id}",
    params(
        ("id" = u64, Path, description = "Account ID")
    ),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 404, description = "Account not found")
    ),
    tag = "account"
)]
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AccountId>,
) -> Result<StatusCode, ApiError> {
    state.account_service.delete_account(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// List every account
#[utoipa::path(
    get,
    path = "/admin/accounts",
    responses(
        (status = 200, description = "All accounts ordered by id", body = [AccountSnapshot])
    ),
    tag = "admin"
)]
pub async fn list_accounts(State(state): State<Arc<AppState>>) -> ApiListResponse<AccountSnapshot> {
    let accounts = state.account_service.get_all_accounts();
    ApiListResponse::new(accounts.iter().map(|a| a.snapshot()).collect())
}

/// Deposit funds into an account
#[utoipa::path(
    post,
    path = "/accounts/{id}/deposit",
    params(
        ("id" = u64, Path, description = "Account ID")
    ),
    request_body = AmountRequest,
    responses(
        (status = 200, description = "Funds deposited", body = TransactionResponse),
        (status = 400, description = "Negative amount"),
        (status = 404, description = "Account not found")
    ),
    tag = "account"
)]
pub async fn deposit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AccountId>,
    payload: Result<Json<AmountRequest>, JsonRejection>,
) -> Result<ApiResponse<TransactionResponse>, ApiError> {
    let Json(request) = payload?;
    let account = state.account_service.deposit(id, request.amount)?;

    Ok(ApiResponse::new(TransactionResponse::succeeded(
        "Deposit successful",
        account.balance(),
    )))
}

/// Withdraw funds from an account
#[utoipa::path(
    post,
    path = "/accounts/{id}/withdraw",
    params(
        ("id" = u64, Path, description = "Account ID")
    ),
    request_body = AmountRequest,
    responses(
        (status = 200, description = "Funds withdrawn", body = TransactionResponse),
        (status = 400, description = "Negative amount or insufficient funds"),
        (status = 404, description = "Account not found")
    ),
    tag = "account"
)]
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AccountId>,
    payload: Result<Json<AmountRequest>, JsonRejection>,
) -> Result<ApiResponse<TransactionResponse>, ApiError> {
    let Json(request) = payload?;
    let account = state.account_service.withdraw(id, request.amount)?;

    Ok(ApiResponse::new(TransactionResponse::succeeded(
        "Withdrawal successful",
        account.balance(),
    )))
}

/// Transfer funds to another account
#[utoipa::path(
    post,
    path = "/accounts/{id}/transfer",
    params(
        ("id" = u64, Path, description = "Source account ID")
    ),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer completed; newBalance is the source balance", body = TransactionResponse),
        (status = 400, description = "Amount not positive, destination equal to source, insufficient funds, balance out of range, or lock contention"),
        (status = 404, description = "Source or destination account not found")
    ),
    tag = "account"
)]
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AccountId>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<ApiResponse<TransactionResponse>, ApiError> {
    let Json(request) = payload?;

    // Lock retries sleep between attempts, so keep them off the async workers
    let service = Arc::clone(&state.account_service);
    tokio::task::spawn_blocking(move || {
        service.transfer_amount(id, request.to_account_id, request.amount)
    })
    .await
    .map_err(|e| Error::Internal(format!("Transfer task failed: {}", e)))??;

    let balance = state
        .account_service
        .get_account(id)
        .map(|account| account.balance())
        .ok_or_else(|| Error::AccountNotFound(format!("Account not found: {}", id)))?;

    Ok(ApiResponse::new(TransactionResponse::succeeded(
        "Transfer successful",
        balance,
    )))
}
