//! Common types and utilities for the ledger
//!
//! This library contains the shared domain types used across the ledger
//! services: identifiers, the decimal amount type, the unified error
//! taxonomy, and the account and user models.

pub mod error;
pub mod model;
pub mod decimal;

/// Re-export important types
pub use error::{Error, Result, ErrorExt};
pub use decimal::*;
pub use model::account::{Account, AccountId, AccountSnapshot, AccountType, TransferGuard};
pub use model::user::{User, UserId};

// Re-export utoipa for use in model ToSchema derives
#[cfg(feature = "utoipa")]
pub use utoipa;
