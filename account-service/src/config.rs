//! Configuration for the account service

use std::env;

use crate::service::RepositoryType;

/// Configuration for the account service
#[derive(Debug, Clone)]
pub struct AccountServiceConfig {
    /// Storage backend
    pub repository_type: RepositoryType,
    /// Log every completed transfer at info level
    pub transaction_logging: bool,
    /// How many extra times a transfer retries the lock phase after contention.
    /// Zero abandons the transfer on the first contended lock.
    pub transfer_lock_retries: u32,
}

impl Default for AccountServiceConfig {
    fn default() -> Self {
        Self {
            repository_type: env::var("STORAGE_TYPE")
                .map(|v| RepositoryType::from_setting(&v))
                .unwrap_or(RepositoryType::InMemory),
            transaction_logging: env::var("TRANSACTION_LOGGING")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            transfer_lock_retries: env::var("TRANSFER_LOCK_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        }
    }
}

impl AccountServiceConfig {
    /// Create a new configuration using environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create a new configuration with custom values
    pub fn new(repository_type: RepositoryType, transaction_logging: bool, transfer_lock_retries: u32) -> Self {
        Self {
            repository_type,
            transaction_logging,
            transfer_lock_retries,
        }
    }
}
