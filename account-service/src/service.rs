//! Account service implementation

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::decimal::Amount;
use common::error::{Error, ErrorExt, Result};
use common::model::account::{Account, AccountId, AccountType, TransferGuard};
use common::model::user::UserId;
use tracing::{debug, error, info, warn};

use crate::config::AccountServiceConfig;
use crate::repository::{AccountRepository, InMemoryAccountRepository};

/// Base delay between lock-phase retries when retries are enabled
const TRANSFER_RETRY_BASE_DELAY: Duration = Duration::from_micros(50);

/// Account service for creating accounts and moving money between them
pub struct AccountService {
    /// Repository for account data
    repo: Arc<dyn AccountRepository>,
    /// Log every completed transfer at info level
    transaction_logging: bool,
    /// Extra attempts at the lock phase after contention
    transfer_lock_retries: u32,
}

/// Repository Type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryType {
    /// In-memory repository
    InMemory,
    /// Durable database repository (not implemented)
    Database,
}

impl RepositoryType {
    /// Parse a storage setting such as `in-memory` or `database`.
    ///
    /// Unknown values fall back to in-memory storage.
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "in-memory" | "inmemory" | "memory" => RepositoryType::InMemory,
            "database" | "db" => RepositoryType::Database,
            other => {
                warn!("Unknown storage type '{}'. Defaulting to in-memory.", other);
                RepositoryType::InMemory
            }
        }
    }
}

impl Default for AccountService {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountService {
    /// Create a new account service backed by an in-memory repository
    pub fn new() -> Self {
        Self::from_repository(Arc::new(InMemoryAccountRepository::new()))
    }

    /// Create a new account service on top of an existing repository
    pub fn from_repository(repo: Arc<dyn AccountRepository>) -> Self {
        Self {
            repo,
            transaction_logging: false,
            transfer_lock_retries: 0,
        }
    }

    /// Create a new account service with a specific repository type
    pub fn with_repository(repo_type: RepositoryType) -> Result<Self> {
        let repo = Self::build_repository(&repo_type)?;
        Ok(Self::from_repository(repo))
    }

    /// Create a new account service with a configuration
    pub fn with_config(config: &AccountServiceConfig) -> Result<Self> {
        let repo = Self::build_repository(&config.repository_type)?;

        Ok(Self {
            repo,
            transaction_logging: config.transaction_logging,
            transfer_lock_retries: config.transfer_lock_retries,
        })
    }

    /// Retry the lock phase of a contended transfer up to `retries` times
    pub fn with_transfer_lock_retries(mut self, retries: u32) -> Self {
        self.transfer_lock_retries = retries;
        self
    }

    fn build_repository(repo_type: &RepositoryType) -> Result<Arc<dyn AccountRepository>> {
        match repo_type {
            RepositoryType::InMemory => {
                info!("Using in-memory account storage");
                Ok(Arc::new(InMemoryAccountRepository::new()))
            }
            RepositoryType::Database => Err(Error::ConfigurationError(
                "Database storage is not implemented; use in-memory storage".to_string(),
            )),
        }
    }

    /// Create a new account and persist it. The returned account carries its
    /// assigned id and account number.
    pub fn create_account(
        &self,
        user_id: UserId,
        initial_balance: Amount,
        account_type: AccountType,
    ) -> Result<Arc<Account>> {
        if initial_balance < Amount::ZERO {
            return Err(Error::ValidationError(format!(
                "Initial balance must not be negative, got {}",
                initial_balance
            )));
        }

        let account = self
            .repo
            .save(Arc::new(Account::new(user_id, initial_balance, account_type)));

        info!(
            account_id = ?account.id(),
            account_number = ?account.account_number(),
            user_id,
            %account_type,
            "Created account"
        );
        Ok(account)
    }

    /// Get an account by ID
    pub fn get_account(&self, id: AccountId) -> Option<Arc<Account>> {
        self.repo.find_by_id(id)
    }

    /// Get all accounts owned by a user
    pub fn get_accounts_by_user(&self, user_id: UserId) -> Vec<Arc<Account>> {
        self.repo.find_by_user_id(user_id)
    }

    /// Get an account by account number
    pub fn get_account_by_number(&self, account_number: &str) -> Option<Arc<Account>> {
        self.repo.find_by_account_number(account_number)
    }

    /// Get every account
    pub fn get_all_accounts(&self) -> Vec<Arc<Account>> {
        self.repo.get_all()
    }

    /// Persist an account after an in-place change
    pub fn update_account(&self, account: Arc<Account>) -> Arc<Account> {
        self.repo.save(account)
    }

    /// Delete an account.
    ///
    /// Waits for any transfer holding the account's lock, so a transfer never
    /// completes against an account that is no longer stored.
    pub fn delete_account(&self, id: AccountId) -> Result<()> {
        let account = self.require_account(id)?;
        let _guard = account.lock_for_transfer();
        self.repo.delete_by_id(id);
        info!(account_id = id, "Deleted account");
        Ok(())
    }

    /// Deposit funds into an account
    pub fn deposit(&self, account_id: AccountId, amount: Amount) -> Result<Arc<Account>> {
        let account = self.require_account(account_id)?;
        Self::require_non_negative(amount, "Deposit")?;

        account
            .add(amount)
            .with_context(|| format!("Cannot deposit {} into account {}", amount, account_id))?;
        debug!(account_id, %amount, balance = %account.balance(), "Deposited");

        self.store_existing(account)
    }

    /// Withdraw funds from an account
    pub fn withdraw(&self, account_id: AccountId, amount: Amount) -> Result<Arc<Account>> {
        let account = self.require_account(account_id)?;
        Self::require_non_negative(amount, "Withdrawal")?;

        if !account.withdraw(amount) {
            return Err(Error::InsufficientFunds(format!(
                "Cannot withdraw {} from account {}: balance is {}",
                amount,
                account_id,
                account.balance()
            )));
        }
        debug!(account_id, %amount, balance = %account.balance(), "Withdrew");

        self.store_existing(account)
    }

    /// Transfer `amount` from one account to another.
    ///
    /// Both transfer locks are taken lowest id first, whatever the direction,
    /// so opposing transfers cannot deadlock. A contended lock abandons the
    /// transfer with [`Error::LockContention`] unless lock retries are
    /// configured.
    pub fn transfer_amount(&self, from_id: AccountId, to_id: AccountId, amount: Amount) -> Result<()> {
        let from = self.require_account(from_id)?;
        let to = self.require_account(to_id)?;

        if amount <= Amount::ZERO {
            return Err(Error::ValidationError(format!(
                "Transfer amount must be positive, got {}",
                amount
            )));
        }
        if from_id == to_id {
            return Err(Error::ValidationError(format!(
                "Cannot transfer from account {} to itself",
                from_id
            )));
        }

        let mut attempt = 0;
        loop {
            match self.try_transfer(&from, &to, amount) {
                Err(Error::LockContention(msg)) if attempt < self.transfer_lock_retries => {
                    attempt += 1;
                    warn!(from_id, to_id, attempt, "{}; retrying", msg);
                    thread::sleep(TRANSFER_RETRY_BASE_DELAY * 2u32.saturating_pow(attempt.min(10)));
                }
                result => return result,
            }
        }
    }

    /// One pass over the lock phase and critical section of a transfer
    fn try_transfer(&self, from: &Arc<Account>, to: &Arc<Account>, amount: Amount) -> Result<()> {
        let (from_id, to_id) = (from.id(), to.id());

        let guards = acquire_transfer_locks(&[from.as_ref(), to.as_ref()]).ok_or_else(|| {
            warn!(?from_id, ?to_id, "Transfer abandoned: account lock is held by another transfer");
            Error::LockContention(format!(
                "Accounts {:?} and {:?} are busy with another transfer",
                from_id, to_id
            ))
        })?;

        let outcome = self.move_funds(from, to, amount);
        release_transfer_locks(guards);
        outcome?;

        if self.transaction_logging {
            info!(?from_id, ?to_id, %amount, "Transfer completed");
        } else {
            debug!(?from_id, ?to_id, %amount, "Transfer completed");
        }
        Ok(())
    }

    /// Critical section of a transfer; both transfer locks are held
    fn move_funds(&self, from: &Arc<Account>, to: &Arc<Account>, amount: Amount) -> Result<()> {
        let (from_id, to_id) = (from.id(), to.id());

        // Deletion takes the transfer lock, so presence is stable from here on
        for account in [from, to] {
            if !self.is_stored(account) {
                return Err(Error::AccountNotFound(format!(
                    "Account {:?} was deleted before the transfer started",
                    account.id()
                )));
            }
        }

        if !from.withdraw(amount) {
            return Err(Error::InsufficientFunds(format!(
                "Cannot transfer {} from account {:?}: balance is {}",
                amount,
                from_id,
                from.balance()
            )));
        }

        if let Err(credit_error) = to.add(amount) {
            warn!(?from_id, ?to_id, %amount, "Credit failed, returning funds to source");
            if let Err(refund_error) = from.add(amount) {
                error!(?from_id, ?to_id, %amount, "Refund failed: {}", refund_error);
                return Err(Error::Internal(format!(
                    "Transfer of {} from {:?} to {:?} could not be reverted",
                    amount, from_id, to_id
                )));
            }
            return Err(credit_error);
        }

        self.repo.save(Arc::clone(from));
        self.repo.save(Arc::clone(to));
        Ok(())
    }

    /// Whether `account` is the instance currently stored under its id
    fn is_stored(&self, account: &Arc<Account>) -> bool {
        account
            .id()
            .and_then(|id| self.repo.find_by_id(id))
            .is_some_and(|stored| Arc::ptr_eq(&stored, account))
    }

    /// Persist an in-place change without reviving an account deleted meanwhile
    fn store_existing(&self, account: Arc<Account>) -> Result<Arc<Account>> {
        if self.repo.update_if_present(&account) {
            Ok(account)
        } else {
            Err(Error::AccountNotFound(format!(
                "Account {:?} was deleted during the operation",
                account.id()
            )))
        }
    }

    fn require_account(&self, id: AccountId) -> Result<Arc<Account>> {
        self.repo
            .find_by_id(id)
            .ok_or_else(|| Error::AccountNotFound(format!("Account not found: {}", id)))
    }

    fn require_non_negative(amount: Amount, operation: &str) -> Result<()> {
        if amount < Amount::ZERO {
            return Err(Error::ValidationError(format!(
                "{} amount must not be negative, got {}",
                operation, amount
            )));
        }
        Ok(())
    }
}

/// Try to take the transfer locks of every participant.
///
/// Participants are ordered by ascending id (the same account listed twice
/// is locked once) and locked in that order. If any lock is held elsewhere, the locks taken
/// so far are released in reverse order and `None` is returned.
pub fn acquire_transfer_locks<'a>(participants: &[&'a Account]) -> Option<Vec<TransferGuard<'a>>> {
    let mut ordered: Vec<&'a Account> = participants.to_vec();
    ordered.sort_by_key(|account| account.id());
    ordered.dedup_by(|a, b| std::ptr::eq(*a, *b));

    let mut guards = Vec::with_capacity(ordered.len());
    for account in ordered {
        match account.try_lock_for_transfer() {
            Some(guard) => guards.push(guard),
            None => {
                release_transfer_locks(guards);
                return None;
            }
        }
    }
    Some(guards)
}

/// Release transfer locks in reverse acquisition order
pub fn release_transfer_locks(mut guards: Vec<TransferGuard<'_>>) {
    while let Some(guard) = guards.pop() {
        drop(guard);
    }
}
