//! Repository for account data

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use common::model::account::{Account, AccountId};
use common::model::user::UserId;
use dashmap::DashMap;
use tracing::debug;

/// Account repository trait defining the interface for account data storage
///
/// None of the operations fail: a missing account is reported as `None` and
/// the caller decides what that means.
pub trait AccountRepository: Send + Sync {
    /// Store an account, assigning the next id first if it has none.
    /// Saving an account that already has an id overwrites the stored entry.
    fn save(&self, account: Arc<Account>) -> Arc<Account>;

    /// Overwrite the stored entry for an already-saved account, touching
    /// `updated_at`. Returns `false` and stores nothing when the account has
    /// no id or its id is no longer stored.
    fn update_if_present(&self, account: &Arc<Account>) -> bool;

    /// Get an account by ID
    fn find_by_id(&self, id: AccountId) -> Option<Arc<Account>>;

    /// Get all accounts owned by a user, ordered by id
    fn find_by_user_id(&self, user_id: UserId) -> Vec<Arc<Account>>;

    /// Get an account by its account number
    fn find_by_account_number(&self, account_number: &str) -> Option<Arc<Account>>;

    /// Get every account, ordered by id
    fn get_all(&self) -> Vec<Arc<Account>>;

    /// Remove an account; ids are never handed out again
    fn delete_by_id(&self, id: AccountId);
}

/// In-memory repository for account data
pub struct InMemoryAccountRepository {
    /// Accounts by ID
    accounts: DashMap<AccountId, Arc<Account>>,
    /// Next id to hand out
    id_generator: AtomicU64,
}

impl InMemoryAccountRepository {
    /// Create a new in-memory account repository
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            id_generator: AtomicU64::new(1),
        }
    }

    /// Number of stored accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether the repository holds no accounts
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn next_id(&self) -> AccountId {
        self.id_generator.fetch_add(1, Ordering::Relaxed)
    }

    fn sorted(mut accounts: Vec<Arc<Account>>) -> Vec<Arc<Account>> {
        accounts.sort_by_key(|account| account.id());
        accounts
    }
}

impl Default for InMemoryAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountRepository for InMemoryAccountRepository {
    fn save(&self, account: Arc<Account>) -> Arc<Account> {
        let id = account.assign_id(|| self.next_id());
        account.touch();
        debug!(account_id = id, "Saving account");

        self.accounts.insert(id, Arc::clone(&account));
        account
    }

    fn update_if_present(&self, account: &Arc<Account>) -> bool {
        let Some(id) = account.id() else {
            return false;
        };
        match self.accounts.get_mut(&id) {
            Some(mut entry) => {
                account.touch();
                *entry = Arc::clone(account);
                true
            }
            None => false,
        }
    }

    fn find_by_id(&self, id: AccountId) -> Option<Arc<Account>> {
        self.accounts.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    fn find_by_user_id(&self, user_id: UserId) -> Vec<Arc<Account>> {
        let accounts = self
            .accounts
            .iter()
            .filter(|entry| entry.value().user_id() == user_id)
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        Self::sorted(accounts)
    }

    fn find_by_account_number(&self, account_number: &str) -> Option<Arc<Account>> {
        self.accounts
            .iter()
            .find(|entry| entry.value().account_number() == Some(account_number))
            .map(|entry| Arc::clone(entry.value()))
    }

    fn get_all(&self) -> Vec<Arc<Account>> {
        let accounts = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        Self::sorted(accounts)
    }

    fn delete_by_id(&self, id: AccountId) {
        if self.accounts.remove(&id).is_some() {
            debug!(account_id = id, "Deleted account");
        }
    }
}
