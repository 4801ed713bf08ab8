//! Account model and its balance mutation primitives
//!
//! The balance lives in an [`AtomicCell`] and is only ever changed through
//! compare-and-swap retry loops, so single-account deposits and withdrawals
//! never take a lock. Each account also carries an exclusive transfer lock
//! which is taken only by multi-account transfers.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use crossbeam::atomic::AtomicCell;
use crossbeam::utils::Backoff;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::decimal::Amount;
use crate::error::{Error, Result};
use crate::model::user::UserId;
#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// Server-assigned account identifier
pub type AccountId = u64;

/// Prefix of every generated account number
pub const ACCOUNT_NUMBER_PREFIX: &str = "ACC";

/// Derive the account number for an id, e.g. `ACC000042`
pub fn format_account_number(id: AccountId) -> String {
    format!("{}{:06}", ACCOUNT_NUMBER_PREFIX, id)
}

/// Account type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    /// Savings account
    Savings,
    /// Checking account
    Checking,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Savings => write!(f, "SAVINGS"),
            AccountType::Checking => write!(f, "CHECKING"),
        }
    }
}

impl FromStr for AccountType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SAVINGS" => Ok(AccountType::Savings),
            "CHECKING" => Ok(AccountType::Checking),
            other => Err(Error::ValidationError(format!("Unknown account type: {}", other))),
        }
    }
}

/// Id and account number, set together exactly once
#[derive(Debug)]
struct Identity {
    id: AccountId,
    account_number: String,
}

/// Account entity
///
/// Shared between threads behind an `Arc`; every mutation happens in place
/// through `&self`.
#[derive(Debug)]
pub struct Account {
    identity: OnceLock<Identity>,
    user_id: UserId,
    balance: AtomicCell<Amount>,
    account_type: AccountType,
    created_at: DateTime<Utc>,
    updated_at: AtomicCell<DateTime<Utc>>,
    transfer_lock: Mutex<()>,
}

impl Account {
    /// Create an unsaved account; the repository assigns its id on first save
    pub fn new(user_id: UserId, initial_balance: Amount, account_type: AccountType) -> Self {
        let now = Utc::now();
        Self {
            identity: OnceLock::new(),
            user_id,
            balance: AtomicCell::new(initial_balance),
            account_type,
            created_at: now,
            updated_at: AtomicCell::new(now),
            transfer_lock: Mutex::new(()),
        }
    }

    /// Account id, absent until the account has been saved
    pub fn id(&self) -> Option<AccountId> {
        self.identity.get().map(|identity| identity.id)
    }

    /// Account number, derived from the id when it is assigned
    pub fn account_number(&self) -> Option<&str> {
        self.identity.get().map(|identity| identity.account_number.as_str())
    }

    /// Assign the id if none is set yet and return the effective id.
    ///
    /// `next_id` runs at most once over the lifetime of the account, so
    /// concurrent saves of the same unsaved account never burn two ids.
    pub fn assign_id<F>(&self, next_id: F) -> AccountId
    where
        F: FnOnce() -> AccountId,
    {
        self.identity
            .get_or_init(|| {
                let id = next_id();
                Identity {
                    id,
                    account_number: format_account_number(id),
                }
            })
            .id
    }

    /// Owning user
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Account type
    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    /// Current balance
    pub fn balance(&self) -> Amount {
        self.balance.load()
    }

    /// Creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last time the account was saved
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at.load()
    }

    /// Refresh the update timestamp
    pub fn touch(&self) {
        self.updated_at.store(Utc::now());
    }

    /// Deposit `amount`. The caller rejects negative amounts.
    ///
    /// Retries the compare-and-swap until it wins, so concurrent deposits are
    /// each applied exactly once. Fails with [`Error::DecimalError`], leaving
    /// the balance untouched, when the result would exceed the decimal range.
    pub fn add(&self, amount: Amount) -> Result<()> {
        let backoff = Backoff::new();
        loop {
            let current = self.balance.load();
            let updated = current
                .checked_add(amount)
                .ok_or(rust_decimal::Error::ExceedsMaximumPossibleValue)?;
            if self.balance.compare_exchange(current, updated).is_ok() {
                return Ok(());
            }
            trace!(account_id = ?self.id(), "deposit lost CAS race, retrying");
            backoff.snooze();
        }
    }

    /// Withdraw `amount` if the balance covers it.
    ///
    /// Returns `false` without touching the balance when the result would be
    /// negative. The caller rejects negative amounts.
    pub fn withdraw(&self, amount: Amount) -> bool {
        let backoff = Backoff::new();
        loop {
            let current = self.balance.load();
            let updated = match current.checked_sub(amount) {
                Some(updated) if updated >= Amount::ZERO => updated,
                _ => return false,
            };
            if self.balance.compare_exchange(current, updated).is_ok() {
                return true;
            }
            trace!(account_id = ?self.id(), "withdrawal lost CAS race, retrying");
            backoff.snooze();
        }
    }

    /// Take the transfer lock, blocking until it is free
    pub fn lock_for_transfer(&self) -> TransferGuard<'_> {
        TransferGuard {
            account_id: self.id(),
            _guard: self.transfer_lock.lock(),
        }
    }

    /// Take the transfer lock if it is free right now
    pub fn try_lock_for_transfer(&self) -> Option<TransferGuard<'_>> {
        self.transfer_lock.try_lock().map(|guard| TransferGuard {
            account_id: self.id(),
            _guard: guard,
        })
    }

    /// Whether a transfer currently holds this account's lock
    pub fn is_locked_for_transfer(&self) -> bool {
        self.transfer_lock.is_locked()
    }

    /// Point-in-time serializable view of the account
    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id(),
            user_id: self.user_id,
            account_number: self.account_number().map(str::to_string),
            balance: self.balance(),
            account_type: self.account_type,
            created_at: self.created_at,
            updated_at: self.updated_at(),
        }
    }
}

/// Held transfer lock of one account; dropping it releases the lock
#[derive(Debug)]
#[must_use = "the transfer lock is released as soon as the guard is dropped"]
pub struct TransferGuard<'a> {
    account_id: Option<AccountId>,
    _guard: MutexGuard<'a, ()>,
}

impl TransferGuard<'_> {
    /// Id of the locked account
    pub fn account_id(&self) -> Option<AccountId> {
        self.account_id
    }
}

/// Account snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    /// Account ID
    pub id: Option<AccountId>,
    /// Owning user ID
    pub user_id: UserId,
    /// Account number (e.g. "ACC000001")
    pub account_number: Option<String>,
    /// Balance at the time of the snapshot
    pub balance: Amount,
    /// Account type
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountSnapshot {
    fn from(account: &Account) -> Self {
        account.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_add_and_withdraw() {
        let account = Account::new(1, dec!(100), AccountType::Savings);

        account.add(dec!(50.25)).unwrap();
        assert_eq!(account.balance(), dec!(150.25));

        assert!(account.withdraw(dec!(150.25)));
        assert_eq!(account.balance(), Amount::ZERO);
    }

    #[test]
    fn test_withdraw_refuses_overdraft_without_mutating() {
        let account = Account::new(1, dec!(50), AccountType::Checking);

        assert!(!account.withdraw(dec!(50.01)));
        assert_eq!(account.balance(), dec!(50));
        assert!(!account.is_locked_for_transfer());
    }

    #[test]
    fn test_assign_id_runs_once() {
        let account = Account::new(7, Amount::ZERO, AccountType::Savings);
        assert_eq!(account.id(), None);
        assert_eq!(account.account_number(), None);

        assert_eq!(account.assign_id(|| 42), 42);
        assert_eq!(account.assign_id(|| panic!("id generator must not run twice")), 42);
        assert_eq!(account.account_number(), Some("ACC000042"));
    }

    #[test]
    fn test_add_refuses_overflow_without_mutating() {
        let account = Account::new(1, Amount::MAX, AccountType::Savings);

        assert!(matches!(account.add(dec!(1)), Err(Error::DecimalError(_))));
        assert_eq!(account.balance(), Amount::MAX);
        account.add(Amount::ZERO).unwrap();
        assert!(account.withdraw(dec!(1)));
    }

    #[test]
    fn test_account_number_format() {
        assert_eq!(format_account_number(1), "ACC000001");
        assert_eq!(format_account_number(1234567), "ACC1234567");
    }

    #[test]
    fn test_concurrent_deposits() {
        let account = Account::new(1, Amount::ZERO, AccountType::Savings);

        thread::scope(|s| {
            for _ in 0..50 {
                s.spawn(|| {
                    for _ in 0..20 {
                        account.add(dec!(5.0)).unwrap();
                    }
                });
            }
        });

        assert_eq!(account.balance(), dec!(5000.0));
    }

    #[test]
    fn test_concurrent_withdrawals_never_overdraw() {
        let account = Account::new(1, dec!(1000), AccountType::Savings);
        let successes = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..50 {
                s.spawn(|| {
                    for _ in 0..20 {
                        if account.withdraw(dec!(5.0)) {
                            successes.fetch_add(1, Ordering::Relaxed);
                        }
                        assert!(account.balance() >= Amount::ZERO);
                    }
                });
            }
        });

        assert_eq!(successes.load(Ordering::Relaxed), 200);
        assert_eq!(account.balance(), Amount::ZERO);
    }

    #[test]
    fn test_transfer_lock_is_exclusive() {
        let account = Account::new(1, Amount::ZERO, AccountType::Savings);
        account.assign_id(|| 3);

        let guard = account.try_lock_for_transfer().expect("lock should be free");
        assert_eq!(guard.account_id(), Some(3));
        assert!(account.is_locked_for_transfer());
        assert!(account.try_lock_for_transfer().is_none());

        // Balance primitives stay lock-free while a transfer holds the lock
        account.add(dec!(1)).unwrap();
        assert!(account.withdraw(dec!(1)));

        drop(guard);
        assert!(!account.is_locked_for_transfer());
        let _guard = account.lock_for_transfer();
        assert!(account.is_locked_for_transfer());
    }

    #[test]
    fn test_account_type_parsing() {
        assert_eq!("savings".parse::<AccountType>().unwrap(), AccountType::Savings);
        assert_eq!(" CHECKING ".parse::<AccountType>().unwrap(), AccountType::Checking);
        assert!(matches!(
            "BROKERAGE".parse::<AccountType>(),
            Err(Error::ValidationError(_))
        ));
    }

    #[test]
    fn test_snapshot_serialization() {
        let account = Account::new(9, dec!(12.50), AccountType::Checking);
        account.assign_id(|| 1);

        let json = serde_json::to_value(account.snapshot()).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["userId"], 9);
        assert_eq!(json["accountNumber"], "ACC000001");
        assert_eq!(json["type"], "CHECKING");
        assert_eq!(json["balance"], "12.50");
    }
}
