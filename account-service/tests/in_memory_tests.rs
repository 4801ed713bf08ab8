use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use account_service::{AccountRepository, InMemoryAccountRepository};
use common::decimal::{dec, Amount};
use common::model::account::{Account, AccountType};

fn unsaved(user_id: u64, balance: Amount) -> Arc<Account> {
    Arc::new(Account::new(user_id, balance, AccountType::Savings))
}

#[test]
fn test_save_assigns_sequential_ids_and_numbers() {
    let repo = InMemoryAccountRepository::new();
    assert!(repo.is_empty());

    let first = repo.save(unsaved(1, dec!(10)));
    let second = repo.save(unsaved(1, dec!(20)));

    assert_eq!(first.id(), Some(1));
    assert_eq!(second.id(), Some(2));
    assert_eq!(first.account_number(), Some("ACC000001"));
    assert_eq!(second.account_number(), Some("ACC000002"));
    assert_eq!(repo.len(), 2);
}

#[test]
fn test_save_existing_account_overwrites_without_new_id() {
    let repo = InMemoryAccountRepository::new();
    let account = repo.save(unsaved(1, dec!(10)));
    let created_at = account.created_at();

    account.add(dec!(5)).unwrap();
    let saved = repo.save(Arc::clone(&account));

    assert_eq!(saved.id(), Some(1));
    assert_eq!(repo.len(), 1);
    assert_eq!(repo.find_by_id(1).unwrap().balance(), dec!(15));
    assert_eq!(saved.created_at(), created_at);
    assert!(saved.updated_at() >= created_at);

    // A fresh account still gets the next id
    assert_eq!(repo.save(unsaved(2, Amount::ZERO)).id(), Some(2));
}

#[test]
fn test_find_by_id_returns_shared_handle() {
    let repo = InMemoryAccountRepository::new();
    let account = repo.save(unsaved(1, dec!(100)));

    let found = repo.find_by_id(1).unwrap();
    assert!(Arc::ptr_eq(&account, &found));

    // Mutations through one handle are visible through the other
    found.withdraw(dec!(40));
    assert_eq!(account.balance(), dec!(60));

    assert!(repo.find_by_id(99).is_none());
}

#[test]
fn test_find_by_user_id() {
    let repo = InMemoryAccountRepository::new();
    repo.save(unsaved(1, dec!(1)));
    repo.save(Arc::new(Account::new(1, dec!(10), AccountType::Checking)));
    repo.save(unsaved(2, Amount::ZERO));

    let user_one: Vec<_> = repo.find_by_user_id(1).iter().map(|a| a.id()).collect();
    assert_eq!(user_one, vec![Some(1), Some(2)]);
    assert_eq!(repo.find_by_user_id(2).len(), 1);
    assert!(repo.find_by_user_id(3).is_empty());
}

#[test]
fn test_find_by_account_number() {
    let repo = InMemoryAccountRepository::new();
    repo.save(unsaved(1, dec!(1)));
    let second = repo.save(unsaved(2, dec!(2)));

    let found = repo.find_by_account_number("ACC000002").unwrap();
    assert!(Arc::ptr_eq(&found, &second));
    assert!(repo.find_by_account_number("ACC999999").is_none());
}

#[test]
fn test_get_all_is_ordered_by_id() {
    let repo = InMemoryAccountRepository::new();
    for user_id in 0..20 {
        repo.save(unsaved(user_id, Amount::ZERO));
    }

    let ids: Vec<_> = repo.get_all().iter().filter_map(|a| a.id()).collect();
    assert_eq!(ids, (1..=20).collect::<Vec<_>>());
}

#[test]
fn test_delete_never_reuses_ids() {
    let repo = InMemoryAccountRepository::new();
    repo.save(unsaved(1, Amount::ZERO));
    repo.save(unsaved(1, Amount::ZERO));

    repo.delete_by_id(2);
    assert!(repo.find_by_id(2).is_none());
    assert_eq!(repo.len(), 1);

    // Deleting a missing id is a no-op
    repo.delete_by_id(42);

    assert_eq!(repo.save(unsaved(1, Amount::ZERO)).id(), Some(3));
}

#[test]
fn test_concurrent_saves_get_distinct_ids() {
    let repo = InMemoryAccountRepository::new();

    let ids: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|user_id| {
                let repo = &repo;
                s.spawn(move || {
                    (0..50)
                        .map(|_| repo.save(unsaved(user_id, Amount::ZERO)).id().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
    });

    let unique: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 800);
    assert_eq!(repo.len(), 800);
    assert_eq!(unique.iter().max(), Some(&800));
}

#[test]
fn test_concurrent_save_of_same_unsaved_account_assigns_one_id() {
    let repo = InMemoryAccountRepository::new();
    let account = unsaved(1, Amount::ZERO);

    thread::scope(|s| {
        for _ in 0..8 {
            let account = Arc::clone(&account);
            let repo = &repo;
            s.spawn(move || repo.save(account));
        }
    });

    assert_eq!(account.id(), Some(1));
    assert_eq!(repo.len(), 1);
    assert_eq!(repo.save(unsaved(2, Amount::ZERO)).id(), Some(2));
}

#[test]
fn test_update_if_present_never_revives_deleted_accounts() {
    let repo = InMemoryAccountRepository::new();
    let account = repo.save(unsaved(1, dec!(10)));

    assert!(repo.update_if_present(&account));
    repo.delete_by_id(1);
    assert!(!repo.update_if_present(&account));
    assert!(repo.find_by_id(1).is_none());

    // Unsaved accounts are never stored and never get an id this way
    let fresh = unsaved(2, dec!(1));
    assert!(!repo.update_if_present(&fresh));
    assert_eq!(fresh.id(), None);
    assert!(repo.is_empty());
}
