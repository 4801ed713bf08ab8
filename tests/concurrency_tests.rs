//! Cross-crate concurrency properties of the ledger core

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use ledger::account_service::AccountService;
use ledger::common::decimal::{dec, Amount};
use ledger::common::error::Error;
use ledger::common::model::account::AccountType;

fn total(service: &AccountService) -> Amount {
    service.get_all_accounts().iter().map(|a| a.balance()).sum()
}

#[test]
fn test_transfers_conserve_total() {
    let service = AccountService::new();
    for user in 0..10 {
        service.create_account(user, dec!(1000.00), AccountType::Savings).unwrap();
    }

    thread::scope(|s| {
        for worker in 0..8u64 {
            let service = &service;
            s.spawn(move || {
                for step in 0..500u64 {
                    let from = (worker * 7 + step) % 10 + 1;
                    let to = (worker * 3 + step * 11 + 1) % 10 + 1;
                    let amount = Amount::from(step % 50 + 1) / dec!(4);
                    match service.transfer_amount(from, to, amount) {
                        Ok(())
                        | Err(Error::InsufficientFunds(_))
                        | Err(Error::LockContention(_))
                        | Err(Error::ValidationError(_)) => {}
                        Err(other) => panic!("unexpected error: {}", other),
                    }
                }
            });
        }
    });

    assert_eq!(total(&service), dec!(10000.00));
    assert!(service.get_all_accounts().iter().all(|a| a.balance() >= Amount::ZERO));
    assert!(service.get_all_accounts().iter().all(|a| !a.is_locked_for_transfer()));
}

#[test]
fn test_opposing_transfers_never_deadlock() {
    let service = Arc::new(AccountService::new());
    service.create_account(1, dec!(500), AccountType::Checking).unwrap();
    service.create_account(2, dec!(500), AccountType::Checking).unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    for (from, to) in [(1, 2), (2, 1)] {
        let service = Arc::clone(&service);
        let done_tx = done_tx.clone();
        thread::spawn(move || {
            for _ in 0..5000 {
                let _ = service.transfer_amount(from, to, dec!(1));
            }
            let _ = done_tx.send(());
        });
    }

    for _ in 0..2 {
        done_rx
            .recv_timeout(Duration::from_secs(60))
            .expect("opposing transfers did not finish");
    }
    assert_eq!(total(&service), dec!(1000));
}

#[test]
fn test_concurrent_creation_assigns_unique_ids() {
    let service = AccountService::new();

    let ids: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|user| {
                let service = &service;
                s.spawn(move || {
                    (0..100)
                        .map(|_| {
                            service
                                .create_account(user, Amount::ZERO, AccountType::Savings)
                                .unwrap()
                                .id()
                                .unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
    });

    let unique: HashSet<u64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 800);
    assert_eq!(unique.iter().min(), Some(&1));
    assert_eq!(unique.iter().max(), Some(&800));

    let numbers: HashSet<String> = service
        .get_all_accounts()
        .iter()
        .filter_map(|a| a.account_number().map(str::to_string))
        .collect();
    assert_eq!(numbers.len(), 800);
}

#[test]
fn test_mixed_operations_balance_the_books() {
    let service = AccountService::new();
    for user in 0..4 {
        service.create_account(user, dec!(100), AccountType::Savings).unwrap();
    }
    let initial = total(&service);
    let deposits = AtomicUsize::new(0);
    let withdrawals = AtomicUsize::new(0);

    thread::scope(|s| {
        for worker in 0..12u64 {
            let (service, deposits, withdrawals) = (&service, &deposits, &withdrawals);
            s.spawn(move || {
                for step in 0..300u64 {
                    let id = (worker + step) % 4 + 1;
                    match step % 3 {
                        0 => {
                            service.deposit(id, dec!(2)).unwrap();
                            deposits.fetch_add(1, Ordering::Relaxed);
                        }
                        1 => {
                            if service.withdraw(id, dec!(3)).is_ok() {
                                withdrawals.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                        _ => {
                            let _ = service.transfer_amount(id, id % 4 + 1, dec!(5));
                        }
                    }
                }
            });
        }
    });

    let deposited = Amount::from(deposits.load(Ordering::Relaxed) as u64) * dec!(2);
    let withdrawn = Amount::from(withdrawals.load(Ordering::Relaxed) as u64) * dec!(3);
    assert_eq!(total(&service), initial + deposited - withdrawn);
    assert!(service.get_all_accounts().iter().all(|a| a.balance() >= Amount::ZERO));
}
