use std::thread;

use common::error::Error;
use user_service::UserService;

#[test]
fn test_create_and_fetch_user() {
    let service = UserService::new();
    let user = service.create_user("alice", "alice@example.com", false).unwrap();

    assert_eq!(user.id, Some(1));
    assert!(!user.is_admin);
    assert_eq!(service.get_user(1).unwrap(), user);
    assert_eq!(service.get_user_by_username("alice").unwrap(), user);
    assert_eq!(service.get_user_by_email("alice@example.com").unwrap(), user);
    assert!(service.exists(1));
    assert!(!service.exists(2));
}

#[test]
fn test_create_user_validation() {
    let service = UserService::new();

    assert!(matches!(
        service.create_user("  ", "a@example.com", false),
        Err(Error::ValidationError(_))
    ));
    assert!(matches!(
        service.create_user("alice", "not-an-email", false),
        Err(Error::ValidationError(_))
    ));
    assert!(service.get_all_users().is_empty());
}

#[test]
fn test_duplicates_rejected() {
    let service = UserService::new();
    service.create_user("alice", "alice@example.com", false).unwrap();

    assert!(matches!(
        service.create_user("alice", "other@example.com", false),
        Err(Error::ValidationError(_))
    ));
    assert!(matches!(
        service.create_user("bob", "ALICE@example.com", false),
        Err(Error::ValidationError(_))
    ));
    assert_eq!(service.get_all_users().len(), 1);
}

#[test]
fn test_missing_user() {
    let service = UserService::new();

    assert!(matches!(service.get_user(42), Err(Error::UserNotFound(_))));
    assert!(matches!(service.get_user_by_username("ghost"), Err(Error::UserNotFound(_))));
    assert!(matches!(service.delete_user(42), Err(Error::UserNotFound(_))));
}

#[test]
fn test_delete_user() {
    let service = UserService::new();
    service.create_user("alice", "alice@example.com", true).unwrap();

    service.delete_user(1).unwrap();
    assert!(!service.exists(1));

    // Ids are not reused after deletion
    let bob = service.create_user("bob", "bob@example.com", false).unwrap();
    assert_eq!(bob.id, Some(2));
}

#[test]
fn test_concurrent_registration_of_same_username() {
    let service = UserService::new();

    let created = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = &service;
                s.spawn(move || service.create_user("racer", &format!("racer{}@example.com", i), false))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| r.is_ok())
            .count()
    });

    assert_eq!(created, 1);
    assert_eq!(service.get_all_users().len(), 1);
}
