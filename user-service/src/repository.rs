//! Repository for user data

use std::sync::atomic::{AtomicU64, Ordering};

use common::model::user::{User, UserId};
use dashmap::DashMap;
use tracing::debug;

/// User repository trait defining the interface for user data storage
pub trait UserRepository: Send + Sync {
    /// Store a user, assigning the next id first if it has none
    fn save(&self, user: User) -> User;

    /// Get a user by ID
    fn find_by_id(&self, id: UserId) -> Option<User>;

    /// Get a user by username
    fn find_by_username(&self, username: &str) -> Option<User>;

    /// Get a user by email, ignoring ASCII case
    fn find_by_email(&self, email: &str) -> Option<User>;

    /// Get every user, ordered by id
    fn find_all(&self) -> Vec<User>;

    /// Remove a user, returning whether one was stored
    fn delete_by_id(&self, id: UserId) -> bool;
}

/// In-memory repository for user data
pub struct InMemoryUserRepository {
    users: DashMap<UserId, User>,
    id_generator: AtomicU64,
}

impl InMemoryUserRepository {
    /// Create a new in-memory user repository
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            id_generator: AtomicU64::new(1),
        }
    }

    fn find_first<P>(&self, predicate: P) -> Option<User>
    where
        P: Fn(&User) -> bool,
    {
        self.users
            .iter()
            .find(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl UserRepository for InMemoryUserRepository {
    fn save(&self, mut user: User) -> User {
        let id = *user
            .id
            .get_or_insert_with(|| self.id_generator.fetch_add(1, Ordering::Relaxed));
        debug!(user_id = id, username = %user.username, "Saving user");

        self.users.insert(id, user.clone());
        user
    }

    fn find_by_id(&self, id: UserId) -> Option<User> {
        self.users.get(&id).map(|entry| entry.value().clone())
    }

    fn find_by_username(&self, username: &str) -> Option<User> {
        self.find_first(|user| user.username == username)
    }

    fn find_by_email(&self, email: &str) -> Option<User> {
        self.find_first(|user| user.email.eq_ignore_ascii_case(email))
    }

    fn find_all(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.iter().map(|entry| entry.value().clone()).collect();
        users.sort_by_key(|user| user.id);
        users
    }

    fn delete_by_id(&self, id: UserId) -> bool {
        self.users.remove(&id).is_some()
    }
}
