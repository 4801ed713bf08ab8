//! User service implementation

use std::sync::Arc;

use common::error::{Error, Result};
use common::model::user::{User, UserId};
use parking_lot::Mutex;
use tracing::info;

use crate::repository::{InMemoryUserRepository, UserRepository};

/// User service for registering and looking up users
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    /// Serializes the uniqueness check with the insert
    registration: Mutex<()>,
}

impl Default for UserService {
    fn default() -> Self {
        Self::new()
    }
}

impl UserService {
    /// Create a new user service backed by an in-memory repository
    pub fn new() -> Self {
        Self::from_repository(Arc::new(InMemoryUserRepository::new()))
    }

    /// Create a new user service on top of an existing repository
    pub fn from_repository(repo: Arc<dyn UserRepository>) -> Self {
        Self {
            repo,
            registration: Mutex::new(()),
        }
    }

    /// Register a new user. Usernames and emails must be unique.
    pub fn create_user(&self, username: &str, email: &str, is_admin: bool) -> Result<User> {
        let username = username.trim();
        let email = email.trim();

        if username.is_empty() {
            return Err(Error::ValidationError("Username must not be empty".to_string()));
        }
        if !is_valid_email(email) {
            return Err(Error::ValidationError(format!("Invalid email address: {}", email)));
        }

        let _registration = self.registration.lock();
        if self.repo.find_by_username(username).is_some() {
            return Err(Error::ValidationError(format!(
                "Username already taken: {}",
                username
            )));
        }
        if self.repo.find_by_email(email).is_some() {
            return Err(Error::ValidationError(format!(
                "Email already registered: {}",
                email
            )));
        }

        let user = self.repo.save(User::new(username, email, is_admin));
        info!(user_id = ?user.id, username = %user.username, is_admin, "Created user");
        Ok(user)
    }

    /// Get a user by ID
    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.repo
            .find_by_id(id)
            .ok_or_else(|| Error::UserNotFound(format!("User not found: {}", id)))
    }

    /// Get a user by username
    pub fn get_user_by_username(&self, username: &str) -> Result<User> {
        self.repo
            .find_by_username(username)
            .ok_or_else(|| Error::UserNotFound(format!("User not found: {}", username)))
    }

    /// Get a user by email
    pub fn get_user_by_email(&self, email: &str) -> Result<User> {
        self.repo
            .find_by_email(email)
            .ok_or_else(|| Error::UserNotFound(format!("User not found: {}", email)))
    }

    /// Get every user, ordered by id
    pub fn get_all_users(&self) -> Vec<User> {
        self.repo.find_all()
    }

    /// Delete a user
    pub fn delete_user(&self, id: UserId) -> Result<()> {
        if !self.repo.delete_by_id(id) {
            return Err(Error::UserNotFound(format!("User not found: {}", id)));
        }
        info!(user_id = id, "Deleted user");
        Ok(())
    }

    /// Whether a user with this id exists
    pub fn exists(&self, id: UserId) -> bool {
        self.repo.find_by_id(id).is_some()
    }
}

/// A single `@` between a non-empty local part of `[A-Za-z0-9+_.-]` and a
/// non-empty domain of `[A-Za-z0-9.-]`.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '_' | '.' | '-'))
        && domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("a.b+c_d-e@example-mail.co.uk"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("user name@example.com"));
        assert!(!is_valid_email("user@exa_mple.com"));
    }
}
