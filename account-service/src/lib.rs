//! Account service: identity assignment, storage, and money movement

pub mod service;
pub mod repository;
pub mod config;

pub use service::AccountService;
pub use service::RepositoryType;
pub use repository::{AccountRepository, InMemoryAccountRepository};
pub use config::AccountServiceConfig;
