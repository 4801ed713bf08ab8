//! User service: registration and lookup of account owners

pub mod repository;
pub mod service;

pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::UserService;
