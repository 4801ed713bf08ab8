//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// User identifier
pub type UserId = u64;

/// User model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User ID, absent until the user is saved
    pub id: Option<UserId>,
    /// Unique username
    pub username: String,
    /// Unique email address
    pub email: String,
    /// Whether the user may use admin endpoints
    pub is_admin: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create an unsaved user
    pub fn new(username: impl Into<String>, email: impl Into<String>, is_admin: bool) -> Self {
        Self {
            id: None,
            username: username.into(),
            email: email.into(),
            is_admin,
            created_at: Utc::now(),
        }
    }
}
