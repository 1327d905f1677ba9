//! User domain types.
//!
//! The password hash never leaves the repository layer except for login,
//! so it is not part of [`User`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use toko_core::{Email, Role, UserId};

/// A storefront account.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Account update submitted by the user or an admin.
#[derive(Debug, Clone, Deserialize)]
pub struct UserUpdate {
    pub name: String,
    pub email: String,
    /// Only honored when the caller is an admin.
    pub role: Option<Role>,
    /// New plaintext password; left unchanged when absent or empty.
    pub password: Option<String>,
}
