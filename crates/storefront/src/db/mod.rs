//! Database operations for the storefront `PostgreSQL` database.
//!
//! # Tables
//!
//! - `users` - Accounts, roles and argon2 password hashes
//! - `categories` / `products` - The catalog
//! - `cart_items` - Per-user cart rows with an expiry timestamp
//! - `reviews` - Product reviews
//! - `tower_sessions.session` - Session storage (managed by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p toko-cli -- migrate
//! ```
//!
//! Queries are checked at runtime (`sqlx::query_as` + `FromRow`) so the
//! workspace builds without a live database.

pub mod cart;
pub mod catalog;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod reviews;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use cart::{CartRepository, CartStore};
pub use catalog::CatalogRepository;
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryCartStore;
pub use reviews::ReviewRepository;
pub use users::{UserChanges, UserRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Translate constraint violations into domain errors.
    ///
    /// Unique violations become [`RepositoryError::Conflict`] carrying `what`,
    /// foreign-key violations become [`RepositoryError::NotFound`] (the
    /// referenced row does not exist), anything else stays a database error.
    pub(crate) fn from_constraint(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(format!("{what} already exists"));
            }
            if db_err.is_foreign_key_violation() {
                return Self::NotFound;
            }
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Convert a `COUNT(*)` result into a header-friendly `u64`.
pub(crate) fn count_to_u64(count: i64) -> Result<u64, RepositoryError> {
    u64::try_from(count)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative row count: {count}")))
}
