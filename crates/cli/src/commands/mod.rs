//! CLI subcommand implementations.

pub mod carts;
pub mod migrate;
pub mod users;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use toko_storefront::db::{self, RepositoryError};
use toko_storefront::services::{AuthError, CartError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Session table setup failed.
    #[error("Session store error: {0}")]
    SessionStore(String),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: USER, ADMIN")]
    InvalidRole(String),

    /// Account operation failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Query failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Connect to the storefront database named by `STOREFRONT_DATABASE_URL`.
async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .map_err(|_| CommandError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    Ok(db::create_pool(&SecretString::from(database_url)).await?)
}
