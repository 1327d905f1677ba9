//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create an admin account
//! toko-cli users create -e admin@toko.test -n "Admin" -p 'long password' -r ADMIN
//!
//! # Promote an existing account
//! toko-cli users promote -e someone@toko.test
//! ```

use toko_core::{Email, Role, UserId};
use toko_storefront::db::UserRepository;
use toko_storefront::services::{AuthError, AuthService};

use super::{CommandError, connect};

/// Parse a role name as stored in the database.
fn parse_role(role: &str) -> Result<Role, CommandError> {
    role.parse()
        .map_err(|_| CommandError::InvalidRole(role.to_owned()))
}

/// Create a user with a password.
///
/// # Errors
///
/// Returns an error for an invalid role, email or password, or if the
/// email is already registered.
pub async fn create(
    email: &str,
    name: &str,
    password: &str,
    role: &str,
) -> Result<UserId, CommandError> {
    let role = parse_role(role)?;
    let pool = connect().await?;

    tracing::info!("Creating user: {} ({})", email, role);
    let user = AuthService::new(&pool)
        .register(name, email, password, role)
        .await?;

    tracing::info!("User created successfully! ID: {}", user.id);
    Ok(user.id)
}

/// Change the role of an existing user.
///
/// # Errors
///
/// Returns an error for an invalid role or email, or if no user has it.
pub async fn promote(email: &str, role: &str) -> Result<(), CommandError> {
    let role = parse_role(role)?;
    let email = Email::parse(email).map_err(AuthError::from)?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool).set_role(&email, role).await?;
    tracing::info!("{} is now {}", user.email, user.role);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("ADMIN").ok(), Some(Role::Admin));
        assert!(matches!(
            parse_role("owner"),
            Err(CommandError::InvalidRole(r)) if r == "owner"
        ));
    }
}
