//! Session-related types.
//!
//! The session is the storefront's identity provider: login writes a
//! [`CurrentUser`], and each request resolves it once into a [`Caller`] that
//! is passed explicitly into services.

use serde::{Deserialize, Serialize};

use toko_core::{Email, Role, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Access level at login time.
    pub role: Role,
}

/// The identity a request acts as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

impl Caller {
    /// Create a caller context.
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Whether this caller is acting on their own record.
    #[must_use]
    pub fn is_owner(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Require that `user_id` is the caller.
    ///
    /// Admins get no exemption here: carts are private to their owner.
    ///
    /// # Errors
    ///
    /// Returns [`NotOwner`] when the IDs differ.
    pub fn authorize_owner(&self, user_id: UserId) -> Result<(), NotOwner> {
        if self.is_owner(user_id) {
            Ok(())
        } else {
            Err(NotOwner)
        }
    }

    /// Whether this caller has the admin role.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether this caller may modify `user_id`'s account.
    #[must_use]
    pub fn can_manage(&self, user_id: UserId) -> bool {
        self.is_admin() || self.is_owner(user_id)
    }
}

/// The caller tried to act on another user's resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("caller does not own this resource")]
pub struct NotOwner;

impl From<&CurrentUser> for Caller {
    fn from(user: &CurrentUser) -> Self {
        Self::new(user.id, user.role)
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_and_admin_checks() {
        let shopper = Caller::new(UserId::new(1), Role::User);
        let admin = Caller::new(UserId::new(2), Role::Admin);

        assert!(shopper.is_owner(UserId::new(1)));
        assert!(!shopper.is_owner(UserId::new(2)));
        assert!(!shopper.can_manage(UserId::new(2)));
        assert!(admin.can_manage(UserId::new(1)));
        assert!(!admin.is_owner(UserId::new(1)));
        assert_eq!(shopper.authorize_owner(UserId::new(1)), Ok(()));
        assert_eq!(admin.authorize_owner(UserId::new(1)), Err(NotOwner));
    }
}
