//! Registration, login and logout handlers.
//!
//! Passwords are verified against the stored argon2 hash; on success the
//! session gets a fresh ID and the [`CurrentUser`] identity. Registration is
//! only open to callers without a session identity.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use toko_core::Role;

use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
use crate::models::{Caller, CurrentUser};
use crate::services::AuthService;
use crate::state::AppState;

/// Registration request body.
#[derive(Deserialize)]
pub struct RegisterBody {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for RegisterBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterBody")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Login request body.
#[derive(Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginBody")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Create a shopper account.
///
/// New accounts always get the `USER` role; admins are promoted from the CLI.
#[instrument(skip(state, guest, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    OptionalAuth(guest): OptionalAuth,
    Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse> {
    ensure_guest(guest.as_ref())?;

    let user = AuthService::new(state.pool())
        .register(&body.name, &body.email, &body.password, Role::User)
        .await?;

    add_breadcrumb("auth", "User registered", None);
    tracing::info!(user_id = %user.id, "User registered");

    Ok((StatusCode::CREATED, Json(user)))
}

fn ensure_guest(caller: Option<&Caller>) -> Result<()> {
    match caller {
        Some(caller) => {
            tracing::debug!(user_id = %caller.user_id, "Signed-in caller tried to register");
            Err(AppError::BadRequest("Already signed in".to_string()))
        }
        None => Ok(()),
    }
}

/// Log in with email and password.
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginBody>,
) -> Result<Json<CurrentUser>> {
    let user = AuthService::new(state.pool())
        .login_with_password(&body.email, &body.password)
        .await?;

    let current = CurrentUser {
        id: user.id,
        email: user.email,
        role: user.role,
    };

    set_current_user(&session, &current).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to set session");
        AppError::Internal("session write failed".to_string())
    })?;

    set_sentry_user(&current.id, Some(current.email.as_str()));
    add_breadcrumb("auth", "User logged in", None);
    tracing::info!(user_id = %current.id, "User logged in");

    Ok(Json(current))
}

/// Log out and forget the session identity.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to clear session");
        AppError::Internal("session write failed".to_string())
    })?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The identity this session resolves to.
#[instrument(skip(caller))]
pub async fn me(RequireAuth(caller): RequireAuth) -> Json<Value> {
    Json(json!({ "user_id": caller.user_id, "role": caller.role }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_for_guests_only() {
        assert!(ensure_guest(None).is_ok());

        let signed_in = Caller::new(toko_core::UserId::new(7), Role::User);
        assert!(matches!(
            ensure_guest(Some(&signed_in)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_register_body_debug_hides_password() {
        let body = RegisterBody {
            name: "Budi".to_owned(),
            email: "budi@example.com".to_owned(),
            password: "rahasia123".to_owned(),
        };
        let shown = format!("{body:?}");
        assert!(shown.contains("budi@example.com"));
        assert!(!shown.contains("rahasia123"));
    }
}
