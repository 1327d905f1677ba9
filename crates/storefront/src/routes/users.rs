//! Account update handler.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use toko_core::UserId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{User, UserUpdate};
use crate::services::AuthService;
use crate::state::AppState;

/// Update an account. Users may update themselves; admins anyone.
#[instrument(skip(state, caller, body), fields(caller = %caller.user_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<UserId>,
    Json(body): Json<UserUpdate>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .update_user(&caller, id, &body)
        .await?;
    tracing::info!(user_id = %user.id, "Account updated");
    Ok(Json(user))
}
