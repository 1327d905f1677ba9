//! Cart route handlers.
//!
//! All handlers require a logged-in caller; the cart engine enforces that
//! callers only see and change their own items.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use toko_core::{CartItemId, ProductId, UserId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{CartItem, CartLine};
use crate::services::CartTotals;
use crate::state::AppState;

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItem {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Quantity update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantity {
    pub quantity: i32,
}

/// Quantity update response.
#[derive(Debug, Serialize)]
pub struct QuantityUpdated {
    /// The updated item, or `None` when the update removed it.
    pub item: Option<CartItem>,
    pub removed: bool,
}

/// List a user's cart after sweeping expired items.
#[instrument(skip(state, caller))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<CartLine>>> {
    let cart = state.cart().get_cart(&caller, user_id).await?;
    Ok(Json(cart.items))
}

/// Total quantity and price of a user's cart.
#[instrument(skip(state, caller))]
pub async fn totals(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<UserId>,
) -> Result<Json<CartTotals>> {
    Ok(Json(state.cart().totals(&caller, user_id).await?))
}

/// Add a product to the caller's cart.
#[instrument(skip(state, caller))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(body): Json<AddItem>,
) -> Result<impl IntoResponse> {
    let item = state
        .cart()
        .add_item(&caller, body.product_id, body.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Set the quantity of one of the caller's items.
#[instrument(skip(state, caller))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(item_id): Path<CartItemId>,
    Json(body): Json<UpdateQuantity>,
) -> Result<Json<QuantityUpdated>> {
    let item = state
        .cart()
        .update_quantity(&caller, item_id, body.quantity)
        .await?;
    Ok(Json(QuantityUpdated {
        removed: item.is_none(),
        item,
    }))
}

/// Remove one of the caller's items.
#[instrument(skip(state, caller))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(item_id): Path<CartItemId>,
) -> Result<StatusCode> {
    state.cart().delete_item(&caller, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
