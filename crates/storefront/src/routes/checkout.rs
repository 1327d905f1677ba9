//! Checkout handler.
//!
//! Checkout does not create orders. It snapshots the caller's swept cart,
//! checks the client's figures against it, and mails a summary. A failed
//! send is reported in the response but never fails the request.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use toko_core::Price;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::{AuthService, CheckoutError, CheckoutSnapshot};
use crate::state::AppState;

/// Checkout request body.
#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    pub discount: Price,
    pub shipping_fee: Price,
    pub total: Price,
}

/// Checkout response.
#[derive(Debug, Serialize)]
pub struct CheckoutReceipt {
    pub email_sent: bool,
    pub total: Price,
    pub items: usize,
}

/// Verify the caller's totals and send the checkout email.
#[instrument(skip(state, caller), fields(caller = %caller.user_id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(body): Json<CheckoutBody>,
) -> Result<Json<CheckoutReceipt>> {
    let cart = state.cart().get_cart(&caller, caller.user_id).await?;
    let snapshot =
        CheckoutSnapshot::from_cart(&cart.items, body.discount, body.shipping_fee, body.total);
    snapshot.verify()?;

    let email_sent = match state.notifier() {
        Some(notifier) => {
            let user = AuthService::new(state.pool())
                .get_user(caller.user_id)
                .await?;
            match notifier.send_checkout_email(&user.email, &snapshot).await {
                Ok(()) => true,
                // Already logged by the notifier
                Err(CheckoutError::SendFailed) => false,
                Err(e) => return Err(e.into()),
            }
        }
        None => {
            tracing::debug!("Checkout email disabled");
            false
        }
    };

    Ok(Json(CheckoutReceipt {
        email_sent,
        total: snapshot.total,
        items: snapshot.items.len(),
    }))
}
