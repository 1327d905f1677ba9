//! Review route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use toko_core::{ProductId, ReviewId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{NewReview, ReviewWithAuthor, UserReview};
use crate::services::ReviewService;
use crate::state::AppState;

/// Reviews of a product, newest first.
#[instrument(skip(state))]
pub async fn for_product(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Vec<ReviewWithAuthor>>> {
    let reviews = ReviewService::new(state.pool())
        .for_product(product_id)
        .await?;
    Ok(Json(reviews))
}

/// The caller's reviews with a summary of each product.
#[instrument(skip(state, caller), fields(caller = %caller.user_id))]
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<Json<Vec<UserReview>>> {
    Ok(Json(ReviewService::new(state.pool()).mine(&caller).await?))
}

/// Post a review as the caller.
#[instrument(skip(state, caller, body), fields(caller = %caller.user_id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(body): Json<NewReview>,
) -> Result<impl IntoResponse> {
    let review = ReviewService::new(state.pool())
        .create(&caller, &body)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// Delete a review.
#[instrument(skip(state, caller), fields(caller = %caller.user_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<ReviewId>,
) -> Result<StatusCode> {
    ReviewService::new(state.pool()).delete(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
