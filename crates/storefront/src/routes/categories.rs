//! Category listing handler.

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use tracing::instrument;

use crate::error::Result;
use crate::routes::{PageQuery, total_count};
use crate::state::AppState;

/// List a page of categories.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let listing = state.catalog().list_categories(query.into()).await?;
    Ok((total_count(listing.total), Json(listing.categories)))
}
