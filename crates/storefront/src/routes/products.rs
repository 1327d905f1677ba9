//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::models::{Page, ProductFilter, ProductWithCategory};
use crate::routes::total_count;
use crate::state::AppState;

/// Shared caches may serve the latest products briefly stale.
pub const LATEST_CACHE_CONTROL: &str = "public, s-maxage=10, stale-while-revalidate=59";

/// Product listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
}

/// List products with optional name search and category filter.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<impl IntoResponse> {
    let filter = ProductFilter::new(query.search, query.category);
    let page = Page::new(query.page, query.limit);

    let listing = state.catalog().list_products(&filter, page).await?;
    Ok((total_count(listing.total), Json(listing)))
}

/// The newest products for the home page.
#[instrument(skip(state))]
pub async fn latest(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let products = state.catalog().latest_products().await?;
    Ok((
        [(header::CACHE_CONTROL, LATEST_CACHE_CONTROL)],
        Json(products.as_ref().clone()),
    ))
}

/// Product detail by slug.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductWithCategory>> {
    Ok(Json(state.catalog().product_by_slug(&slug).await?))
}
