//! Admin route handlers.
//!
//! Every handler takes [`RequireAdmin`], so non-admins get 403 before any
//! body is read.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use toko_core::{CarouselId, CategoryId, ProductId};

use crate::db::UserRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{Category, NewCarousel, NewProduct, Page, Product};
use crate::routes::{PageQuery, total_count};
use crate::state::AppState;

/// Category create/rename body.
#[derive(Debug, Deserialize)]
pub struct CategoryBody {
    pub name: String,
}

/// Create a product.
#[instrument(skip(state, admin, body), fields(admin = %admin.user_id, name = %body.name))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<NewProduct>,
) -> Result<impl IntoResponse> {
    let product = state.catalog().create_product(&body).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product's fields.
#[instrument(skip(state, admin, body), fields(admin = %admin.user_id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(body): Json<NewProduct>,
) -> Result<Json<Product>> {
    Ok(Json(state.catalog().update_product(id, &body).await?))
}

/// Create a category.
#[instrument(skip(state, admin, body), fields(admin = %admin.user_id))]
pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CategoryBody>,
) -> Result<impl IntoResponse> {
    let category = state.catalog().create_category(&body.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Rename a category.
#[instrument(skip(state, admin, body), fields(admin = %admin.user_id))]
pub async fn rename_category(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(body): Json<CategoryBody>,
) -> Result<Json<Category>> {
    Ok(Json(state.catalog().rename_category(id, &body.name).await?))
}

/// List a page of users.
#[instrument(skip(state, admin), fields(admin = %admin.user_id))]
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool());
    let page = Page::from(query);
    let total = users.count().await?;
    let list = users.list(page).await?;
    Ok((total_count(total), Json(list)))
}

/// List a page of carousel slides.
#[instrument(skip(state, admin), fields(admin = %admin.user_id))]
pub async fn list_carousels(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let listing = state.catalog().list_carousels(query.into()).await?;
    Ok((total_count(listing.total), Json(listing.carousels)))
}

/// Create a carousel slide.
#[instrument(skip(state, admin, body), fields(admin = %admin.user_id))]
pub async fn create_carousel(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<NewCarousel>,
) -> Result<impl IntoResponse> {
    let carousel = state.catalog().create_carousel(&body).await?;
    Ok((StatusCode::CREATED, Json(carousel)))
}

/// Delete a carousel slide.
#[instrument(skip(state, admin), fields(admin = %admin.user_id))]
pub async fn delete_carousel(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CarouselId>,
) -> Result<StatusCode> {
    state.catalog().delete_carousel(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
