//! HTTP route handlers for the storefront JSON API.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog
//! GET    /api/products                  - Product listing (page, limit, search, category)
//! GET    /api/products/latest           - Newest products (CDN-cacheable)
//! GET    /api/products/{slug}           - Product detail
//! GET    /api/categories                - Category listing
//! GET    /api/carousels                 - Home-page carousel slides
//!
//! # Cart (requires auth)
//! GET    /api/cart/{user_id}            - Swept cart items
//! GET    /api/cart/{user_id}/totals     - Total quantity and price
//! POST   /api/cart                      - Add item
//! PUT    /api/cart/{item_id}            - Set quantity (0 removes)
//! DELETE /api/cart/{item_id}            - Remove item
//! POST   /api/checkout                  - Verify totals, send checkout email
//!
//! # Reviews
//! GET    /api/reviews/product/{id}      - Reviews of a product
//! GET    /api/reviews/mine              - Caller's reviews (auth)
//! POST   /api/reviews                   - Post review (auth)
//! DELETE /api/reviews/{id}              - Delete review (auth)
//!
//! # Auth
//! POST   /api/auth/register             - Self-registration (guests only)
//! POST   /api/auth/login                - Password login
//! POST   /api/auth/logout               - Logout
//! GET    /api/auth/me                   - Current session identity
//!
//! # Accounts and admin
//! PUT    /api/user/{id}                 - Update account (self or admin)
//! POST   /api/admin/products            - Create product (admin)
//! PUT    /api/admin/products/{id}       - Replace product (admin)
//! POST   /api/admin/categories          - Create category (admin)
//! PATCH  /api/admin/categories/{id}     - Rename category (admin)
//! GET    /api/admin/users               - User listing (admin)
//! GET    /api/admin/carousels           - Carousel listing (admin)
//! POST   /api/admin/carousels           - Create carousel slide (admin)
//! DELETE /api/admin/carousels/{id}      - Delete carousel slide (admin)
//! ```

pub mod admin;
pub mod auth;
pub mod carousels;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod products;
pub mod reviews;
pub mod users;

use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, patch, post, put},
};
use serde::Deserialize;

use crate::models::Page;
use crate::state::AppState;

/// Header carrying the number of matching rows for paginated listings.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// `page` / `limit` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl From<PageQuery> for Page {
    fn from(query: PageQuery) -> Self {
        Self::new(query.page, query.limit)
    }
}

/// `X-Total-Count` response header.
pub fn total_count(total: u64) -> [(&'static str, HeaderValue); 1] {
    [(TOTAL_COUNT_HEADER, HeaderValue::from(total))]
}

/// Create the catalog routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/latest", get(products::latest))
        .route("/{slug}", get(products::show))
}

/// Create the cart routes router.
///
/// `{id}` is a user ID for reads and a cart item ID for writes.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(cart::add))
        .route(
            "/{id}",
            get(cart::show).put(cart::update).delete(cart::remove),
        )
        .route("/{id}/totals", get(cart::totals))
}

/// Create the review routes router.
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(reviews::create))
        .route("/mine", get(reviews::mine))
        .route("/product/{product_id}", get(reviews::for_product))
        .route("/{id}", delete(reviews::remove))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(admin::create_product))
        .route("/products/{id}", put(admin::update_product))
        .route("/categories", post(admin::create_category))
        .route("/categories/{id}", patch(admin::rename_category))
        .route("/users", get(admin::list_users))
        .route(
            "/carousels",
            get(admin::list_carousels).post(admin::create_carousel),
        )
        .route("/carousels/{id}", delete(admin::delete_carousel))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/products", product_routes())
        .route("/api/categories", get(categories::index))
        .route("/api/carousels", get(carousels::index))
        .nest("/api/cart", cart_routes())
        .route("/api/checkout", post(checkout::checkout))
        .nest("/api/reviews", review_routes())
        .nest("/api/auth", auth_routes())
        .route("/api/user/{id}", put(users::update))
        .nest("/api/admin", admin_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_conversion() {
        let page = Page::from(PageQuery {
            page: Some(2),
            limit: None,
        });
        assert_eq!(page.offset(), 10);
    }

    #[test]
    fn test_total_count_header() {
        let [(name, value)] = total_count(42);
        assert_eq!(name, "x-total-count");
        assert_eq!(value, "42");
    }
}
