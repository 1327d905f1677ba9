//! Cart types.
//!
//! A cart is not a table: it is the set of a user's `cart_items` rows that
//! have not yet expired, each joined with a product summary.

use chrono::{DateTime, Utc};
use serde::Serialize;

use toko_core::{CartItemId, Price, ProductId, Slug, UserId};

/// A stored cart item without its product join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    /// Whether the item's expiry has passed at `now`.
    ///
    /// An item expiring exactly at `now` is still active.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Category reference nested inside a cart product (`{"name": ...}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryName {
    pub name: String,
}

/// Product summary shown on each cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartProduct {
    pub id: ProductId,
    pub slug: Slug,
    pub name: String,
    pub image: String,
    pub price: Price,
    pub category: CategoryName,
}

/// A cart item joined with its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub product: CartProduct,
}

impl CartLine {
    /// `price * quantity` for this line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// A user's cart as of one expiry sweep.
#[derive(Debug, Clone, Serialize)]
pub struct Cart {
    /// Remaining items in insertion order.
    pub items: Vec<CartLine>,
    /// The instant the sweep ran; no item expires before it.
    pub as_of: DateTime<Utc>,
}

/// A cart item together with the current stock of its product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockedItem {
    pub item: CartItem,
    pub stock: i32,
}

/// Insert parameters for a new cart item.
#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub expires_at: DateTime<Utc>,
}
