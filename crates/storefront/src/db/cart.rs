//! Cart item storage.
//!
//! [`CartStore`] is the seam between the cart engine and `PostgreSQL`. Every
//! item-level method is scoped by `user_id` so one shopper can never read or
//! mutate another shopper's rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use toko_core::{CartItemId, Price, ProductId, Slug, UserId};

use super::RepositoryError;
use crate::models::{CartItem, CartLine, CartProduct, CategoryName, NewCartItem, StockedItem};

/// Storage operations the cart engine needs.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Atomically delete the user's items that expired before `now` and
    /// return the remainder in insertion order.
    ///
    /// Returns `None` if the user does not exist.
    async fn sweep_and_load(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<CartLine>>, RepositoryError>;

    /// Load one of the user's items with its product's current stock.
    async fn find_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<Option<StockedItem>, RepositoryError>;

    /// Find the user's unexpired item for a product, if any.
    async fn find_active_item_for_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<Option<CartItem>, RepositoryError>;

    /// Current stock of a product, or `None` if it does not exist.
    async fn product_stock(&self, product_id: ProductId) -> Result<Option<i32>, RepositoryError>;

    /// Insert a new cart item.
    async fn insert_item(&self, item: &NewCartItem) -> Result<CartItem, RepositoryError>;

    /// Set an item's quantity, guarded by the product's stock and the
    /// item's expiry.
    ///
    /// Returns `None` when no row matched: the item is gone, belongs to
    /// someone else, expired before `now`, or the product's stock is below
    /// `quantity`.
    async fn set_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<CartItem>, RepositoryError>;

    /// Delete one of the user's items. Returns whether a row was removed.
    async fn delete_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError>;

    /// Delete every item, for every user, that expired before `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

/// `PostgreSQL` implementation of [`CartStore`].
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

/// Flat row for a cart item joined with its product and category.
#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: CartItemId,
    user_id: UserId,
    product_id: ProductId,
    quantity: i32,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    slug: Slug,
    name: String,
    image: String,
    price: Price,
    category_name: String,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            quantity: row.quantity,
            expires_at: row.expires_at,
            created_at: row.created_at,
            product: CartProduct {
                id: row.product_id,
                slug: row.slug,
                name: row.name,
                image: row.image,
                price: row.price,
                category: CategoryName {
                    name: row.category_name,
                },
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct StockedItemRow {
    id: CartItemId,
    user_id: UserId,
    product_id: ProductId,
    quantity: i32,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    stock: i32,
}

impl From<StockedItemRow> for StockedItem {
    fn from(row: StockedItemRow) -> Self {
        Self {
            item: CartItem {
                id: row.id,
                user_id: row.user_id,
                product_id: row.product_id,
                quantity: row.quantity,
                expires_at: row.expires_at,
                created_at: row.created_at,
            },
            stock: row.stock,
        }
    }
}

#[async_trait]
impl CartStore for CartRepository<'_> {
    async fn sweep_and_load(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<CartLine>>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            tx.rollback().await?;
            return Ok(None);
        }

        let swept = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND expires_at < $2")
            .bind(user_id)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT ci.id, ci.user_id, ci.product_id, ci.quantity,
                   ci.expires_at, ci.created_at,
                   p.slug, p.name, p.image, p.price,
                   c.name AS category_name
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            JOIN categories c ON c.id = p.category_id
            WHERE ci.user_id = $1
            ORDER BY ci.created_at, ci.id
            ",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        if swept > 0 {
            tracing::debug!(user_id = %user_id, swept, "Swept expired cart items");
        }

        Ok(Some(rows.into_iter().map(CartLine::from).collect()))
    }

    async fn find_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<Option<StockedItem>, RepositoryError> {
        let row = sqlx::query_as::<_, StockedItemRow>(
            r"
            SELECT ci.id, ci.user_id, ci.product_id, ci.quantity,
                   ci.expires_at, ci.created_at, p.stock
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.id = $1 AND ci.user_id = $2
            ",
        )
        .bind(item_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(StockedItem::from))
    }

    async fn find_active_item_for_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let item = sqlx::query_as::<_, CartItem>(
            r"
            SELECT id, user_id, product_id, quantity, expires_at, created_at
            FROM cart_items
            WHERE user_id = $1 AND product_id = $2 AND expires_at >= $3
            ORDER BY created_at, id
            LIMIT 1
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(now)
        .fetch_optional(self.pool)
        .await?;

        Ok(item)
    }

    async fn product_stock(&self, product_id: ProductId) -> Result<Option<i32>, RepositoryError> {
        let stock = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(stock)
    }

    async fn insert_item(&self, item: &NewCartItem) -> Result<CartItem, RepositoryError> {
        sqlx::query_as::<_, CartItem>(
            r"
            INSERT INTO cart_items (user_id, product_id, quantity, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, product_id, quantity, expires_at, created_at
            ",
        )
        .bind(item.user_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.expires_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "cart item"))
    }

    async fn set_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let item = sqlx::query_as::<_, CartItem>(
            r"
            UPDATE cart_items ci
            SET quantity = $3
            FROM products p
            WHERE ci.id = $1
              AND ci.user_id = $2
              AND ci.expires_at >= $4
              AND p.id = ci.product_id
              AND p.stock >= $3
            RETURNING ci.id, ci.user_id, ci.product_id, ci.quantity,
                      ci.expires_at, ci.created_at
            ",
        )
        .bind(item_id)
        .bind(user_id)
        .bind(quantity)
        .bind(now)
        .fetch_optional(self.pool)
        .await?;

        Ok(item)
    }

    async fn delete_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE expires_at < $1")
            .bind(now)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
