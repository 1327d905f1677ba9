//! Cart engine.
//!
//! Owns the cart-item lifecycle: expiry sweeps before every read, merging
//! and stock validation on add, quantity updates, idempotent removal, and
//! exact totals. Storage goes through [`CartStore`], so the engine runs the
//! same against `PostgreSQL` and the in-memory store used in tests.
//!
//! # Item lifecycle
//!
//! An item is *active* until its `expires_at` passes, then *stale* until the
//! next sweep deletes it. Explicit removal (or setting the quantity to zero)
//! deletes an active item directly. Nothing comes back from either end.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use toko_core::{CartItemId, Price, ProductId, UserId};

use crate::db::{CartStore, RepositoryError};
use crate::models::{Caller, Cart, CartItem, CartLine, NewCartItem, NotOwner};

/// How long a cart item lives when `CART_ITEM_TTL_HOURS` is not set.
pub const DEFAULT_ITEM_TTL: TimeDelta = TimeDelta::hours(24);

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The caller is not the owner of the cart.
    #[error("not allowed to access this cart")]
    Unauthorized(#[from] NotOwner),

    /// The user, item, or product doesn't exist (or the item has expired).
    #[error("not found")]
    NotFound,

    /// Quantity is negative, or zero where zero has no meaning.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i32),

    /// The product doesn't have enough stock for the requested quantity.
    #[error("requested quantity {requested} exceeds available stock {available}")]
    QuantityExceedsStock { requested: i32, available: i32 },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CartError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// Aggregate figures for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub total_quantity: i64,
    pub total_price: Price,
}

impl CartTotals {
    /// Compute both totals for a list of lines.
    #[must_use]
    pub fn of(items: &[CartLine]) -> Self {
        Self {
            total_quantity: calculate_total_quantity(items),
            total_price: calculate_total_price(items),
        }
    }
}

/// Sum of item quantities.
#[must_use]
pub fn calculate_total_quantity(items: &[CartLine]) -> i64 {
    items.iter().map(|line| i64::from(line.quantity)).sum()
}

/// Sum of `price * quantity` over all items, in exact decimal arithmetic.
#[must_use]
pub fn calculate_total_price(items: &[CartLine]) -> Price {
    items.iter().map(CartLine::line_total).sum()
}

/// Cart engine over a [`CartStore`].
pub struct CartService<S> {
    store: S,
    ttl: TimeDelta,
}

impl<S: CartStore> CartService<S> {
    /// Create a cart engine whose new items live for `ttl`.
    #[must_use]
    pub const fn new(store: S, ttl: TimeDelta) -> Self {
        Self { store, ttl }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Sweep `user_id`'s expired items and return what remains.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Unauthorized` if the caller is not `user_id`.
    /// Returns `CartError::NotFound` if the user doesn't exist.
    #[instrument(skip(self, caller), fields(caller = %caller.user_id))]
    pub async fn get_cart(&self, caller: &Caller, user_id: UserId) -> Result<Cart, CartError> {
        caller.authorize_owner(user_id)?;

        let as_of = Utc::now();
        let items = self
            .store
            .sweep_and_load(user_id, as_of)
            .await?
            .ok_or(CartError::NotFound)?;

        Ok(Cart { items, as_of })
    }

    /// Totals of `user_id`'s cart after a sweep.
    ///
    /// # Errors
    ///
    /// Same as [`CartService::get_cart`].
    pub async fn totals(&self, caller: &Caller, user_id: UserId) -> Result<CartTotals, CartError> {
        let cart = self.get_cart(caller, user_id).await?;
        Ok(CartTotals::of(&cart.items))
    }

    /// Add `quantity` of a product to the caller's cart.
    ///
    /// An active item for the same product absorbs the new quantity and
    /// keeps its original expiry; otherwise a new item expiring after the
    /// configured TTL is created.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `quantity` is below 1.
    /// Returns `CartError::NotFound` if the product doesn't exist.
    /// Returns `CartError::QuantityExceedsStock` if the resulting quantity
    /// exceeds the product's stock.
    #[instrument(skip(self, caller), fields(caller = %caller.user_id))]
    pub async fn add_item(
        &self,
        caller: &Caller,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartItem, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        let now = Utc::now();
        let stock = self
            .store
            .product_stock(product_id)
            .await?
            .ok_or(CartError::NotFound)?;

        let existing = self
            .store
            .find_active_item_for_product(caller.user_id, product_id, now)
            .await?;

        match existing {
            Some(item) => {
                let merged = item
                    .quantity
                    .checked_add(quantity)
                    .ok_or(CartError::InvalidQuantity(quantity))?;
                ensure_in_stock(merged, stock)?;
                self.write_quantity(caller.user_id, item.id, merged, now)
                    .await
            }
            None => {
                ensure_in_stock(quantity, stock)?;
                let new_item = NewCartItem {
                    user_id: caller.user_id,
                    product_id,
                    quantity,
                    expires_at: now + self.ttl,
                };
                let item = self.store.insert_item(&new_item).await?;
                tracing::info!(item_id = %item.id, "Cart item added");
                Ok(item)
            }
        }
    }

    /// Remove one of the caller's items.
    ///
    /// Absent IDs and items owned by someone else are ignored, so repeating
    /// the call is harmless.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self, caller), fields(caller = %caller.user_id))]
    pub async fn delete_item(&self, caller: &Caller, item_id: CartItemId) -> Result<(), CartError> {
        let removed = self.store.delete_item(caller.user_id, item_id).await?;
        if removed {
            tracing::info!(item_id = %item_id, "Cart item removed");
        }
        Ok(())
    }

    /// Set the quantity of one of the caller's items.
    ///
    /// Zero removes the item exactly like [`CartService::delete_item`] and
    /// returns `None`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `quantity` is negative.
    /// Returns `CartError::NotFound` if the item is absent or expired.
    /// Returns `CartError::QuantityExceedsStock` if `quantity` exceeds the
    /// product's stock, including when stock dropped during the write.
    #[instrument(skip(self, caller), fields(caller = %caller.user_id))]
    pub async fn update_quantity(
        &self,
        caller: &Caller,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<Option<CartItem>, CartError> {
        if quantity < 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        if quantity == 0 {
            self.delete_item(caller, item_id).await?;
            return Ok(None);
        }

        let now = Utc::now();
        let stocked = self
            .store
            .find_item(caller.user_id, item_id)
            .await?
            .filter(|stocked| !stocked.item.is_stale(now))
            .ok_or(CartError::NotFound)?;
        ensure_in_stock(quantity, stocked.stock)?;

        self.write_quantity(caller.user_id, item_id, quantity, now)
            .await
            .map(Some)
    }

    /// Delete every expired item in the store.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn purge_expired(&self) -> Result<u64, CartError> {
        let purged = self.store.purge_expired(Utc::now()).await?;
        tracing::info!(purged, "Purged expired cart items");
        Ok(purged)
    }

    /// Guarded write; a rejected guard is re-read to report why.
    async fn write_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<CartItem, CartError> {
        if let Some(item) = self
            .store
            .set_quantity(user_id, item_id, quantity, now)
            .await?
        {
            return Ok(item);
        }

        match self.store.find_item(user_id, item_id).await? {
            Some(stocked) if !stocked.item.is_stale(now) && stocked.stock < quantity => {
                tracing::warn!(
                    item_id = %item_id,
                    requested = quantity,
                    available = stocked.stock,
                    "Stock changed during quantity update"
                );
                Err(CartError::QuantityExceedsStock {
                    requested: quantity,
                    available: stocked.stock,
                })
            }
            _ => Err(CartError::NotFound),
        }
    }
}

fn ensure_in_stock(requested: i32, available: i32) -> Result<(), CartError> {
    if requested > available {
        return Err(CartError::QuantityExceedsStock {
            requested,
            available,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use toko_core::{Role, Slug};

    use super::*;
    use crate::db::MemoryCartStore;
    use crate::models::{CartProduct, CategoryName, StockedItem};

    const SHOPPER: UserId = UserId::new(1);
    const OTHER: UserId = UserId::new(2);
    const KOPI: ProductId = ProductId::new(10);
    const TEH: ProductId = ProductId::new(11);

    fn product(id: ProductId, name: &str, price: i64) -> CartProduct {
        CartProduct {
            id,
            slug: Slug::from_name(name),
            name: name.to_owned(),
            image: format!("{}.jpg", Slug::from_name(name)),
            price: Price::from_rupiah(price),
            category: CategoryName {
                name: "Minuman".to_owned(),
            },
        }
    }

    fn engine() -> CartService<MemoryCartStore> {
        let store = MemoryCartStore::new();
        store.add_user(SHOPPER);
        store.add_user(OTHER);
        store.add_product(product(KOPI, "Kopi Gayo", 10_000), 10);
        store.add_product(product(TEH, "Teh Melati", 5_000), 5);
        CartService::new(store, DEFAULT_ITEM_TTL)
    }

    fn shopper() -> Caller {
        Caller::new(SHOPPER, Role::User)
    }

    #[tokio::test]
    async fn test_add_then_get_cart_in_insertion_order() {
        let cart = engine();
        cart.add_item(&shopper(), KOPI, 2).await.unwrap();
        cart.add_item(&shopper(), TEH, 1).await.unwrap();

        let loaded = cart.get_cart(&shopper(), SHOPPER).await.unwrap();
        let names: Vec<_> = loaded.items.iter().map(|l| l.product.name.as_str()).collect();
        assert_eq!(names, ["Kopi Gayo", "Teh Melati"]);
        assert_eq!(loaded.items[0].product.category.name, "Minuman");
    }

    #[tokio::test]
    async fn test_add_sets_expiry_from_ttl() {
        let cart = engine();
        let before = Utc::now();
        let item = cart.add_item(&shopper(), KOPI, 1).await.unwrap();
        assert!(item.expires_at >= before + DEFAULT_ITEM_TTL);
        assert!(item.expires_at <= Utc::now() + DEFAULT_ITEM_TTL);
    }

    #[tokio::test]
    async fn test_add_merges_existing_item_without_extending_expiry() {
        let cart = engine();
        let first = cart.add_item(&shopper(), KOPI, 2).await.unwrap();
        let merged = cart.add_item(&shopper(), KOPI, 3).await.unwrap();

        assert_eq!(merged.id, first.id);
        assert_eq!(merged.quantity, 5);
        assert_eq!(merged.expires_at, first.expires_at);
        assert_eq!(cart.store().items().len(), 1);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_quantity_and_unknown_product() {
        let cart = engine();
        assert!(matches!(
            cart.add_item(&shopper(), KOPI, 0).await,
            Err(CartError::InvalidQuantity(0))
        ));
        assert!(matches!(
            cart.add_item(&shopper(), ProductId::new(999), 1).await,
            Err(CartError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_add_rejects_over_stock_including_merge() {
        let cart = engine();
        assert!(matches!(
            cart.add_item(&shopper(), TEH, 6).await,
            Err(CartError::QuantityExceedsStock {
                requested: 6,
                available: 5
            })
        ));

        cart.add_item(&shopper(), TEH, 4).await.unwrap();
        assert!(matches!(
            cart.add_item(&shopper(), TEH, 2).await,
            Err(CartError::QuantityExceedsStock {
                requested: 6,
                available: 5
            })
        ));
    }

    #[tokio::test]
    async fn test_get_cart_requires_owner() {
        let cart = engine();
        let admin = Caller::new(OTHER, Role::Admin);
        assert!(matches!(
            cart.get_cart(&admin, SHOPPER).await,
            Err(CartError::Unauthorized(NotOwner))
        ));
    }

    #[tokio::test]
    async fn test_get_cart_unknown_user_is_not_found() {
        let cart = engine();
        let ghost = Caller::new(UserId::new(404), Role::User);
        assert!(matches!(
            cart.get_cart(&ghost, UserId::new(404)).await,
            Err(CartError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_get_cart_sweeps_item_expired_an_hour_ago() {
        let cart = engine();
        let now = Utc::now();
        cart.store()
            .insert_item(&NewCartItem {
                user_id: SHOPPER,
                product_id: KOPI,
                quantity: 1,
                expires_at: now - TimeDelta::hours(1),
            })
            .await
            .unwrap();
        cart.add_item(&shopper(), TEH, 1).await.unwrap();

        let loaded = cart.get_cart(&shopper(), SHOPPER).await.unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].product_id, TEH);
        assert_eq!(cart.store().items().len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_leaves_other_users_alone() {
        let cart = engine();
        cart.store()
            .insert_item(&NewCartItem {
                user_id: OTHER,
                product_id: KOPI,
                quantity: 1,
                expires_at: Utc::now() - TimeDelta::minutes(5),
            })
            .await
            .unwrap();

        cart.get_cart(&shopper(), SHOPPER).await.unwrap();
        assert_eq!(cart.store().items().len(), 1);
    }

    #[tokio::test]
    async fn test_update_quantity_zero_removes_item() {
        let cart = engine();
        let kopi = cart.add_item(&shopper(), KOPI, 3).await.unwrap();
        cart.add_item(&shopper(), TEH, 1).await.unwrap();
        let before = cart.totals(&shopper(), SHOPPER).await.unwrap();

        let result = cart.update_quantity(&shopper(), kopi.id, 0).await.unwrap();
        assert!(result.is_none());

        let after = cart.totals(&shopper(), SHOPPER).await.unwrap();
        assert_eq!(after.total_quantity, before.total_quantity - 3);
        assert!(
            cart.store()
                .items()
                .iter()
                .all(|item| item.id != kopi.id)
        );
    }

    #[tokio::test]
    async fn test_update_quantity_zero_matches_delete() {
        let zeroed = engine();
        let deleted = engine();
        let a = zeroed.add_item(&shopper(), KOPI, 2).await.unwrap();
        let b = deleted.add_item(&shopper(), KOPI, 2).await.unwrap();

        zeroed.update_quantity(&shopper(), a.id, 0).await.unwrap();
        deleted.delete_item(&shopper(), b.id).await.unwrap();

        assert_eq!(zeroed.store().items(), deleted.store().items());
    }

    #[tokio::test]
    async fn test_update_quantity_validates() {
        let cart = engine();
        let teh = cart.add_item(&shopper(), TEH, 1).await.unwrap();

        assert!(matches!(
            cart.update_quantity(&shopper(), teh.id, -1).await,
            Err(CartError::InvalidQuantity(-1))
        ));
        assert!(matches!(
            cart.update_quantity(&shopper(), teh.id, 9).await,
            Err(CartError::QuantityExceedsStock {
                requested: 9,
                available: 5
            })
        ));
        assert!(matches!(
            cart.update_quantity(&shopper(), CartItemId::new(999), 1).await,
            Err(CartError::NotFound)
        ));

        let updated = cart.update_quantity(&shopper(), teh.id, 5).await.unwrap();
        assert_eq!(updated.map(|item| item.quantity), Some(5));
    }

    /// Memory store where another checkout drains a product's stock between
    /// the engine's stock check and its quantity write.
    struct DrainedStore {
        inner: MemoryCartStore,
        product_id: ProductId,
        drained_to: i32,
    }

    #[async_trait::async_trait]
    impl CartStore for DrainedStore {
        async fn sweep_and_load(
            &self,
            user_id: UserId,
            now: DateTime<Utc>,
        ) -> Result<Option<Vec<CartLine>>, RepositoryError> {
            self.inner.sweep_and_load(user_id, now).await
        }

        async fn find_item(
            &self,
            user_id: UserId,
            item_id: CartItemId,
        ) -> Result<Option<StockedItem>, RepositoryError> {
            self.inner.find_item(user_id, item_id).await
        }

        async fn find_active_item_for_product(
            &self,
            user_id: UserId,
            product_id: ProductId,
            now: DateTime<Utc>,
        ) -> Result<Option<CartItem>, RepositoryError> {
            self.inner
                .find_active_item_for_product(user_id, product_id, now)
                .await
        }

        async fn product_stock(
            &self,
            product_id: ProductId,
        ) -> Result<Option<i32>, RepositoryError> {
            self.inner.product_stock(product_id).await
        }

        async fn insert_item(&self, item: &NewCartItem) -> Result<CartItem, RepositoryError> {
            self.inner.insert_item(item).await
        }

        async fn set_quantity(
            &self,
            user_id: UserId,
            item_id: CartItemId,
            quantity: i32,
            now: DateTime<Utc>,
        ) -> Result<Option<CartItem>, RepositoryError> {
            self.inner.set_stock(self.product_id, self.drained_to);
            self.inner.set_quantity(user_id, item_id, quantity, now).await
        }

        async fn delete_item(
            &self,
            user_id: UserId,
            item_id: CartItemId,
        ) -> Result<bool, RepositoryError> {
            self.inner.delete_item(user_id, item_id).await
        }

        async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
            self.inner.purge_expired(now).await
        }
    }

    fn drained_engine(drained_to: i32) -> CartService<DrainedStore> {
        let inner = MemoryCartStore::new();
        inner.add_user(SHOPPER);
        inner.add_product(product(KOPI, "Kopi Gayo", 10_000), 10);
        CartService::new(
            DrainedStore {
                inner,
                product_id: KOPI,
                drained_to,
            },
            DEFAULT_ITEM_TTL,
        )
    }

    #[tokio::test]
    async fn test_update_quantity_reports_stock_drained_during_write() {
        let cart = drained_engine(3);
        let item = cart
            .store()
            .inner
            .insert_item(&NewCartItem {
                user_id: SHOPPER,
                product_id: KOPI,
                quantity: 1,
                expires_at: Utc::now() + DEFAULT_ITEM_TTL,
            })
            .await
            .unwrap();

        let result = cart.update_quantity(&shopper(), item.id, 8).await;
        assert!(matches!(
            result,
            Err(CartError::QuantityExceedsStock {
                requested: 8,
                available: 3
            })
        ));
        let stored = cart.store().inner.items();
        assert_eq!(stored[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_add_merge_reports_stock_drained_during_write() {
        let cart = drained_engine(4);
        cart.store()
            .inner
            .insert_item(&NewCartItem {
                user_id: SHOPPER,
                product_id: KOPI,
                quantity: 2,
                expires_at: Utc::now() + DEFAULT_ITEM_TTL,
            })
            .await
            .unwrap();

        assert!(matches!(
            cart.add_item(&shopper(), KOPI, 3).await,
            Err(CartError::QuantityExceedsStock {
                requested: 5,
                available: 4
            })
        ));
    }

    #[tokio::test]
    async fn test_update_quantity_write_skips_item_that_expired() {
        let store = MemoryCartStore::new();
        store.add_user(SHOPPER);
        store.add_product(product(KOPI, "Kopi Gayo", 10_000), 10);
        let now = Utc::now();
        let item = store
            .insert_item(&NewCartItem {
                user_id: SHOPPER,
                product_id: KOPI,
                quantity: 1,
                expires_at: now + TimeDelta::seconds(1),
            })
            .await
            .unwrap();

        let later = now + TimeDelta::seconds(2);
        assert_eq!(
            store.set_quantity(SHOPPER, item.id, 4, later).await.unwrap(),
            None
        );
        assert_eq!(store.items()[0].quantity, 1);
        assert!(
            store
                .set_quantity(SHOPPER, item.id, 4, now)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_update_quantity_on_expired_item_is_not_found() {
        let cart = engine();
        let stale = cart
            .store()
            .insert_item(&NewCartItem {
                user_id: SHOPPER,
                product_id: KOPI,
                quantity: 1,
                expires_at: Utc::now() - TimeDelta::seconds(1),
            })
            .await
            .unwrap();

        assert!(matches!(
            cart.update_quantity(&shopper(), stale.id, 2).await,
            Err(CartError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete_are_scoped_to_owner() {
        let cart = engine();
        let item = cart.add_item(&shopper(), KOPI, 1).await.unwrap();
        let intruder = Caller::new(OTHER, Role::User);

        assert!(matches!(
            cart.update_quantity(&intruder, item.id, 2).await,
            Err(CartError::NotFound)
        ));
        cart.delete_item(&intruder, item.id).await.unwrap();
        assert_eq!(cart.store().items().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_absent_item_is_ok() {
        let cart = engine();
        cart.delete_item(&shopper(), CartItemId::new(12345)).await.unwrap();
        cart.delete_item(&shopper(), CartItemId::new(12345)).await.unwrap();
    }

    #[tokio::test]
    async fn test_purge_expired_counts_removed_rows() {
        let cart = engine();
        for (user_id, offset) in [(SHOPPER, -2), (OTHER, -1), (OTHER, 3)] {
            cart.store()
                .insert_item(&NewCartItem {
                    user_id,
                    product_id: KOPI,
                    quantity: 1,
                    expires_at: Utc::now() + TimeDelta::hours(offset),
                })
                .await
                .unwrap();
        }

        assert_eq!(cart.purge_expired().await.unwrap(), 2);
        assert_eq!(cart.store().items().len(), 1);
    }

    #[test]
    fn test_totals_of_example_cart() {
        let now = Utc::now();
        let line = |id: i32, product: CartProduct, quantity: i32| CartLine {
            id: CartItemId::new(id),
            user_id: SHOPPER,
            product_id: product.id,
            quantity,
            expires_at: now,
            created_at: now,
            product,
        };
        let items = [
            line(1, product(KOPI, "Kopi Gayo", 10_000), 2),
            line(2, product(TEH, "Teh Melati", 5_000), 1),
        ];

        assert_eq!(calculate_total_quantity(&items), 3);
        assert_eq!(calculate_total_price(&items), Price::from_rupiah(25_000));
        assert_eq!(CartTotals::of(&[]).total_price, Price::ZERO);
    }

    fn arb_lines() -> impl Strategy<Value = Vec<CartLine>> {
        prop::collection::vec((0i64..100_000_000, 0u32..100, 1i32..1_000), 0..20).prop_map(
            |specs| {
                let now = Utc::now();
                specs
                    .into_iter()
                    .enumerate()
                    .map(|(i, (units, cents, quantity))| {
                        let id = i32::try_from(i).unwrap();
                        let mut p = product(ProductId::new(id), "Produk", 0);
                        p.price = Price::new(Decimal::new(units * 100 + i64::from(cents), 2));
                        CartLine {
                            id: CartItemId::new(id),
                            user_id: SHOPPER,
                            product_id: p.id,
                            quantity,
                            expires_at: now,
                            created_at: now,
                            product: p,
                        }
                    })
                    .collect()
            },
        )
    }

    proptest! {
        #[test]
        fn totals_are_exact_and_order_independent(lines in arb_lines()) {
            let expected_quantity: i64 = lines.iter().map(|l| i64::from(l.quantity)).sum();
            let expected_price = lines.iter().fold(Decimal::ZERO, |acc, l| {
                acc + l.product.price.amount() * Decimal::from(l.quantity)
            });

            prop_assert_eq!(calculate_total_quantity(&lines), expected_quantity);
            prop_assert_eq!(calculate_total_price(&lines).amount(), expected_price);

            let mut reversed = lines.clone();
            reversed.reverse();
            prop_assert_eq!(calculate_total_price(&reversed), calculate_total_price(&lines));
        }

        #[test]
        fn no_returned_item_is_stale_after_sweep(offsets in prop::collection::vec(-120i64..120, 0..12)) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let cart = engine();
                let now = Utc::now();
                for offset in &offsets {
                    cart.store()
                        .insert_item(&NewCartItem {
                            user_id: SHOPPER,
                            product_id: KOPI,
                            quantity: 1,
                            expires_at: now + TimeDelta::minutes(*offset),
                        })
                        .await
                        .unwrap();
                }

                let loaded = cart.get_cart(&shopper(), SHOPPER).await.unwrap();
                assert!(loaded.items.iter().all(|line| line.expires_at >= loaded.as_of));
                let live = offsets.iter().filter(|offset| **offset > 0).count();
                assert!(loaded.items.len() >= live);
            });
        }
    }
}
