//! In-memory [`CartStore`] for tests.
//!
//! Mirrors the `PostgreSQL` semantics the engine relies on: user scoping,
//! insertion ordering, the stock and expiry guard on quantity writes, and the
//! "user must exist" check on reads.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use toko_core::{CartItemId, ProductId, UserId};

use super::RepositoryError;
use super::cart::CartStore;
use crate::models::{CartItem, CartLine, CartProduct, NewCartItem, StockedItem};

#[derive(Default)]
struct Inner {
    users: HashSet<UserId>,
    products: HashMap<ProductId, (CartProduct, i32)>,
    items: Vec<CartItem>,
    next_item_id: i32,
}

/// A [`CartStore`] backed by process memory.
#[derive(Default)]
pub struct MemoryCartStore {
    inner: Mutex<Inner>,
}

impl MemoryCartStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a user so cart reads for them succeed.
    pub fn add_user(&self, user_id: UserId) {
        self.lock().users.insert(user_id);
    }

    /// Register a product with its stock.
    pub fn add_product(&self, product: CartProduct, stock: i32) {
        self.lock().products.insert(product.id, (product, stock));
    }

    /// Change a product's stock.
    pub fn set_stock(&self, product_id: ProductId, stock: i32) {
        if let Some((_, current)) = self.lock().products.get_mut(&product_id) {
            *current = stock;
        }
    }

    /// Snapshot of every stored item, expired or not.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.lock().items.clone()
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn sweep_and_load(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<CartLine>>, RepositoryError> {
        let mut inner = self.lock();
        if !inner.users.contains(&user_id) {
            return Ok(None);
        }

        inner
            .items
            .retain(|item| item.user_id != user_id || !item.is_stale(now));

        let mut lines = Vec::new();
        for item in inner.items.iter().filter(|item| item.user_id == user_id) {
            let (product, _) = inner
                .products
                .get(&item.product_id)
                .ok_or_else(|| RepositoryError::DataCorruption("dangling product".to_owned()))?;
            lines.push(CartLine {
                id: item.id,
                user_id: item.user_id,
                product_id: item.product_id,
                quantity: item.quantity,
                expires_at: item.expires_at,
                created_at: item.created_at,
                product: product.clone(),
            });
        }
        lines.sort_by_key(|line| (line.created_at, line.id.as_i32()));

        Ok(Some(lines))
    }

    async fn find_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<Option<StockedItem>, RepositoryError> {
        let inner = self.lock();
        let found = inner
            .items
            .iter()
            .find(|item| item.id == item_id && item.user_id == user_id)
            .and_then(|item| {
                inner.products.get(&item.product_id).map(|(_, stock)| StockedItem {
                    item: item.clone(),
                    stock: *stock,
                })
            });
        Ok(found)
    }

    async fn find_active_item_for_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<Option<CartItem>, RepositoryError> {
        Ok(self
            .lock()
            .items
            .iter()
            .find(|item| {
                item.user_id == user_id && item.product_id == product_id && !item.is_stale(now)
            })
            .cloned())
    }

    async fn product_stock(&self, product_id: ProductId) -> Result<Option<i32>, RepositoryError> {
        Ok(self.lock().products.get(&product_id).map(|(_, stock)| *stock))
    }

    async fn insert_item(&self, item: &NewCartItem) -> Result<CartItem, RepositoryError> {
        let mut inner = self.lock();
        if !inner.users.contains(&item.user_id) || !inner.products.contains_key(&item.product_id)
        {
            return Err(RepositoryError::NotFound);
        }

        inner.next_item_id += 1;
        let stored = CartItem {
            id: CartItemId::new(inner.next_item_id),
            user_id: item.user_id,
            product_id: item.product_id,
            quantity: item.quantity,
            expires_at: item.expires_at,
            created_at: Utc::now(),
        };
        inner.items.push(stored.clone());
        Ok(stored)
    }

    async fn set_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let mut inner = self.lock();
        let Inner {
            products, items, ..
        } = &mut *inner;

        let Some(item) = items
            .iter_mut()
            .find(|item| item.id == item_id && item.user_id == user_id && !item.is_stale(now))
        else {
            return Ok(None);
        };
        let in_stock = products
            .get(&item.product_id)
            .is_some_and(|(_, stock)| *stock >= quantity);
        if !in_stock {
            return Ok(None);
        }

        item.quantity = quantity;
        Ok(Some(item.clone()))
    }

    async fn delete_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.lock();
        let before = inner.items.len();
        inner
            .items
            .retain(|item| !(item.id == item_id && item.user_id == user_id));
        Ok(inner.items.len() < before)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut inner = self.lock();
        let before = inner.items.len();
        inner.items.retain(|item| !item.is_stale(now));
        Ok(u64::try_from(before - inner.items.len()).unwrap_or(u64::MAX))
    }
}
