//! Catalog types: products, categories and listing parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use toko_core::{CarouselId, CategoryId, Price, ProductId, Slug};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A home-page carousel slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Carousel {
    pub id: CarouselId,
    pub title: Option<String>,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

/// Admin input for a new carousel slide.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCarousel {
    #[serde(default)]
    pub title: Option<String>,
    pub image: String,
}

/// A catalog product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub slug: Slug,
    pub name: String,
    pub price: Price,
    pub stock: i32,
    pub description: String,
    pub image: String,
    pub video: Option<String>,
    pub category_id: CategoryId,
    pub created_at: DateTime<Utc>,
}

/// A product with its category name flattened in, as listed to shoppers.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductWithCategory {
    pub id: ProductId,
    pub slug: Slug,
    pub name: String,
    pub price: Price,
    pub stock: i32,
    pub description: String,
    pub image: String,
    pub video: Option<String>,
    pub category_id: CategoryId,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Card data for the "latest products" strip.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LatestProduct {
    pub id: ProductId,
    pub name: String,
    pub slug: Slug,
    pub price: Price,
    pub image: String,
}

/// Admin input for creating or replacing a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub stock: i32,
    #[serde(default)]
    pub description: String,
    pub image: String,
    pub video: Option<String>,
    pub category_id: CategoryId,
}

impl NewProduct {
    /// The slug this product will be stored under.
    #[must_use]
    pub fn slug(&self) -> Slug {
        Slug::from_name(&self.name)
    }
}

/// Product listing filters.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
    /// Exact category name.
    pub category: Option<String>,
}

impl ProductFilter {
    /// Build a filter from raw query values, treating empty strings as absent.
    #[must_use]
    pub fn new(search: Option<String>, category: Option<String>) -> Self {
        let non_empty = |s: Option<String>| s.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        Self {
            search: non_empty(search),
            category: non_empty(category),
        }
    }
}

/// One-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    /// Default page size.
    pub const DEFAULT_LIMIT: u32 = 10;
    /// Largest page size a client may request.
    pub const MAX_LIMIT: u32 = 100;

    /// Build a page from optional query values.
    ///
    /// Page numbers below 1 become 1; limits are clamped to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    /// SQL `OFFSET` for this page.
    #[must_use]
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }

    /// SQL `LIMIT` for this page.
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}
