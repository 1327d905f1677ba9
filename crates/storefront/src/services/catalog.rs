//! Catalog service: listings, the latest-products cache, carousel slides and
//! admin writes.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use toko_core::{CarouselId, CategoryId, ProductId};

use crate::db::{CatalogRepository, RepositoryError};
use crate::models::{
    Carousel, Category, LatestProduct, NewCarousel, NewProduct, Page, Product, ProductFilter,
    ProductWithCategory,
};

/// Number of products in the "latest" strip.
pub const LATEST_PRODUCTS: i64 = 8;

/// How long the latest-products list is served from memory.
pub const LATEST_PRODUCTS_TTL: Duration = Duration::from_secs(10);

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Admin input failed validation.
    #[error("{0}")]
    Invalid(String),

    /// Product or category not found.
    #[error("not found")]
    NotFound,

    /// Unique slug or name already taken.
    #[error("{0}")]
    Conflict(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),

    /// Database error shared by every caller waiting on a cache fill.
    #[error("database error: {0}")]
    CacheFill(Arc<RepositoryError>),
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Repository(other),
        }
    }
}

/// One page of the product listing.
#[derive(Debug, Clone, Serialize)]
pub struct ProductListing {
    pub products: Vec<ProductWithCategory>,
    pub displayed_categories: Vec<String>,
    #[serde(skip)]
    pub total: u64,
}

/// One page of categories.
#[derive(Debug, Clone)]
pub struct CategoryListing {
    pub categories: Vec<Category>,
    pub total: u64,
}

/// One page of carousel slides.
#[derive(Debug, Clone)]
pub struct CarouselListing {
    pub carousels: Vec<Carousel>,
    pub total: u64,
}

/// Short-lived cache for the latest-products query.
#[derive(Clone)]
pub struct LatestProductsCache {
    cache: Cache<(), Arc<Vec<LatestProduct>>>,
}

impl LatestProductsCache {
    /// Create a cache whose entry lives for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    /// Drop the cached list so the next read hits the database.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }
}

impl Default for LatestProductsCache {
    fn default() -> Self {
        Self::new(LATEST_PRODUCTS_TTL)
    }
}

/// Catalog service.
pub struct CatalogService<'a> {
    repo: CatalogRepository<'a>,
    latest: &'a LatestProductsCache,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, latest: &'a LatestProductsCache) -> Self {
        Self {
            repo: CatalogRepository::new(pool),
            latest,
        }
    }

    /// List a page of products with the matching categories and total count.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if a query fails.
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
        page: Page,
    ) -> Result<ProductListing, CatalogError> {
        let products = self.repo.list_products(filter, page).await?;
        let total = self.repo.count_products(filter).await?;
        let displayed_categories = self.repo.displayed_categories(filter).await?;

        Ok(ProductListing {
            products,
            displayed_categories,
            total,
        })
    }

    /// The newest products, served from the cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the cache is cold and the query fails.
    pub async fn latest_products(&self) -> Result<Arc<Vec<LatestProduct>>, CatalogError> {
        self.latest
            .cache
            .try_get_with((), async {
                tracing::debug!("Cache miss for latest products");
                self.repo.latest_products(LATEST_PRODUCTS).await.map(Arc::new)
            })
            .await
            .map_err(CatalogError::CacheFill)
    }

    /// Get a product by slug.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has this slug.
    pub async fn product_by_slug(&self, slug: &str) -> Result<ProductWithCategory, CatalogError> {
        self.repo
            .get_product_by_slug(slug)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// List a page of categories.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if a query fails.
    pub async fn list_categories(&self, page: Page) -> Result<CategoryListing, CatalogError> {
        let categories = self.repo.list_categories(page).await?;
        let total = self.repo.count_categories().await?;
        Ok(CategoryListing { categories, total })
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` if the input fails validation.
    /// Returns `CatalogError::Conflict` if the derived slug is taken.
    /// Returns `CatalogError::NotFound` if the category doesn't exist.
    pub async fn create_product(&self, input: &NewProduct) -> Result<Product, CatalogError> {
        validate_product(input)?;
        let product = self.repo.create_product(input).await?;
        self.latest.invalidate().await;
        tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
        Ok(product)
    }

    /// Replace a product.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogService::create_product`], plus `NotFound` for an
    /// unknown product.
    pub async fn update_product(
        &self,
        id: ProductId,
        input: &NewProduct,
    ) -> Result<Product, CatalogError> {
        validate_product(input)?;
        let product = self.repo.update_product(id, input).await?;
        self.latest.invalidate().await;
        tracing::info!(product_id = %product.id, "Product updated");
        Ok(product)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for a blank name.
    /// Returns `CatalogError::Conflict` if the name is taken.
    pub async fn create_category(&self, name: &str) -> Result<Category, CatalogError> {
        let name = validate_category_name(name)?;
        Ok(self.repo.create_category(name).await?)
    }

    /// Rename a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for a blank name.
    /// Returns `CatalogError::NotFound` if the category doesn't exist.
    /// Returns `CatalogError::Conflict` if the name is taken.
    pub async fn rename_category(
        &self,
        id: CategoryId,
        name: &str,
    ) -> Result<Category, CatalogError> {
        let name = validate_category_name(name)?;
        Ok(self.repo.rename_category(id, name).await?)
    }

    /// List a page of carousel slides.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if a query fails.
    pub async fn list_carousels(&self, page: Page) -> Result<CarouselListing, CatalogError> {
        let carousels = self.repo.list_carousels(page).await?;
        let total = self.repo.count_carousels().await?;
        Ok(CarouselListing { carousels, total })
    }

    /// Create a carousel slide.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for a blank image.
    pub async fn create_carousel(&self, input: &NewCarousel) -> Result<Carousel, CatalogError> {
        let input = normalize_carousel(input)?;
        let carousel = self.repo.create_carousel(&input).await?;
        tracing::info!(carousel_id = %carousel.id, "Carousel slide created");
        Ok(carousel)
    }

    /// Delete a carousel slide.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the slide doesn't exist.
    pub async fn delete_carousel(&self, id: CarouselId) -> Result<(), CatalogError> {
        if !self.repo.delete_carousel(id).await? {
            return Err(CatalogError::NotFound);
        }
        tracing::info!(carousel_id = %id, "Carousel slide deleted");
        Ok(())
    }
}

/// Validate admin product input.
///
/// # Errors
///
/// Returns `CatalogError::Invalid` describing the first problem found.
pub fn validate_product(input: &NewProduct) -> Result<(), CatalogError> {
    if input.name.trim().is_empty() {
        return Err(CatalogError::Invalid("name must not be empty".to_owned()));
    }
    if input.slug().is_empty() {
        return Err(CatalogError::Invalid(
            "name must contain at least one letter or digit".to_owned(),
        ));
    }
    if input.price.is_negative() {
        return Err(CatalogError::Invalid("price must not be negative".to_owned()));
    }
    if input.stock < 0 {
        return Err(CatalogError::Invalid("stock must not be negative".to_owned()));
    }
    if input.image.trim().is_empty() {
        return Err(CatalogError::Invalid("image must not be empty".to_owned()));
    }
    Ok(())
}

fn validate_category_name(name: &str) -> Result<&str, CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::Invalid("name must not be empty".to_owned()));
    }
    Ok(name)
}

/// Trim carousel input; a blank title is stored as no title.
fn normalize_carousel(input: &NewCarousel) -> Result<NewCarousel, CatalogError> {
    let image = input.image.trim();
    if image.is_empty() {
        return Err(CatalogError::Invalid("image must not be empty".to_owned()));
    }
    let title = input
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_owned);
    Ok(NewCarousel {
        title,
        image: image.to_owned(),
    })
}
