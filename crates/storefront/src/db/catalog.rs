//! Product, category and carousel repository.

use sqlx::PgPool;

use toko_core::{CarouselId, CategoryId, ProductId};

use super::{RepositoryError, count_to_u64};
use crate::models::{
    Carousel, Category, LatestProduct, NewCarousel, NewProduct, Page, Product, ProductFilter,
    ProductWithCategory,
};

const PRODUCT_COLUMNS: &str = "p.id, p.slug, p.name, p.price, p.stock, p.description, \
     p.image, p.video, p.category_id, c.name AS category, p.created_at";

// `$1` is the name search, `$2` the exact category name; NULL disables either.
const PRODUCT_FILTER: &str = "FROM products p \
     JOIN categories c ON c.id = p.category_id \
     WHERE ($1::text IS NULL OR strpos(lower(p.name), lower($1)) > 0) \
       AND ($2::text IS NULL OR c.name = $2)";

/// Repository for catalog database operations.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List one page of products matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
        page: Page,
    ) -> Result<Vec<ProductWithCategory>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} {PRODUCT_FILTER} \
             ORDER BY p.created_at DESC, p.id DESC LIMIT $3 OFFSET $4"
        );
        let products = sqlx::query_as::<_, ProductWithCategory>(&sql)
            .bind(filter.search.as_deref())
            .bind(filter.category.as_deref())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        Ok(products)
    }

    /// Count all products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_products(&self, filter: &ProductFilter) -> Result<u64, RepositoryError> {
        let sql = format!("SELECT COUNT(*) {PRODUCT_FILTER}");
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(filter.search.as_deref())
            .bind(filter.category.as_deref())
            .fetch_one(self.pool)
            .await?;

        count_to_u64(count)
    }

    /// Names of the categories that have at least one product matching
    /// `filter`, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn displayed_categories(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<String>, RepositoryError> {
        let sql = format!("SELECT DISTINCT c.name {PRODUCT_FILTER} ORDER BY c.name");
        let names = sqlx::query_scalar(&sql)
            .bind(filter.search.as_deref())
            .bind(filter.category.as_deref())
            .fetch_all(self.pool)
            .await?;

        Ok(names)
    }

    /// The `limit` most recently created products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_products(&self, limit: i64) -> Result<Vec<LatestProduct>, RepositoryError> {
        let products = sqlx::query_as::<_, LatestProduct>(
            r"
            SELECT id, name, slug, price, image
            FROM products
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Get a product by its slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProductWithCategory>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             JOIN categories c ON c.id = p.category_id WHERE p.slug = $1"
        );
        let product = sqlx::query_as::<_, ProductWithCategory>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;

        Ok(product)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_product(&self, input: &NewProduct) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(
            r"
            INSERT INTO products (slug, name, price, stock, description, image, video, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, slug, name, price, stock, description, image, video,
                      category_id, created_at
            ",
        )
        .bind(input.slug())
        .bind(&input.name)
        .bind(input.price)
        .bind(input.stock)
        .bind(&input.description)
        .bind(&input.image)
        .bind(input.video.as_deref())
        .bind(input.category_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "product slug"))
    }

    /// Replace a product's fields, re-deriving its slug from the new name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product or category does not exist.
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_product(
        &self,
        id: ProductId,
        input: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(
            r"
            UPDATE products
            SET slug = $2, name = $3, price = $4, stock = $5, description = $6,
                image = $7, video = $8, category_id = $9
            WHERE id = $1
            RETURNING id, slug, name, price, stock, description, image, video,
                      category_id, created_at
            ",
        )
        .bind(id)
        .bind(input.slug())
        .bind(&input.name)
        .bind(input.price)
        .bind(input.stock)
        .bind(&input.description)
        .bind(&input.image)
        .bind(input.video.as_deref())
        .bind(input.category_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "product slug"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// List one page of categories by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self, page: Page) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name FROM categories ORDER BY name, id LIMIT $1 OFFSET $2",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// Count all categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_categories(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(self.pool)
            .await?;

        count_to_u64(count)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_category(&self, name: &str) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>("INSERT INTO categories (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, "category"))
    }

    /// Rename a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if the name is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn rename_category(
        &self,
        id: CategoryId,
        name: &str,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "category"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// List one page of carousel slides, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_carousels(&self, page: Page) -> Result<Vec<Carousel>, RepositoryError> {
        let carousels = sqlx::query_as::<_, Carousel>(
            r"
            SELECT id, title, image, created_at
            FROM carousels
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok(carousels)
    }

    /// Count all carousel slides.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_carousels(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM carousels")
            .fetch_one(self.pool)
            .await?;

        count_to_u64(count)
    }

    /// Create a carousel slide.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_carousel(&self, input: &NewCarousel) -> Result<Carousel, RepositoryError> {
        let carousel = sqlx::query_as::<_, Carousel>(
            r"
            INSERT INTO carousels (title, image)
            VALUES ($1, $2)
            RETURNING id, title, image, created_at
            ",
        )
        .bind(input.title.as_deref())
        .bind(&input.image)
        .fetch_one(self.pool)
        .await?;

        Ok(carousel)
    }

    /// Delete a carousel slide. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_carousel(&self, id: CarouselId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM carousels WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
