//! Review repository.

use sqlx::PgPool;

use toko_core::{ProductId, Rating, ReviewId, Slug, UserId};

use super::RepositoryError;
use crate::models::{Review, ReviewAuthor, ReviewProduct, ReviewWithAuthor, UserReview};

/// Review joined with its author and product.
#[derive(sqlx::FromRow)]
struct ReviewRow {
    #[sqlx(flatten)]
    review: Review,
    author_name: String,
    product_slug: Slug,
    product_name: String,
    product_image: String,
}

const REVIEW_SELECT: &str = "SELECT r.id, r.user_id, r.product_id, r.rating, r.comment, \
            r.created_at, u.name AS author_name, p.slug AS product_slug, \
            p.name AS product_name, p.image AS product_image \
     FROM reviews r \
     JOIN users u ON u.id = r.user_id \
     JOIN products p ON p.id = r.product_id";

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reviews of a product with their authors, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ReviewWithAuthor>, RepositoryError> {
        let sql = format!(
            "{REVIEW_SELECT} WHERE r.product_id = $1 ORDER BY r.created_at DESC, r.id DESC"
        );
        let rows = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(product_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ReviewWithAuthor {
                review: row.review,
                user: ReviewAuthor {
                    name: row.author_name,
                },
            })
            .collect())
    }

    /// A user's own reviews with the reviewed products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<UserReview>, RepositoryError> {
        let sql = format!(
            "{REVIEW_SELECT} WHERE r.user_id = $1 ORDER BY r.created_at DESC, r.id DESC"
        );
        let rows = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| UserReview {
                product: ReviewProduct {
                    id: row.review.product_id,
                    slug: row.product_slug,
                    name: row.product_name,
                    image: row.product_image,
                },
                user: ReviewAuthor {
                    name: row.author_name,
                },
                review: row.review,
            })
            .collect())
    }

    /// Store a review. `comment` must already be escaped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product or user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        user_id: UserId,
        product_id: ProductId,
        rating: Rating,
        comment: &str,
    ) -> Result<Review, RepositoryError> {
        sqlx::query_as::<_, Review>(
            r"
            INSERT INTO reviews (user_id, product_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, product_id, rating, comment, created_at
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "review"))
    }

    /// Delete a review. With `owner` set, only that user's review matches.
    ///
    /// Returns whether a review was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(
        &self,
        id: ReviewId,
        owner: Option<UserId>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM reviews WHERE id = $1 AND ($2::int IS NULL OR user_id = $2)",
        )
        .bind(id)
        .bind(owner)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
