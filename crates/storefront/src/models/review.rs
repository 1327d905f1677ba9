//! Review types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use toko_core::{ProductId, Rating, ReviewId, Slug, UserId};

/// A stored review.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub rating: Rating,
    /// HTML-escaped comment text.
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Reviewer shown next to a review.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewAuthor {
    pub name: String,
}

/// A review on a product page.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewWithAuthor {
    #[serde(flatten)]
    pub review: Review,
    pub user: ReviewAuthor,
}

/// Product shown next to one of the caller's reviews.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewProduct {
    pub id: ProductId,
    pub slug: Slug,
    pub name: String,
    pub image: String,
}

/// A review on the "my reviews" page.
#[derive(Debug, Clone, Serialize)]
pub struct UserReview {
    #[serde(flatten)]
    pub review: Review,
    pub product: ReviewProduct,
    pub user: ReviewAuthor,
}

/// Request body for posting a review.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub product_id: ProductId,
    pub rating: i32,
    pub comment: String,
}
