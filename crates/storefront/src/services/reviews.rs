//! Review service.
//!
//! Comments are stored HTML-escaped; the author is always the caller.

use std::fmt;

use askama::filters::{Escaper, Html, escape};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use toko_core::{ProductId, Rating, RatingError, ReviewId};

use crate::db::{RepositoryError, ReviewRepository};
use crate::models::{Caller, NewReview, Review, ReviewWithAuthor, UserReview};

/// Longest accepted comment, in characters, before escaping.
pub const MAX_COMMENT_CHARS: usize = 2_000;

/// Errors that can occur during review operations.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// The product has no reviews yet.
    #[error("No reviews found for this product")]
    NoReviews,

    /// Rating outside 1..=5.
    #[error(transparent)]
    InvalidRating(#[from] RatingError),

    /// Comment is blank or too long.
    #[error("comment must be between 1 and {MAX_COMMENT_CHARS} characters")]
    InvalidComment,

    /// The reviewed product doesn't exist.
    #[error("product not found")]
    ProductNotFound,

    /// No review matched for deletion.
    #[error("review not found")]
    NotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Review service.
pub struct ReviewService<'a> {
    reviews: ReviewRepository<'a>,
}

impl<'a> ReviewService<'a> {
    /// Create a new review service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            reviews: ReviewRepository::new(pool),
        }
    }

    /// Reviews of a product with their authors.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::NoReviews` if the product has none.
    pub async fn for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ReviewWithAuthor>, ReviewError> {
        let reviews = self.reviews.list_for_product(product_id).await?;
        if reviews.is_empty() {
            return Err(ReviewError::NoReviews);
        }
        Ok(reviews)
    }

    /// The caller's own reviews.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Repository` if the query fails.
    pub async fn mine(&self, caller: &Caller) -> Result<Vec<UserReview>, ReviewError> {
        Ok(self.reviews.list_for_user(caller.user_id).await?)
    }

    /// Post a review as the caller.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::InvalidRating` or `ReviewError::InvalidComment`
    /// for bad input, `ReviewError::ProductNotFound` for an unknown product.
    #[instrument(skip(self, caller, input), fields(caller = %caller.user_id, product_id = %input.product_id))]
    pub async fn create(&self, caller: &Caller, input: &NewReview) -> Result<Review, ReviewError> {
        let (rating, comment) = validate_review(input)?;

        let review = self
            .reviews
            .create(caller.user_id, input.product_id, rating, &comment)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ReviewError::ProductNotFound,
                other => ReviewError::Repository(other),
            })?;

        tracing::info!(review_id = %review.id, "Review created");
        Ok(review)
    }

    /// Delete a review. Admins may delete any review, others only their own.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::NotFound` if nothing matched.
    #[instrument(skip(self, caller), fields(caller = %caller.user_id))]
    pub async fn delete(&self, caller: &Caller, id: ReviewId) -> Result<(), ReviewError> {
        let owner = (!caller.is_admin()).then_some(caller.user_id);
        if self.reviews.delete(id, owner).await? {
            Ok(())
        } else {
            Err(ReviewError::NotFound)
        }
    }
}

/// Check a submitted review and produce the rating and escaped comment.
///
/// # Errors
///
/// Returns `ReviewError::InvalidRating` or `ReviewError::InvalidComment`.
pub fn validate_review(input: &NewReview) -> Result<(Rating, String), ReviewError> {
    let rating = Rating::new(input.rating)?;

    let comment = input.comment.trim();
    if comment.is_empty() || comment.chars().count() > MAX_COMMENT_CHARS {
        return Err(ReviewError::InvalidComment);
    }

    Ok((rating, html_escape(comment)))
}

/// askama's HTML escaper, extended to also escape `/` and `` ` ``.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommentEscaper;

impl Escaper for CommentEscaper {
    fn write_escaped_str<W: fmt::Write>(&self, mut dest: W, string: &str) -> fmt::Result {
        let mut rest = string;
        while let Some(pos) = rest.find(['/', '`']) {
            let (plain, tail) = rest.split_at(pos);
            Html.write_escaped_str(&mut dest, plain)?;
            let mut chars = tail.chars();
            match chars.next() {
                Some('/') => dest.write_str("&#x2F;")?,
                Some('`') => dest.write_str("&#96;")?,
                _ => {}
            }
            rest = chars.as_str();
        }
        Html.write_escaped_str(dest, rest)
    }
}

/// Escape a comment for storage.
#[must_use]
pub fn html_escape(s: &str) -> String {
    match escape(s, CommentEscaper) {
        Ok(escaped) => escaped.to_string(),
        Err(never) => match never {},
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn review(rating: i32, comment: &str) -> NewReview {
        NewReview {
            product_id: ProductId::new(1),
            rating,
            comment: comment.to_owned(),
        }
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<script>alert("x")</script> & 'y'"#),
            "&#60;script&#62;alert(&#34;x&#34;)&#60;&#x2F;script&#62; &#38; &#39;y&#39;"
        );
        assert_eq!(html_escape("enak sekali"), "enak sekali");
    }

    #[test]
    fn test_html_escape_slash_and_backtick() {
        assert_eq!(html_escape("a/b `c`"), "a&#x2F;b &#96;c&#96;");
        assert_eq!(html_escape("//"), "&#x2F;&#x2F;");
        assert_eq!(html_escape("kopi`"), "kopi&#96;");
    }

    #[test]
    fn test_escape_ampersand_first() {
        assert_eq!(html_escape("&lt;"), "&#38;lt;");
    }

    #[test]
    fn test_validate_review_escapes_comment() {
        let (rating, comment) = validate_review(&review(5, " <b>mantap</b> ")).unwrap();
        assert_eq!(rating.get(), 5);
        assert_eq!(comment, "&#60;b&#62;mantap&#60;&#x2F;b&#62;");
    }

    #[test]
    fn test_validate_review_rejects_rating_out_of_range() {
        assert!(matches!(
            validate_review(&review(0, "ok")),
            Err(ReviewError::InvalidRating(_))
        ));
        assert!(matches!(
            validate_review(&review(6, "ok")),
            Err(ReviewError::InvalidRating(_))
        ));
    }

    #[test]
    fn test_validate_review_rejects_blank_or_long_comment() {
        assert!(matches!(
            validate_review(&review(4, "   ")),
            Err(ReviewError::InvalidComment)
        ));
        let long = "a".repeat(MAX_COMMENT_CHARS + 1);
        assert!(matches!(
            validate_review(&review(4, &long)),
            Err(ReviewError::InvalidComment)
        ));
    }
}
