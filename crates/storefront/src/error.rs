//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Error bodies are JSON: `{"error": "<message>"}`, with extra fields where
//! the client needs them (e.g. `available` for stock rejections).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::NotOwner;
use crate::services::{
    AuthError, CartError, CatalogError, CheckoutError, ReviewError,
};

/// Shown to shoppers when a quantity exceeds stock.
pub const QUANTITY_REJECTED: &str = "Gagal mengubah kuantitas";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication or account operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout verification or email delivery failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Review operation failed.
    #[error("Review error: {0}")]
    Review(#[from] ReviewError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<NotOwner> for AppError {
    fn from(err: NotOwner) -> Self {
        Self::Unauthorized(err.to_string())
    }
}

const INTERNAL: &str = "Internal server error";

impl AppError {
    /// Status code, client-facing message, and optional extra body fields.
    ///
    /// Internal details never reach the message.
    fn parts(&self) -> (StatusCode, String, Option<Value>) {
        let internal = || (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string(), None);

        match self {
            Self::Database(_) | Self::Internal(_) => internal(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string(), None)
                }
                AuthError::UserNotFound => {
                    (StatusCode::NOT_FOUND, "User not found".to_string(), None)
                }
                AuthError::UserAlreadyExists => (
                    StatusCode::CONFLICT,
                    "An account with this email already exists".to_string(),
                    None,
                ),
                AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
                AuthError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, "Invalid email address".to_string(), None)
                }
                AuthError::MissingField(_) => (StatusCode::BAD_REQUEST, err.to_string(), None),
                AuthError::Forbidden => (StatusCode::FORBIDDEN, err.to_string(), None),
                AuthError::Repository(_) | AuthError::PasswordHash => internal(),
            },
            Self::Cart(err) => match err {
                CartError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, err.to_string(), None),
                CartError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string(), None),
                CartError::InvalidQuantity(_) => (StatusCode::BAD_REQUEST, err.to_string(), None),
                CartError::QuantityExceedsStock {
                    requested,
                    available,
                } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    QUANTITY_REJECTED.to_string(),
                    Some(json!({ "requested": requested, "available": available })),
                ),
                CartError::Repository(_) => internal(),
            },
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart
                | CheckoutError::NegativeAmount(_)
                | CheckoutError::AmountOutOfRange => {
                    (StatusCode::UNPROCESSABLE_ENTITY, err.to_string(), None)
                }
                CheckoutError::TotalMismatch { expected, .. } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Total does not match the cart".to_string(),
                    Some(json!({ "expected": expected })),
                ),
                CheckoutError::SendFailed => {
                    (StatusCode::BAD_GATEWAY, err.to_string(), None)
                }
                CheckoutError::Template(_)
                | CheckoutError::InvalidAddress(_)
                | CheckoutError::MessageBuild(_)
                | CheckoutError::Smtp(_) => internal(),
            },
            Self::Catalog(err) => match err {
                CatalogError::Invalid(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
                CatalogError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string(), None),
                CatalogError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone(), None),
                CatalogError::Repository(_) | CatalogError::CacheFill(_) => internal(),
            },
            Self::Review(err) => match err {
                ReviewError::NoReviews | ReviewError::ProductNotFound | ReviewError::NotFound => {
                    (StatusCode::NOT_FOUND, err.to_string(), None)
                }
                ReviewError::InvalidRating(_) | ReviewError::InvalidComment => {
                    (StatusCode::BAD_REQUEST, err.to_string(), None)
                }
                ReviewError::Repository(_) => internal(),
            },
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, extra) = self.parts();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let mut body = json!({ "error": message });
        if let (Some(Value::Object(fields)), Value::Object(target)) = (extra, &mut body) {
            target.extend(fields);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("navigation", "Viewed product page", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use toko_core::RatingError;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn body_json(err: AppError) -> Value {
        let bytes = to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_domain_error_status_codes() {
        assert_eq!(get_status(CartError::NotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(CartError::Unauthorized(NotOwner).into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(CheckoutError::SendFailed.into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(CheckoutError::EmptyCart.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(CheckoutError::AmountOutOfRange.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(CatalogError::Conflict("product slug already exists".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(ReviewError::InvalidRating(RatingError { got: 9 }).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(AuthError::Forbidden.into()), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(RepositoryError::NotFound.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_stock_rejection_body() {
        let body = body_json(
            CartError::QuantityExceedsStock {
                requested: 9,
                available: 4,
            }
            .into(),
        )
        .await;
        assert_eq!(body["error"], QUANTITY_REJECTED);
        assert_eq!(body["available"], 4);
        assert_eq!(body["requested"], 9);
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let body = body_json(AppError::Internal("pool exhausted on db-1".to_string())).await;
        assert_eq!(body["error"], INTERNAL);
    }

    #[tokio::test]
    async fn test_no_reviews_message() {
        let body = body_json(ReviewError::NoReviews.into()).await;
        assert_eq!(body["error"], "No reviews found for this product");
    }
}
