//! Router-level tests: health, middleware headers and auth rejections.
//!
//! Every request here is answered before a database connection is needed;
//! without a session cookie the session store is never queried.

#![allow(clippy::unwrap_used)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;

use toko_integration_tests::lazy_state;

fn router() -> Router {
    toko_storefront::app(lazy_state())
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = router().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_responses_carry_security_headers_and_request_id() {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "edge-1234")
        .body(Body::empty())
        .unwrap();
    let response = router().oneshot(request).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-request-id").unwrap(), "edge-1234");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
}

#[tokio::test]
async fn test_cart_requires_login() {
    let response = router().oneshot(get("/api/cart/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Authentication required");

    let response = router().oneshot(get("/api/cart/1/totals")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cart_writes_require_login() {
    let add = post_json("/api/cart", r#"{"product_id": 1, "quantity": 1}"#);
    let response = router().oneshot(add).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let remove = Request::builder()
        .method("DELETE")
        .uri("/api/cart/7")
        .body(Body::empty())
        .unwrap();
    let response = router().oneshot(remove).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_checkout_requires_login() {
    let checkout = post_json(
        "/api/checkout",
        r#"{"discount": 0, "shipping_fee": 2000, "total": 27000}"#,
    );
    let response = router().oneshot(checkout).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_requires_login() {
    let response = router().oneshot(get("/api/admin/users")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let create = post_json("/api/admin/categories", r#"{"name": "Kopi"}"#);
    let response = router().oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_carousel_admin_requires_login() {
    let response = router().oneshot(get("/api/admin/carousels")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let create = post_json("/api/admin/carousels", r#"{"image": "banner.jpg"}"#);
    let response = router().oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let remove = Request::builder()
        .method("DELETE")
        .uri("/api/admin/carousels/3")
        .body(Body::empty())
        .unwrap();
    let response = router().oneshot(remove).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validates_before_touching_the_database() {
    let bad_email = post_json(
        "/api/auth/register",
        r#"{"name": "Budi", "email": "bukan-email", "password": "rahasia123"}"#,
    );
    let response = router().oneshot(bad_email).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid email address");

    let short_password = post_json(
        "/api/auth/register",
        r#"{"name": "Budi", "email": "budi@example.com", "password": "pendek"}"#,
    );
    let response = router().oneshot(short_password).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = router().oneshot(get("/api/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
