//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `cart` - Cart engine (expiry sweep, quantities, totals)
//! - `checkout` - Checkout notification email
//! - `auth` - Password login and account updates
//! - `catalog` - Product/category listings and admin writes
//! - `reviews` - Product reviews

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod reviews;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService, CartTotals};
pub use catalog::{CatalogError, CatalogService, LatestProductsCache};
pub use checkout::{CheckoutError, CheckoutNotifier, CheckoutSnapshot, SmtpCheckoutNotifier};
pub use reviews::{ReviewError, ReviewService};
