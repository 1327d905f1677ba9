//! Domain models for the storefront.
//!
//! Row types that only exist to shape SQL results live next to their
//! queries in [`crate::db`]; the types here are what services and routes
//! pass around and serialize.

pub mod cart;
pub mod catalog;
pub mod review;
pub mod session;
pub mod user;

pub use cart::{Cart, CartItem, CartLine, CartProduct, CategoryName, NewCartItem, StockedItem};
pub use catalog::{
    Carousel, Category, LatestProduct, NewCarousel, NewProduct, Page, Product, ProductFilter,
    ProductWithCategory,
};
pub use review::{NewReview, Review, ReviewAuthor, ReviewProduct, ReviewWithAuthor, UserReview};
pub use session::{Caller, CurrentUser, NotOwner, keys as session_keys};
pub use user::{User, UserUpdate};
