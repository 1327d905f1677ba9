//! Toko Core - Shared domain types.
//!
//! This crate provides the types used by every Toko component:
//! - `storefront` - Storefront and admin JSON API (cart, catalog, reviews, checkout)
//! - `cli` - Command-line tools for migrations and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no mail transport. Database encoding is available behind the
//! `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, rupiah prices, emails, roles, slugs and ratings

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
