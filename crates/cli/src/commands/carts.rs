//! Cart maintenance commands.
//!
//! Reads already sweep a user's expired items; this removes the ones
//! belonging to users who never come back.

use toko_storefront::db::CartRepository;
use toko_storefront::services::CartService;
use toko_storefront::services::cart::DEFAULT_ITEM_TTL;

use super::{CommandError, connect};

/// Delete every expired cart item.
///
/// # Errors
///
/// Returns an error if the connection or the delete fails.
pub async fn purge_expired() -> Result<u64, CommandError> {
    let pool = connect().await?;
    let carts = CartService::new(CartRepository::new(&pool), DEFAULT_ITEM_TTL);
    Ok(carts.purge_expired().await?)
}
