//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::CartRepository;
use crate::services::catalog::LatestProductsCache;
use crate::services::checkout::{CheckoutError, SmtpCheckoutNotifier};
use crate::services::{CartService, CatalogService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    notifier: Option<SmtpCheckoutNotifier>,
    latest_products: LatestProductsCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if SMTP is configured but the transport cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, CheckoutError> {
        let notifier = match &config.email {
            Some(email) => Some(SmtpCheckoutNotifier::from_config(email)?),
            None => {
                tracing::warn!("SMTP_HOST not set; checkout emails are disabled");
                None
            }
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                notifier,
                latest_products: LatestProductsCache::default(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The checkout notifier, if SMTP is configured.
    #[must_use]
    pub fn notifier(&self) -> Option<&SmtpCheckoutNotifier> {
        self.inner.notifier.as_ref()
    }

    /// A cart engine over the database.
    #[must_use]
    pub fn cart(&self) -> CartService<CartRepository<'_>> {
        CartService::new(
            CartRepository::new(&self.inner.pool),
            self.inner.config.cart_item_ttl,
        )
    }

    /// A catalog service sharing the latest-products cache.
    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(&self.inner.pool, &self.inner.latest_products)
    }
}
