//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::google::GoogleClient;
use crate::models::Product;
use crate::stripe::StripeClient;

/// TTL for the public product listing cache.
const PRODUCT_CACHE_TTL: Duration = Duration::from_secs(300); // 5 minutes

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    stripe: StripeClient,
    google: Option<GoogleClient>,
    product_cache: Cache<String, Arc<Vec<Product>>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: ServerConfig, pool: PgPool) -> Self {
        let stripe = StripeClient::new(&config.stripe);
        let google = config
            .google
            .as_ref()
            .map(|google_config| GoogleClient::new(google_config, &config.base_url));

        let product_cache = Cache::builder()
            .max_capacity(100)
            .time_to_live(PRODUCT_CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                stripe,
                google,
                product_cache,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the Stripe API client.
    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }

    /// Get the Google OAuth client, if federated login is configured.
    #[must_use]
    pub fn google(&self) -> Option<&GoogleClient> {
        self.inner.google.as_ref()
    }

    /// Get a reference to the product listing cache.
    #[must_use]
    pub fn product_cache(&self) -> &Cache<String, Arc<Vec<Product>>> {
        &self.inner.product_cache
    }

    /// Drop all cached product listings.
    ///
    /// Called after admin catalog writes so storefront reads never serve a
    /// stale price for longer than a request.
    pub fn invalidate_product_cache(&self) {
        self.inner.product_cache.invalidate_all();
    }
}
