//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use mistore_db::models::Category;

use crate::config::StorefrontConfig;
use crate::routes::home::HomeBlock;

/// How long catalog reads are served from memory.
const CATALOG_TTL: Duration = Duration::from_secs(60);

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
    categories: Cache<(), Arc<Vec<Category>>>,
    home: Cache<(), Arc<Vec<HomeBlock>>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                categories: Cache::builder()
                    .max_capacity(1)
                    .time_to_live(CATALOG_TTL)
                    .build(),
                home: Cache::builder()
                    .max_capacity(1)
                    .time_to_live(CATALOG_TTL)
                    .build(),
            }),
        }
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

    /// Cached category list.
    #[must_use]
    pub fn category_cache(&self) -> &Cache<(), Arc<Vec<Category>>> {
        &self.inner.categories
    }

    /// Cached home page blocks.
    #[must_use]
    pub fn home_cache(&self) -> &Cache<(), Arc<Vec<HomeBlock>>> {
        &self.inner.home
    }
}
