//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::DarshanConfig;
use crate::storage::MediaStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the database pool and the media store.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: DarshanConfig,
    pool: PgPool,
    media: MediaStore,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: DarshanConfig, pool: PgPool) -> Self {
        let media = MediaStore::new(config.media_root.clone(), &config.base_url);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                media,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &DarshanConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the media store.
    #[must_use]
    pub fn media(&self) -> &MediaStore {
        &self.inner.media
    }
}
