//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use url::Url;

use crate::config::StorefrontConfig;
use crate::db::PgStore;
use crate::payments::StripeClient;
use crate::services::reconcile;

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid base_url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: PgStore,
    payments: StripeClient,
}

impl AppState {
    /// Create application state from configuration and a database pool.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let base_url = Url::parse(&config.base_url)?;
        let payments = StripeClient::new(config.stripe.secret_key.clone(), base_url);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store: PgStore::new(pool),
                payments,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database-backed store.
    #[must_use]
    pub fn store(&self) -> &PgStore {
        &self.inner.store
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        self.inner.store.pool()
    }

    /// Get a reference to the payment gateway client.
    #[must_use]
    pub fn payments(&self) -> &StripeClient {
        &self.inner.payments
    }

    /// Spawn the stale-order reconciliation sweep as a background task.
    pub fn spawn_reconciliation(&self) {
        let store = self.inner.store.clone();
        let interval = self.inner.config.reconcile_interval;
        let ttl = self.inner.config.pending_order_ttl;
        tokio::spawn(reconcile::run(store, interval, ttl));
    }
}
