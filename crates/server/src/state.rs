//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::Store;
use crate::services::{
    AccountService, CatalogService, NotificationDispatcher, OrderService, TokenService,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the persistence gateway and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn Store>,
    tokens: TokenService,
    notifications: NotificationDispatcher,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `store` - Persistence gateway, constructed once by the caller
    /// * `notifications` - Dispatcher for detached email delivery
    #[must_use]
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn Store>,
        notifications: NotificationDispatcher,
    ) -> Self {
        let tokens = TokenService::new(&config.auth);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                tokens,
                notifications,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the persistence gateway.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Get a reference to the bearer token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Get a reference to the notification dispatcher.
    #[must_use]
    pub fn notifications(&self) -> &NotificationDispatcher {
        &self.inner.notifications
    }

    /// Account service scoped to this state.
    #[must_use]
    pub fn accounts(&self) -> AccountService<'_> {
        AccountService::new(
            self.store(),
            self.notifications(),
            self.config().verification_code_ttl,
        )
    }

    /// Catalog service scoped to this state.
    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(self.store(), self.config().policy)
    }

    /// Order service scoped to this state.
    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(self.store())
    }
}
