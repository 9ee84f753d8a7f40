//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::services::email::Mailer;
use crate::services::stripe::StripeClient;
use crate::store::JsonStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the document store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: JsonStore,
    stripe: Option<StripeClient>,
    mailer: Option<Mailer>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The Stripe client and the mailer exist only when their credentials
    /// are configured; handlers degrade per endpoint when they are absent.
    #[must_use]
    pub fn new(config: ServerConfig, store: JsonStore) -> Self {
        let stripe = config.stripe.clone().map(StripeClient::new);
        let mailer = config.email.clone().map(Mailer::new);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                stripe,
                mailer,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the flat-file document store.
    #[must_use]
    pub fn store(&self) -> &JsonStore {
        &self.inner.store
    }

    /// Get the Stripe client, if payments are configured.
    #[must_use]
    pub fn stripe(&self) -> Option<&StripeClient> {
        self.inner.stripe.as_ref()
    }

    /// Get the mailer, if transactional email is configured.
    #[must_use]
    pub fn mailer(&self) -> Option<&Mailer> {
        self.inner.mailer.as_ref()
    }
}
