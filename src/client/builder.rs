use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::info;

use crate::cache::{CacheStore, Reaper};
use crate::client::core::{Inner, RequestManager, Runtime};
use crate::client::pending::PendingTable;
use crate::config::{HttpConfig, ManagerConfig, Settings};
use crate::hooks::{Hooks, NoToken, TokenProvider};
use crate::transport::{HttpTransport, Transport};
use crate::{Error, ErrorContext, Result};

/// Builder for [`RequestManager`].
///
/// Either a ready [`Transport`] or an [`HttpConfig`] is required; with an `HttpConfig` an
/// [`HttpTransport`] is built using the configured token provider.
pub struct RequestManagerBuilder {
    config: ManagerConfig,
    http: Option<HttpConfig>,
    transport: Option<Arc<dyn Transport>>,
    token: Arc<dyn TokenProvider>,
    hooks: Hooks,
}

impl RequestManagerBuilder {
    pub fn new() -> Self {
        Self {
            config: ManagerConfig::default(),
            http: None,
            transport: None,
            token: Arc::new(NoToken),
            hooks: Hooks::default(),
        }
    }

    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn http_config(mut self, http: HttpConfig) -> Self {
        self.http = Some(http);
        self
    }

    /// Take both sections from a loaded settings file.
    pub fn settings(self, settings: Settings) -> Self {
        self.config(settings.manager).http_config(settings.http)
    }

    /// Use a custom transport instead of building an [`HttpTransport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn token_provider<T: TokenProvider + 'static>(mut self, token: T) -> Self {
        self.token = Arc::new(token);
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Build the manager and start the cache reaper on the current tokio runtime.
    pub fn build(self) -> Result<RequestManager> {
        self.config.validate()?;

        let transport: Arc<dyn Transport> = match (self.transport, self.http) {
            (Some(transport), _) => transport,
            (None, Some(http)) => {
                http.validate()?;
                Arc::new(HttpTransport::with_token_provider(&http, self.token)?)
            }
            (None, None) => {
                return Err(Error::configuration_with_context(
                    "either a transport or an http config is required",
                    ErrorContext::new().with_source("request_manager_builder"),
                ))
            }
        };

        let cache = Arc::new(CacheStore::new(self.config.max_size, self.config.default_ttl()));
        let reaper = Reaper::spawn(&cache, self.config.cleanup_interval())?;

        info!(
            transport = transport.name(),
            max_size = self.config.max_size,
            cleanup_interval_ms = self.config.cleanup_interval_ms,
            "request manager started"
        );

        Ok(RequestManager {
            inner: Arc::new(Inner {
                config: self.config,
                cache,
                pending: PendingTable::new(),
                runtime: ArcSwap::from_pointee(Runtime {
                    transport,
                    hooks: self.hooks,
                }),
            }),
            reaper: Arc::new(reaper),
        })
    }
}

impl Default for RequestManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
