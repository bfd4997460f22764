use arc_swap::ArcSwap;
use futures::future::{BoxFuture, Shared};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::cache::{CacheStats, CacheStore, Reaper, RequestKey};
use crate::client::pending::{PendingStats, PendingTable};
use crate::config::ManagerConfig;
use crate::error::RequestFailure;
use crate::hooks::Hooks;
use crate::transport::{Method, Transport};

/// What every caller joined onto one call receives.
pub type Outcome = Result<Arc<Value>, RequestFailure>;

pub(crate) type SharedOutcome = Shared<BoxFuture<'static, Outcome>>;

/// The replaceable part of a manager: transport plus hooks.
pub(crate) struct Runtime {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) hooks: Hooks,
}

pub(crate) struct Inner {
    pub(crate) config: ManagerConfig,
    pub(crate) cache: Arc<CacheStore<Arc<Value>>>,
    pub(crate) pending: PendingTable<SharedOutcome>,
    pub(crate) runtime: ArcSwap<Runtime>,
}

/// Coalesces identical in-flight requests, caches successful responses and applies the
/// hook set uniformly.
///
/// Cheap to clone; clones share all state. The cache reaper stops when
/// [`shutdown`](RequestManager::shutdown) is called or the last clone is dropped.
#[derive(Clone)]
pub struct RequestManager {
    pub(crate) inner: Arc<Inner>,
    pub(crate) reaper: Arc<Reaper>,
}

impl std::fmt::Debug for RequestManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestManager")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl RequestManager {
    pub fn builder() -> crate::client::builder::RequestManagerBuilder {
        crate::client::builder::RequestManagerBuilder::new()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    /// Replace transport and hooks for all subsequent calls.
    ///
    /// Calls already in flight finish with the set they started with. Cached responses and
    /// pending registrations are kept.
    pub fn reconfigure(&self, transport: Arc<dyn Transport>, hooks: Hooks) {
        info!(transport = transport.name(), "request manager reconfigured");
        self.inner.runtime.store(Arc::new(Runtime { transport, hooks }));
    }

    /// Replace only the hooks, keeping the current transport.
    pub fn set_hooks(&self, hooks: Hooks) {
        let transport = self.inner.runtime.load().transport.clone();
        self.reconfigure(transport, hooks);
    }

    /// Stop the periodic cache sweep. Requests keep working; expired entries are then
    /// only dropped when read.
    pub fn shutdown(&self) {
        if !self.reaper.is_cancelled() {
            info!("request manager shutting down cache reaper");
        }
        self.reaper.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.reaper.is_cancelled()
    }

    /// Key under which `execute(url, method, params)` is deduplicated and cached.
    pub fn cache_key(&self, url: &str, method: Method, params: Option<&Value>) -> RequestKey {
        let url = self.inner.runtime.load().hooks.url.transform(url);
        RequestKey::build(&url, method, params)
    }

    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    pub fn delete_cache(&self, key: &RequestKey) -> bool {
        self.inner.cache.delete(key)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Sweep expired entries now; returns how many were removed.
    pub fn cleanup(&self) -> usize {
        self.inner.cache.cleanup()
    }

    pub fn clear_pending(&self) {
        self.inner.pending.clear();
    }

    pub fn pending_stats(&self) -> PendingStats {
        self.inner.pending.stats()
    }
}
