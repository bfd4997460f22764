//! 请求执行逻辑：缓存短路、在途请求合并与单次传输调用。
//!
//! Request execution: cache short-circuit, in-flight coalescing and the single transport
//! call behind them.

use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, Instrument};
use uuid::Uuid;

use super::core::{Inner, Outcome, RequestManager, Runtime, SharedOutcome};
use super::options::{RequestExtras, RequestOptions};
use super::pending::Slot;
use crate::cache::RequestKey;
use crate::error::RawFailure;
use crate::hooks::LoadingGuard;
use crate::transport::{Method, TransportRequest};
use crate::{Error, Result};

impl RequestManager {
    /// Run one logical request.
    ///
    /// In order: rewrite the URL, key the request, signal loading start, serve from cache
    /// when `options.cache` is set and a live entry exists, join an identical in-flight call
    /// if there is one, otherwise issue exactly one transport call. Every caller joined onto
    /// a call receives the same payload (the same `Arc`) or the same normalized failure.
    /// Loading end fires for every caller on every path.
    pub async fn execute(
        &self,
        url: &str,
        method: Method,
        options: RequestOptions,
        extras: RequestExtras,
    ) -> Result<Arc<Value>> {
        self.execute_outcome(url, method, options, extras)
            .await
            .map_err(Error::Request)
    }

    async fn execute_outcome(
        &self,
        url: &str,
        method: Method,
        options: RequestOptions,
        extras: RequestExtras,
    ) -> Outcome {
        let runtime = self.inner.runtime.load_full();
        let url = runtime.hooks.url.transform(url);
        // Uploads are identified by their form content rather than by params.
        let key = match &extras.multipart {
            Some(multipart) => RequestKey::build(&url, method, Some(&multipart.fingerprint())),
            None => RequestKey::build(&url, method, options.params.as_ref()),
        };

        let _loading = LoadingGuard::start(runtime.hooks.loading.clone(), options.loading.as_ref());

        if options.cache.is_some() {
            if let Some(hit) = self.inner.cache.get(&key) {
                debug!(key = %key, "served from cache");
                return Ok(hit);
            }
        }

        let (tx, rx) = oneshot::channel::<Outcome>();
        let candidate: SharedOutcome = {
            let runtime = runtime.clone();
            let url = url.clone();
            rx.map(move |received| {
                received.unwrap_or_else(|_| {
                    Err(runtime.hooks.normalize(
                        &RawFailure::aborted("request task ended before settling").with_url(url),
                    ))
                })
            })
            .boxed()
            .shared()
        };

        match self.inner.pending.join_or_insert(key.clone(), candidate) {
            Slot::Joined(outcome) => {
                debug!(key = %key, "joined in-flight request");
                outcome.await
            }
            Slot::Inserted { id, outcome } => {
                let cache_ttl = options
                    .cache
                    .map(|cache| cache.ttl.unwrap_or_else(|| self.inner.config.request_cache_ttl()));
                let request = TransportRequest::new(url.clone(), method)
                    .with_payload(options.params, extras.multipart)
                    .with_headers(extras.headers);
                let span = tracing::debug_span!(
                    "request",
                    method = %method,
                    url = %url,
                    request_id = %Uuid::new_v4()
                );
                let call = Call {
                    inner: self.inner.clone(),
                    runtime,
                    key,
                    id,
                    cache_ttl,
                };
                tokio::spawn(call.run(request, tx).instrument(span));
                outcome.await
            }
        }
    }
}

/// The single transport call behind one pending registration.
struct Call {
    inner: Arc<Inner>,
    runtime: Arc<Runtime>,
    key: RequestKey,
    id: u64,
    cache_ttl: Option<Duration>,
}

impl Call {
    async fn run(self, request: TransportRequest, tx: oneshot::Sender<Outcome>) {
        // Drops on every exit, unwinding included.
        let release = PendingRelease {
            inner: self.inner.clone(),
            key: self.key.clone(),
            id: self.id,
        };
        debug!(key = %self.key, "dispatching transport call");

        let url = request.url.clone();
        let response = self.runtime.transport.send(request).await;
        let handler = &self.runtime.hooks.response;
        let extracted = match response {
            Ok(response) => handler
                .check(&response)
                .and_then(|()| handler.extract(response)),
            Err(e) => Err(e.into_raw()),
        };

        let outcome = match extracted {
            Ok(payload) => {
                let payload = Arc::new(payload);
                // Cache before releasing the pending entry so a new caller always finds one
                // of the two.
                if let Some(ttl) = self.cache_ttl {
                    self.inner.cache.set(self.key.clone(), payload.clone(), Some(ttl));
                }
                Ok(payload)
            }
            Err(raw) => Err(self.runtime.hooks.normalize(&raw.with_url(url))),
        };

        drop(release);
        let _ = tx.send(outcome);
    }
}

struct PendingRelease {
    inner: Arc<Inner>,
    key: RequestKey,
    id: u64,
}

impl Drop for PendingRelease {
    fn drop(&mut self) {
        if !self.inner.pending.release(&self.key, self.id) {
            debug!(key = %self.key, "pending entry already cleared");
        }
    }
}
