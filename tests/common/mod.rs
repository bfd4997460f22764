//! Shared fixtures: a recording transport and counting hooks.

#![allow(dead_code)]

use async_trait::async_trait;
use request_manager::hooks::{FnLoading, Hooks};
use request_manager::transport::TransportError;
use request_manager::{RequestFailure, RequestManager, Transport, TransportRequest, TransportResponse};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = dyn Fn(&TransportRequest, usize) -> Result<TransportResponse, TransportError> + Send + Sync;

/// Transport that records every request, waits `delay`, then answers via `respond`.
pub struct MockTransport {
    calls: AtomicUsize,
    requests: Mutex<Vec<TransportRequest>>,
    delay: Duration,
    respond: Box<Responder>,
}

impl MockTransport {
    pub fn new<F>(delay: Duration, respond: F) -> Arc<Self>
    where
        F: Fn(&TransportRequest, usize) -> Result<TransportResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            delay,
            respond: Box::new(respond),
        })
    }

    /// Answers every call with `body`.
    pub fn ok(delay: Duration, body: Value) -> Arc<Self> {
        Self::new(delay, move |_, _| Ok(TransportResponse::ok(body.clone())))
    }

    /// Answers every call with `{"call": n}`, n counting from 1.
    pub fn counting(delay: Duration) -> Arc<Self> {
        Self::new(delay, |_, n| Ok(TransportResponse::ok(serde_json::json!({ "call": n }))))
    }

    pub fn failing(delay: Duration, status: u16, message: &str) -> Arc<Self> {
        let message = message.to_string();
        Self::new(delay, move |_, _| {
            Err(TransportError::Status {
                status,
                message: message.clone(),
            })
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());
        tokio::time::sleep(self.delay).await;
        (self.respond)(&request, n)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Counters behind the loading and unauthorized hooks.
#[derive(Default)]
pub struct HookCounters {
    pub loading_started: AtomicUsize,
    pub loading_ended: AtomicUsize,
    pub unauthorized: AtomicUsize,
}

impl HookCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn started(&self) -> usize {
        self.loading_started.load(Ordering::SeqCst)
    }

    pub fn ended(&self) -> usize {
        self.loading_ended.load(Ordering::SeqCst)
    }

    pub fn unauthorized(&self) -> usize {
        self.unauthorized.load(Ordering::SeqCst)
    }

    pub fn hooks(self: &Arc<Self>) -> Hooks {
        let (start, end, unauthorized) = (self.clone(), self.clone(), self.clone());
        Hooks::default()
            .with_loading(FnLoading::new(
                move |_: Option<&Value>| {
                    start.loading_started.fetch_add(1, Ordering::SeqCst);
                },
                move || {
                    end.loading_ended.fetch_add(1, Ordering::SeqCst);
                },
            ))
            .with_unauthorized(move |_: &RequestFailure| {
                unauthorized.unauthorized.fetch_add(1, Ordering::SeqCst);
            })
    }
}

pub fn manager(transport: Arc<MockTransport>, hooks: Hooks) -> RequestManager {
    RequestManager::builder()
        .transport(transport)
        .hooks(hooks)
        .build()
        .expect("manager should build")
}
