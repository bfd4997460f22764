//! Cross-cutting hooks applied uniformly to every request.
//!
//! Each hook is a small strategy trait with a fixed contract. Closures implement the
//! single-method traits directly, so simple policies need no extra types:
//!
//! ```rust
//! use request_manager::hooks::Hooks;
//! use request_manager::RequestFailure;
//!
//! let hooks = Hooks::default()
//!     .with_url_transform(|url: &str| format!("/api{url}"))
//!     .with_unauthorized(|failure: &RequestFailure| eprintln!("logged out: {}", failure.message));
//! ```

use serde_json::Value;
use std::sync::Arc;

use crate::error::{RawFailure, RequestFailure};
use crate::transport::TransportResponse;

/// Paired lifecycle signal around every logical request.
///
/// `end` is called exactly once for every `start`, on every exit path.
pub trait LoadingHook: Send + Sync {
    fn start(&self, metadata: Option<&Value>);
    fn end(&self);
}

/// Decides whether a 2xx response is a success and extracts its payload.
pub trait ResponseHandler: Send + Sync {
    /// Reject a transport-level success that carries an application-level failure.
    fn check(&self, response: &TransportResponse) -> Result<(), RawFailure>;

    /// Pull the usable payload out of a checked response.
    fn extract(&self, response: TransportResponse) -> Result<Value, RawFailure>;
}

/// Normalizes a raw failure into the shape callers see.
pub trait ErrorHook: Send + Sync {
    fn on_error(&self, failure: &RawFailure) -> RequestFailure;
}

/// Side effect for failures normalized to status 401.
pub trait UnauthorizedHook: Send + Sync {
    fn on_unauthorized(&self, failure: &RequestFailure);
}

/// Rewrites a URL before it is keyed and sent.
pub trait UrlTransform: Send + Sync {
    fn transform(&self, url: &str) -> String;
}

/// Supplies the auth token attached by the transport.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

impl<F> ErrorHook for F
where
    F: Fn(&RawFailure) -> RequestFailure + Send + Sync,
{
    fn on_error(&self, failure: &RawFailure) -> RequestFailure {
        self(failure)
    }
}

impl<F> UnauthorizedHook for F
where
    F: Fn(&RequestFailure) + Send + Sync,
{
    fn on_unauthorized(&self, failure: &RequestFailure) {
        self(failure)
    }
}

impl<F> UrlTransform for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn transform(&self, url: &str) -> String {
        self(url)
    }
}

impl<F> TokenProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// Loading hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLoading;

impl LoadingHook for NoLoading {
    fn start(&self, _: Option<&Value>) {}
    fn end(&self) {}
}

/// Loading hook built from two closures.
pub struct FnLoading<S, E> {
    start: S,
    end: E,
}

impl<S, E> FnLoading<S, E>
where
    S: Fn(Option<&Value>) + Send + Sync,
    E: Fn() + Send + Sync,
{
    pub fn new(start: S, end: E) -> Self {
        Self { start, end }
    }
}

impl<S, E> LoadingHook for FnLoading<S, E>
where
    S: Fn(Option<&Value>) + Send + Sync,
    E: Fn() + Send + Sync,
{
    fn start(&self, metadata: Option<&Value>) {
        (self.start)(metadata)
    }

    fn end(&self) {
        (self.end)()
    }
}

/// Accepts every response the transport let through and returns the whole body.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl ResponseHandler for PassThrough {
    fn check(&self, _: &TransportResponse) -> Result<(), RawFailure> {
        Ok(())
    }

    fn extract(&self, response: TransportResponse) -> Result<Value, RawFailure> {
        Ok(response.body)
    }
}

/// Handler for `{ code, message, data }` style envelopes.
///
/// A response is a failure when `code_field` is present and not one of `success_codes`,
/// or when `success_field` is present and `false`. The payload is `data_field`.
#[derive(Debug, Clone)]
pub struct EnvelopeHandler {
    pub code_field: String,
    pub success_codes: Vec<Value>,
    pub success_field: String,
    pub message_field: String,
    pub data_field: String,
}

impl Default for EnvelopeHandler {
    fn default() -> Self {
        Self {
            code_field: "code".to_string(),
            success_codes: vec![Value::from(0), Value::from(200), Value::from("0"), Value::from("200")],
            success_field: "success".to_string(),
            message_field: "message".to_string(),
            data_field: "data".to_string(),
        }
    }
}

impl EnvelopeHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_field(mut self, field: impl Into<String>) -> Self {
        self.data_field = field.into();
        self
    }

    pub fn with_success_codes(mut self, codes: Vec<Value>) -> Self {
        self.success_codes = codes;
        self
    }

    fn failure_message(&self, body: &Value) -> String {
        body.get(&self.message_field)
            .and_then(Value::as_str)
            .unwrap_or("application error")
            .to_string()
    }
}

impl ResponseHandler for EnvelopeHandler {
    fn check(&self, response: &TransportResponse) -> Result<(), RawFailure> {
        let body = &response.body;
        if let Some(code) = body.get(&self.code_field) {
            if !self.success_codes.contains(code) {
                // A numeric code that looks like an HTTP status is reported as one, so a
                // 401 envelope still reaches the unauthorized hook.
                let status = code
                    .as_u64()
                    .or_else(|| code.as_str().and_then(|s| s.parse().ok()))
                    .filter(|c| (100..600).contains(c))
                    .map(|c| c as u16);
                let failure = RawFailure::application(self.failure_message(body));
                return Err(match status {
                    Some(status) => failure.with_status(status),
                    None => failure,
                });
            }
        }
        if body.get(&self.success_field).and_then(Value::as_bool) == Some(false) {
            return Err(RawFailure::application(self.failure_message(body)));
        }
        Ok(())
    }

    fn extract(&self, mut response: TransportResponse) -> Result<Value, RawFailure> {
        match response.body.get_mut(&self.data_field) {
            Some(data) => Ok(data.take()),
            None => Err(RawFailure::decode(format!(
                "response has no `{}` field",
                self.data_field
            ))
            .with_status(response.status)),
        }
    }
}

/// Formats the message with the request URL and status.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorHook;

impl ErrorHook for DefaultErrorHook {
    fn on_error(&self, failure: &RawFailure) -> RequestFailure {
        let status = failure.effective_status();
        RequestFailure::new(
            status,
            format!("{} (request: {}, status: {})", failure.message, failure.url, status),
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoUnauthorized;

impl UnauthorizedHook for NoUnauthorized {
    fn on_unauthorized(&self, _: &RequestFailure) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityUrl;

impl UrlTransform for IdentityUrl {
    fn transform(&self, url: &str) -> String {
        url.to_string()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

impl TokenProvider for NoToken {
    fn token(&self) -> Option<String> {
        None
    }
}

/// The active hook set.
#[derive(Clone)]
pub struct Hooks {
    pub loading: Arc<dyn LoadingHook>,
    pub response: Arc<dyn ResponseHandler>,
    pub error: Arc<dyn ErrorHook>,
    pub unauthorized: Arc<dyn UnauthorizedHook>,
    pub url: Arc<dyn UrlTransform>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            loading: Arc::new(NoLoading),
            response: Arc::new(PassThrough),
            error: Arc::new(DefaultErrorHook),
            unauthorized: Arc::new(NoUnauthorized),
            url: Arc::new(IdentityUrl),
        }
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loading<H: LoadingHook + 'static>(mut self, hook: H) -> Self {
        self.loading = Arc::new(hook);
        self
    }

    pub fn with_response_handler<H: ResponseHandler + 'static>(mut self, handler: H) -> Self {
        self.response = Arc::new(handler);
        self
    }

    pub fn with_error<H: ErrorHook + 'static>(mut self, hook: H) -> Self {
        self.error = Arc::new(hook);
        self
    }

    pub fn with_unauthorized<H: UnauthorizedHook + 'static>(mut self, hook: H) -> Self {
        self.unauthorized = Arc::new(hook);
        self
    }

    pub fn with_url_transform<H: UrlTransform + 'static>(mut self, hook: H) -> Self {
        self.url = Arc::new(hook);
        self
    }

    /// Normalize a raw failure, firing the unauthorized hook for 401s.
    pub(crate) fn normalize(&self, failure: &RawFailure) -> RequestFailure {
        let normalized = self.error.on_error(failure);
        tracing::warn!(
            status = normalized.status,
            kind = ?failure.kind,
            url = %failure.url,
            "request failed: {}",
            normalized.message
        );
        if normalized.is_unauthorized() {
            self.unauthorized.on_unauthorized(&normalized);
        }
        normalized
    }
}

/// Calls [`LoadingHook::end`] when dropped.
pub(crate) struct LoadingGuard {
    hook: Arc<dyn LoadingHook>,
}

impl LoadingGuard {
    pub(crate) fn start(hook: Arc<dyn LoadingHook>, metadata: Option<&Value>) -> Self {
        hook.start(metadata);
        Self { hook }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.hook.end();
    }
}
