use serde::Serialize;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "manager.max_size")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "config", "builder")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The normalized outcome of a failed request.
///
/// Every failure path (network, HTTP status, application envelope, payload decoding) is
/// funneled through the [`ErrorHook`](crate::hooks::ErrorHook) into this shape before it
/// reaches a caller. It is `Clone` because all callers joined onto one in-flight request
/// observe the same failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("request failed (status {status}): {message}")]
pub struct RequestFailure {
    pub status: i32,
    pub message: String,
}

impl RequestFailure {
    /// Status used when no HTTP status was ever received.
    pub const NETWORK_STATUS: i32 = -1;

    pub fn new(status: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn is_network(&self) -> bool {
        self.status == Self::NETWORK_STATUS
    }
}

/// Where a raw failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The transport never produced a response (connect error, timeout, DNS, ...).
    Network,
    /// The transport produced a non-2xx response.
    Status,
    /// The request could not be built on this side (bad URL, bad multipart part, ...).
    Local,
    /// The response handler rejected a 2xx response.
    Application,
    /// The payload could not be extracted or converted to the caller's type.
    Decode,
    /// The task driving the request went away before it settled.
    Aborted,
}

/// A failure before normalization. Input to [`ErrorHook::on_error`](crate::hooks::ErrorHook::on_error).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFailure {
    pub kind: FailureKind,
    pub url: String,
    pub status: Option<u16>,
    pub message: String,
}

impl RawFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            url: String::new(),
            status: None,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Network, message)
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Status, message).with_status(status)
    }

    pub fn local(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Local, message)
    }

    pub fn application(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Application, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Decode, message)
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Aborted, message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Status reported to callers: the HTTP status when there is one, `-1` for network
    /// failures and `500` for everything else.
    pub fn effective_status(&self) -> i32 {
        match (self.kind, self.status) {
            (_, Some(status)) => i32::from(status),
            (FailureKind::Network, None) => RequestFailure::NETWORK_STATUS,
            (_, None) => 500,
        }
    }
}

/// Unified error type for the request manager.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Request error: {0}")]
    Request(#[from] RequestFailure),

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    /// The normalized failure, when this error came out of a request.
    pub fn as_request_failure(&self) -> Option<&RequestFailure> {
        match self {
            Error::Request(failure) => Some(failure),
            _ => None,
        }
    }

    /// HTTP-like status of a request failure.
    pub fn status(&self) -> Option<i32> {
        self.as_request_failure().map(|f| f.status)
    }
}
