//! Transport layer: the capability that actually puts bytes on the wire.
//!
//! The request manager only depends on the [`Transport`] trait. [`HttpTransport`] is the
//! `reqwest`-backed implementation; tests and embedders can plug in their own.

mod http;
mod request;

pub use http::HttpTransport;
pub use request::{FilePart, Method, Multipart, RequestBody, TransportRequest, TransportResponse};

use async_trait::async_trait;

use crate::error::RawFailure;

/// Sends one request and reports the raw outcome.
///
/// Timeouts are the transport's responsibility; a timed-out call is reported as a failure
/// like any other.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;

    fn name(&self) -> &'static str {
        "custom"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No response was received.
    #[error("Network Error: {0}")]
    Network(String),

    /// A response arrived with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request could not be built; nothing was sent.
    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Convert into the raw failure handed to the error hook.
    pub fn into_raw(self) -> RawFailure {
        match self {
            TransportError::Network(message) => RawFailure::network(format!("Network Error: {message}")),
            TransportError::Status { status, message } => RawFailure::status(status, message),
            TransportError::Http(e) => match e.status() {
                Some(status) => RawFailure::status(status.as_u16(), e.to_string()),
                None if e.is_builder() => RawFailure::local(e.to_string()),
                None => RawFailure::network(format!("Network Error: {e}")),
            },
            TransportError::Other(message) => RawFailure::local(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn test_transport_error_classification() {
        let raw = TransportError::Network("connection refused".into()).into_raw();
        assert_eq!(raw.kind, FailureKind::Network);
        assert_eq!(raw.effective_status(), -1);
        assert!(raw.message.starts_with("Network Error"));

        let raw = TransportError::Status {
            status: 401,
            message: "Unauthorized".into(),
        }
        .into_raw();
        assert_eq!(raw.kind, FailureKind::Status);
        assert_eq!(raw.effective_status(), 401);
    }

    #[test]
    fn test_local_errors_are_not_network_failures() {
        let raw = TransportError::Other("relative url '/users' requires a base_url".into()).into_raw();
        assert_eq!(raw.kind, FailureKind::Local);
        assert_eq!(raw.effective_status(), 500);
    }
}
