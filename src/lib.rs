//! # request-manager
//!
//! 客户端请求编排层：在途请求合并、有界 TTL 响应缓存与统一的请求钩子。
//!
//! Client-side request orchestration over an HTTP transport.
//!
//! ## Overview
//!
//! For every logical request, identified by URL, method and canonical params, the
//! [`RequestManager`] guarantees that:
//!
//! - identical in-flight requests are coalesced into one transport call,
//! - successful responses can be cached for a bounded time in a bounded store,
//! - cross-cutting hooks (auth token, loading signal, success validation, payload
//!   extraction, error normalization, 401 handling, URL rewriting) apply uniformly.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use request_manager::{HttpConfig, RequestManager, RequestOptions};
//! use serde_json::{json, Value};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> request_manager::Result<()> {
//!     let manager = RequestManager::builder()
//!         .http_config(HttpConfig::new("https://api.example.com"))
//!         .token_provider(|| std::env::var("API_TOKEN").ok())
//!         .build()?;
//!
//!     let users: Value = manager
//!         .get(
//!             "/users",
//!             RequestOptions::new()
//!                 .params(json!({"page": 1}))
//!                 .cache_for(Duration::from_secs(60)),
//!         )
//!         .await?;
//!     println!("{users}");
//!
//!     manager.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Request manager, per-call options, pending table |
//! | [`cache`] | Request keys, bounded TTL store, periodic reaper |
//! | [`hooks`] | Strategy traits for cross-cutting concerns |
//! | [`transport`] | Transport trait and the `reqwest` implementation |
//! | [`config`] | YAML/env configuration |

pub mod cache;
pub mod client;
pub mod config;
pub mod hooks;
pub mod transport;

/// Error type for the library
pub mod error;

pub use cache::{CacheStats, RequestKey};
pub use client::{
    CacheOptions, PendingStats, RequestExtras, RequestManager, RequestManagerBuilder,
    RequestOptions, Upload,
};
pub use config::{HttpConfig, ManagerConfig, Settings};
pub use error::{Error, ErrorContext, FailureKind, RawFailure, RequestFailure};
pub use hooks::Hooks;
pub use transport::{HttpTransport, Method, Transport, TransportRequest, TransportResponse};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
