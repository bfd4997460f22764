//! 响应缓存模块：有界、带过期时间的内存响应缓存。
//!
//! # Response Cache
//!
//! In-memory, per-process storage of successful responses.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`RequestKey`] | Deterministic identity of a request (url, method, canonical params) |
//! | [`CacheStore`] | Bounded key → value map with per-entry expiry |
//! | [`Reaper`] | Background task sweeping expired entries |
//!
//! ## Example
//!
//! ```rust
//! use request_manager::cache::{CacheStore, RequestKey};
//! use request_manager::Method;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let store = CacheStore::new(100, Duration::from_secs(300));
//! let key = RequestKey::build("/users", Method::Get, Some(&json!({"page": 1})));
//! store.set(key.clone(), "payload", Some(Duration::from_secs(30)));
//! assert_eq!(store.get(&key), Some("payload"));
//! ```
//!
//! ## Eviction
//!
//! When the store is full, inserting a new key evicts exactly one entry: the oldest
//! insertion still present. Reads never change that order.

mod key;
mod reaper;
mod store;

pub use key::{canonical_json, RequestKey};
pub use reaper::Reaper;
pub use store::{CacheEntry, CacheStats, CacheStore};
