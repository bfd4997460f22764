//! Basic usage example
//!
//! Fires two identical GETs concurrently (one network call), then serves a third from the
//! cache, and prints cache and pending statistics.
//!
//! The target server is configured via environment variables:
//! - REQUEST_MANAGER_BASE_URL (defaults to https://httpbin.org)
//! - API_TOKEN, sent as the `Authorization` header when set
//!
//! Usage:
//!   RUST_LOG=request_manager=debug cargo run --example basic_usage

use request_manager::hooks::Hooks;
use request_manager::{HttpConfig, ManagerConfig, RequestFailure, RequestManager, RequestOptions};
use serde_json::{json, Value};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let http = HttpConfig::new("https://httpbin.org").with_env_overrides();
    let hooks = Hooks::default().with_unauthorized(|failure: &RequestFailure| {
        eprintln!("session expired: {}", failure.message);
    });

    let manager = RequestManager::builder()
        .config(ManagerConfig::default().with_env_overrides())
        .http_config(http)
        .token_provider(|| std::env::var("API_TOKEN").ok())
        .hooks(hooks)
        .build()?;

    let options = || {
        RequestOptions::new()
            .params(json!({"page": 1, "size": 20}))
            .cache_for(Duration::from_secs(60))
    };

    let (a, b) = tokio::join!(
        manager.get::<Value>("/get", options()),
        manager.get::<Value>("/get", options()),
    );
    println!("first:  {}", a?["args"]);
    println!("second: {}", b?["args"]);

    let cached: Value = manager.get("/get", options()).await?;
    println!("cached: {}", cached["args"]);

    let stats = manager.cache_stats();
    println!("\ncache: {}/{} entries", stats.size, stats.max_size);
    for key in &stats.keys {
        println!("  {key}");
    }
    println!("pending: {}", manager.pending_stats().pending_count);

    manager.shutdown();
    Ok(())
}
