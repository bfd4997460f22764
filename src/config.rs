//! Configuration for the request manager and its HTTP transport.
//!
//! Both structs deserialize from YAML with every field defaulted, and accept
//! `REQUEST_MANAGER_*` environment overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, ErrorContext, Result};

/// Upper bound for TTLs and the sweep interval: ten years.
pub const MAX_DURATION_MS: u64 = 10 * 365 * 24 * 60 * 60 * 1000;

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Cache, reaper and convenience-endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Maximum number of cached responses.
    pub max_size: usize,
    /// TTL applied by the cache store when none is given.
    pub default_ttl_ms: u64,
    /// TTL for requests that opt into caching without choosing one.
    pub request_cache_ttl_ms: u64,
    /// Interval of the periodic expired-entry sweep.
    pub cleanup_interval_ms: u64,
    pub query_endpoint: String,
    pub query_field: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            default_ttl_ms: 5 * 60 * 1000,
            request_cache_ttl_ms: 30_000,
            cleanup_interval_ms: 10_000,
            query_endpoint: "/query.json".to_string(),
            query_field: "sqlCode".to_string(),
        }
    }
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_ms = duration_ms(ttl);
        self
    }

    pub fn with_request_cache_ttl(mut self, ttl: Duration) -> Self {
        self.request_cache_ttl_ms = duration_ms(ttl);
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval_ms = duration_ms(interval);
        self
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    pub fn request_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.request_cache_ttl_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    /// Apply `REQUEST_MANAGER_MAX_SIZE`, `REQUEST_MANAGER_DEFAULT_TTL_MS` and
    /// `REQUEST_MANAGER_CLEANUP_INTERVAL_MS` when set and parseable.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse("REQUEST_MANAGER_MAX_SIZE") {
            self.max_size = v;
        }
        if let Some(v) = env_parse("REQUEST_MANAGER_DEFAULT_TTL_MS") {
            self.default_ttl_ms = v;
        }
        if let Some(v) = env_parse("REQUEST_MANAGER_CLEANUP_INTERVAL_MS") {
            self.cleanup_interval_ms = v;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, msg: &str| -> Result<()> {
            Err(Error::configuration_with_context(
                msg,
                ErrorContext::new()
                    .with_field_path(format!("manager.{field}"))
                    .with_source("config"),
            ))
        };
        if self.max_size == 0 {
            return invalid("max_size", "max_size must be at least 1");
        }
        if self.default_ttl_ms == 0 {
            return invalid("default_ttl_ms", "default_ttl_ms must be positive");
        }
        if self.request_cache_ttl_ms == 0 {
            return invalid("request_cache_ttl_ms", "request_cache_ttl_ms must be positive");
        }
        if self.cleanup_interval_ms == 0 {
            return invalid("cleanup_interval_ms", "cleanup_interval_ms must be positive");
        }
        for (field, value) in [
            ("default_ttl_ms", self.default_ttl_ms),
            ("request_cache_ttl_ms", self.request_cache_ttl_ms),
            ("cleanup_interval_ms", self.cleanup_interval_ms),
        ] {
            if value > MAX_DURATION_MS {
                return invalid(field, &format!("{field} must be at most {MAX_DURATION_MS}"));
            }
        }
        if self.query_field.is_empty() {
            return invalid("query_field", "query_field must not be empty");
        }
        Ok(())
    }
}

/// Settings for [`HttpTransport`](crate::transport::HttpTransport).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Header the auth token is sent under.
    pub token_name: String,
    /// Headers sent with every request.
    pub headers: BTreeMap<String, String>,
    pub proxy_url: Option<String>,
    pub pool_max_idle_per_host: usize,
    /// Keep and resend cookies.
    pub with_credentials: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(
            "Content-Type".to_string(),
            "application/json;charset=utf-8".to_string(),
        );
        headers.insert("Accept".to_string(), "application/json".to_string());
        Self {
            base_url: String::new(),
            timeout_secs: 30,
            token_name: "Authorization".to_string(),
            headers,
            proxy_url: None,
            pool_max_idle_per_host: 32,
            with_credentials: true,
        }
    }
}

impl HttpConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_token_name(mut self, name: impl Into<String>) -> Self {
        self.token_name = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Apply `REQUEST_MANAGER_BASE_URL`, `REQUEST_MANAGER_HTTP_TIMEOUT_SECS` and
    /// `REQUEST_MANAGER_PROXY_URL` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(base_url) = env::var("REQUEST_MANAGER_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(v) = env_parse("REQUEST_MANAGER_HTTP_TIMEOUT_SECS") {
            self.timeout_secs = v;
        }
        if let Ok(proxy_url) = env::var("REQUEST_MANAGER_PROXY_URL") {
            self.proxy_url = Some(proxy_url);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(Error::configuration_with_context(
                "timeout_secs must be positive",
                ErrorContext::new()
                    .with_field_path("http.timeout_secs")
                    .with_source("config"),
            ));
        }
        if self.token_name.is_empty() {
            return Err(Error::configuration_with_context(
                "token_name must not be empty",
                ErrorContext::new()
                    .with_field_path("http.token_name")
                    .with_source("config"),
            ));
        }
        Ok(())
    }
}

/// Top-level settings file: `manager:` and `http:` sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub manager: ManagerConfig,
    pub http: HttpConfig,
}

impl Settings {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn with_env_overrides(self) -> Self {
        Self {
            manager: self.manager.with_env_overrides(),
            http: self.http.with_env_overrides(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.manager.validate()?;
        self.http.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.max_size, 100);
        assert_eq!(config.default_ttl(), Duration::from_secs(300));
        assert_eq!(config.request_cache_ttl(), Duration::from_secs(30));
        assert_eq!(config.cleanup_interval(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_sections_keep_defaults() {
        let settings = Settings::from_yaml_str(
            r#"
manager:
  max_size: 2
  cleanup_interval_ms: 500
http:
  base_url: "https://api.example.com"
  token_name: "X-Token"
"#,
        )
        .unwrap();
        assert_eq!(settings.manager.max_size, 2);
        assert_eq!(settings.manager.default_ttl_ms, 300_000);
        assert_eq!(settings.manager.cleanup_interval_ms, 500);
        assert_eq!(settings.http.base_url, "https://api.example.com");
        assert_eq!(settings.http.token_name, "X-Token");
        assert_eq!(settings.http.timeout_secs, 30);
        assert_eq!(
            settings.http.headers.get("Accept").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn test_oversized_durations_saturate_and_are_rejected() {
        let config = ManagerConfig::default().with_default_ttl(Duration::MAX);
        assert_eq!(config.default_ttl_ms, u64::MAX);
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("manager.default_ttl_ms")
        );

        let err = Settings::from_yaml_str("manager:\n  request_cache_ttl_ms: 18446744073709551615\n")
            .unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("manager.request_cache_ttl_ms")
        );

        let config = ManagerConfig::default().with_cleanup_interval(Duration::from_millis(MAX_DURATION_MS));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_yaml_values_are_rejected() {
        let err = Settings::from_yaml_str("manager:\n  max_size: 0\n").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("manager.max_size")
        );

        let err = Settings::from_yaml_str("manager: [1, 2]").unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }
}
