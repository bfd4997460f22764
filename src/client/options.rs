//! Per-call options.

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::transport::{FilePart, Multipart};
use crate::Result;

/// Opt a request into response caching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Lifetime of the cached response; the manager's request cache TTL when `None`.
    pub ttl: Option<Duration>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl) }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub params: Option<Value>,
    pub cache: Option<CacheOptions>,
    /// Passed through to [`LoadingHook::start`](crate::hooks::LoadingHook::start).
    pub loading: Option<Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Serialize any `Serialize` value as params.
    pub fn serialize_params<T: Serialize>(mut self, params: &T) -> Result<Self> {
        self.params = Some(serde_json::to_value(params)?);
        Ok(self)
    }

    pub fn cache(mut self, cache: CacheOptions) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Shorthand for `cache(CacheOptions::ttl(ttl))`.
    pub fn cache_for(self, ttl: Duration) -> Self {
        self.cache(CacheOptions::ttl(ttl))
    }

    pub fn loading(mut self, metadata: Value) -> Self {
        self.loading = Some(metadata);
        self
    }
}

/// Transport-level extras that are not part of the request's identity params.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestExtras {
    pub multipart: Option<Multipart>,
    pub headers: Vec<(String, String)>,
}

impl RequestExtras {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn multipart(mut self, multipart: Multipart) -> Self {
        self.multipart = Some(multipart);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A file upload: one file plus flat text fields, sent as multipart/form-data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file: FilePart,
    pub data: Vec<(String, String)>,
    pub loading: Option<Value>,
}

impl Upload {
    pub fn new(param_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file: FilePart::new(param_name, content),
            data: Vec::new(),
            loading: None,
        }
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file = self.file.file_name(name);
        self
    }

    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.file = self.file.mime(mime);
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.push((name.into(), value.into()));
        self
    }

    pub fn loading(mut self, metadata: Value) -> Self {
        self.loading = Some(metadata);
        self
    }

    pub(crate) fn into_parts(self) -> (Multipart, Option<Value>) {
        let multipart = Multipart {
            file: Some(self.file),
            fields: self.data,
        };
        (multipart, self.loading)
    }
}
