use crate::config::HttpConfig;
use crate::hooks::{NoToken, TokenProvider};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Proxy;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::request::{Method, Multipart, RequestBody, TransportRequest, TransportResponse};
use super::{Transport, TransportError};

/// `reqwest`-backed transport.
///
/// Relative URLs are joined onto `base_url`. The auth token, when the provider yields one,
/// is attached under `token_name` on every request.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token_name: String,
    token: Arc<dyn TokenProvider>,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Self::with_token_provider(config, Arc::new(NoToken))
    }

    pub fn with_token_provider(config: &HttpConfig, token: Arc<dyn TokenProvider>) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid header name: {e}"),
                    ErrorContext::new()
                        .with_field_path(format!("http.headers.{name}"))
                        .with_source("http_transport"),
                )
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid header value: {e}"),
                    ErrorContext::new()
                        .with_field_path(format!("http.headers.{name}"))
                        .with_source("http_transport"),
                )
            })?;
            default_headers.insert(header_name, header_value);
        }

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .default_headers(default_headers)
            .cookie_store(config.with_credentials);

        if let Some(proxy_url) = &config.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid proxy url '{proxy_url}': {e}"),
                    ErrorContext::new()
                        .with_field_path("http.proxy_url")
                        .with_source("http_transport"),
                )
            })?;
            builder = builder.proxy(proxy);
        } else {
            builder = builder.no_proxy();
        }

        let client = builder.build().map_err(|e| {
            Error::configuration_with_context(
                format!("failed to build HTTP client: {e}"),
                ErrorContext::new().with_source("http_transport"),
            )
        })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            token_name: config.token_name.clone(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through; relative ones are appended to the base URL.
    fn resolve(&self, url: &str) -> std::result::Result<Url, TransportError> {
        if let Ok(absolute) = Url::parse(url) {
            return Ok(absolute);
        }
        if self.base_url.is_empty() {
            return Err(TransportError::Other(format!(
                "relative url '{url}' requires a base_url"
            )));
        }
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| TransportError::Other(format!("invalid url '{joined}': {e}")))
    }

    fn multipart_form(multipart: Multipart) -> std::result::Result<reqwest::multipart::Form, TransportError> {
        let mut form = reqwest::multipart::Form::new();
        if let Some(file) = multipart.file {
            let mut part = reqwest::multipart::Part::bytes(file.content.to_vec());
            if let Some(name) = file.file_name {
                part = part.file_name(name);
            }
            if let Some(mime) = file.mime {
                part = part
                    .mime_str(&mime)
                    .map_err(|e| TransportError::Other(format!("invalid mime type: {e}")))?;
            }
            form = form.part(file.param_name, part);
        }
        for (name, value) in multipart.fields {
            form = form.text(name, value);
        }
        Ok(form)
    }

    fn classify(e: reqwest::Error) -> TransportError {
        if e.is_connect() || e.is_timeout() {
            TransportError::Network(e.to_string())
        } else {
            TransportError::Http(e)
        }
    }
}

/// Flatten params into query pairs: arrays repeat as `key[]`, nested objects are sent as
/// JSON text, nulls are dropped.
pub(crate) fn query_pairs(params: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = params else {
        return Vec::new();
    };
    let mut pairs = Vec::new();
    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = scalar_text(item) {
                        pairs.push((format!("{key}[]"), text));
                    }
                }
            }
            other => {
                if let Some(text) = scalar_text(other) {
                    pairs.push((key.clone(), text));
                }
            }
        }
    }
    pairs
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

fn body_message(body: &Value, fallback: &str) -> String {
    ["message", "msg", "error"]
        .iter()
        .find_map(|field| body.get(*field).and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> std::result::Result<TransportResponse, TransportError> {
        let url = self.resolve(&request.url)?;
        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };

        if let Some(token) = self.token.token() {
            builder = builder.header(self.token_name.as_str(), token);
        }

        let is_multipart = matches!(request.body, RequestBody::Multipart(_));
        for (name, value) in &request.headers {
            // reqwest writes the multipart content type itself, boundary included.
            if is_multipart && name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(query) = &request.query {
            builder = builder.query(&query_pairs(query));
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Multipart(multipart) => builder.multipart(Self::multipart_form(multipart)?),
        };

        let response = builder.send().await.map_err(Self::classify)?;
        let status = response.status();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let bytes = response.bytes().await.map_err(Self::classify)?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: body_message(&body, status.canonical_reason().unwrap_or("request failed")),
            });
        }

        Ok(TransportResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
