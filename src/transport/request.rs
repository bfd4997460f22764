//! Transport-agnostic request/response shapes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// HTTP methods the request manager issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// GET and DELETE send their params as a query string; POST and PUT send a body.
    pub fn has_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file attached to a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub param_name: String,
    pub file_name: Option<String>,
    pub mime: Option<String>,
    pub content: Bytes,
}

impl FilePart {
    pub fn new(param_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            param_name: param_name.into(),
            file_name: None,
            mime: None,
            content: content.into(),
        }
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// A multipart/form-data payload: an optional file plus flat text fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Multipart {
    pub file: Option<FilePart>,
    pub fields: Vec<(String, String)>,
}

impl Multipart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, file: FilePart) -> Self {
        self.file = Some(file);
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Structural identity of the payload, used in place of params when keying uploads.
    ///
    /// File content enters as a SHA-256 digest so large uploads stay cheap to key.
    pub fn fingerprint(&self) -> Value {
        let mut fields: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (name, value) in &self.fields {
            fields.entry(name.as_str()).or_default().push(value.as_str());
        }
        let file = self.file.as_ref().map(|file| {
            let digest: String = Sha256::digest(&file.content)
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect();
            json!({
                "param": file.param_name,
                "name": file.file_name,
                "mime": file.mime,
                "sha256": digest,
            })
        });
        json!({ "multipart": { "fields": fields, "file": file } })
    }
}

/// Body of an outgoing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(Multipart),
}

/// One call handed to a [`Transport`](super::Transport).
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub url: String,
    pub method: Method,
    pub query: Option<Value>,
    pub body: RequestBody,
    pub headers: Vec<(String, String)>,
}

impl TransportRequest {
    pub fn new(url: impl Into<String>, method: Method) -> Self {
        Self {
            url: url.into(),
            method,
            query: None,
            body: RequestBody::Empty,
            headers: Vec::new(),
        }
    }

    /// Route `params` and `multipart` the way the method expects: query string for GET and
    /// DELETE, multipart body (preferred) or JSON body for POST and PUT.
    pub fn with_payload(mut self, params: Option<Value>, multipart: Option<Multipart>) -> Self {
        if self.method.has_body() {
            self.body = match (multipart, params) {
                (Some(multipart), _) => RequestBody::Multipart(multipart),
                (None, Some(params)) => RequestBody::Json(params),
                (None, None) => RequestBody::Empty,
            };
        } else {
            self.query = params;
        }
        self
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response as seen by the response handler.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl TransportResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body,
        }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_delete_route_params_to_query() {
        for method in [Method::Get, Method::Delete] {
            let req = TransportRequest::new("/items", method).with_payload(Some(json!({"id": 1})), None);
            assert_eq!(req.query, Some(json!({"id": 1})));
            assert_eq!(req.body, RequestBody::Empty);
        }
    }

    #[test]
    fn test_multipart_wins_over_params_for_body() {
        let form = Multipart::new().field("a", "1");
        let req = TransportRequest::new("/upload", Method::Post)
            .with_payload(Some(json!({"ignored": true})), Some(form.clone()));
        assert_eq!(req.body, RequestBody::Multipart(form));
        assert!(req.query.is_none());

        let req = TransportRequest::new("/items", Method::Put).with_payload(Some(json!([1, 2])), None);
        assert_eq!(req.body, RequestBody::Json(json!([1, 2])));
    }

    #[test]
    fn test_fingerprint_tracks_file_content() {
        let a = Multipart::new()
            .file(FilePart::new("file", &b"hello"[..]).file_name("a.txt"))
            .field("folder", "docs");
        let b = Multipart::new()
            .file(FilePart::new("file", &b"hello!"[..]).file_name("a.txt"))
            .field("folder", "docs");
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = TransportRequest::new("/x", Method::Get)
            .with_headers(vec![("Content-Type".into(), "multipart/form-data".into())]);
        assert_eq!(req.header("content-type"), Some("multipart/form-data"));
        assert_eq!(req.header("accept"), None);
    }
}
