//! Request key generation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::transport::Method;

/// Deterministic identity of a logical request, shared by dedup and caching.
///
/// Rendered as `"<METHOD> <url> <sha256>"`, where the digest covers a canonical
/// serialization of the params: object keys sorted recursively, no text post-processing.
/// Missing params, `null` and `{}` are the same request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn build(url: &str, method: Method, params: Option<&Value>) -> Self {
        let canonical = match params {
            None | Some(Value::Null) => "{}".to_string(),
            Some(value) => canonical_json(value),
        };
        let digest: String = Sha256::digest(canonical.as_bytes())
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        Self(format!("{} {} {}", method, url, digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RequestKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Serialize `value` with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identical_requests_share_a_key() {
        let a = RequestKey::build("/a", Method::Get, Some(&json!({"x": 1})));
        let b = RequestKey::build("/a", Method::Get, Some(&json!({"x": 1})));
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_params_differ() {
        let a = RequestKey::build("/a", Method::Get, Some(&json!({"x": 1})));
        let b = RequestKey::build("/a", Method::Get, Some(&json!({"x": 2})));
        assert_ne!(a, b);
    }

    #[test]
    fn test_method_is_part_of_the_key() {
        let get = RequestKey::build("/x", Method::Get, None);
        let post = RequestKey::build("/x", Method::Post, None);
        assert_ne!(get, post);
        assert!(get.as_str().starts_with("GET /x "));
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let a = serde_json::from_str::<Value>(r#"{"b": {"d": 1, "c": 2}, "a": [1, {"z": 0, "y": 1}]}"#).unwrap();
        let b = serde_json::from_str::<Value>(r#"{"a": [1, {"y": 1, "z": 0}], "b": {"c": 2, "d": 1}}"#).unwrap();
        assert_eq!(
            RequestKey::build("/q", Method::Post, Some(&a)),
            RequestKey::build("/q", Method::Post, Some(&b))
        );
    }

    #[test]
    fn test_quoting_does_not_collapse_keys() {
        // String "1" and number 1 are different requests.
        let text = RequestKey::build("/a", Method::Get, Some(&json!({"a": "1"})));
        let number = RequestKey::build("/a", Method::Get, Some(&json!({"a": 1})));
        assert_ne!(text, number);

        let quoted = RequestKey::build("/a", Method::Get, Some(&json!({"a": "x\"y"})));
        let plain = RequestKey::build("/a", Method::Get, Some(&json!({"a": "xy"})));
        assert_ne!(quoted, plain);
    }

    #[test]
    fn test_missing_null_and_empty_params_are_equivalent() {
        let none = RequestKey::build("/a", Method::Get, None);
        assert_eq!(none, RequestKey::build("/a", Method::Get, Some(&Value::Null)));
        assert_eq!(none, RequestKey::build("/a", Method::Get, Some(&json!({}))));
        assert_ne!(none, RequestKey::build("/a", Method::Get, Some(&json!([]))));
    }

    #[test]
    fn test_canonical_json_escapes_keys() {
        assert_eq!(canonical_json(&json!({"b\"": 1, "a": null})), r#"{"a":null,"b\"":1}"#);
    }
}
