//! Method-specific entry points over [`RequestManager::execute`].

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::core::RequestManager;
use super::options::{RequestExtras, RequestOptions, Upload};
use crate::error::RawFailure;
use crate::transport::Method;
use crate::{Error, ErrorContext, Result};

impl RequestManager {
    pub async fn get<T: DeserializeOwned>(&self, url: &str, options: RequestOptions) -> Result<T> {
        self.call(url, Method::Get, options, RequestExtras::default()).await
    }

    pub async fn post<T: DeserializeOwned>(&self, url: &str, options: RequestOptions) -> Result<T> {
        self.call(url, Method::Post, options, RequestExtras::default()).await
    }

    pub async fn put<T: DeserializeOwned>(&self, url: &str, options: RequestOptions) -> Result<T> {
        self.call(url, Method::Put, options, RequestExtras::default()).await
    }

    /// DELETE sends its params as a query string, like GET.
    pub async fn delete<T: DeserializeOwned>(&self, url: &str, options: RequestOptions) -> Result<T> {
        self.call(url, Method::Delete, options, RequestExtras::default()).await
    }

    /// POST `sql` to the configured query endpoint and return the response's `records`.
    ///
    /// The statement is added to `options.params` under the configured query field; params,
    /// when given, must be a JSON object.
    pub async fn query<T: DeserializeOwned>(&self, sql: &str, mut options: RequestOptions) -> Result<Vec<T>> {
        let config = &self.inner.config;
        let mut params = match options.params.take() {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(Error::configuration_with_context(
                    "query params must be a JSON object",
                    ErrorContext::new()
                        .with_field_path("options.params")
                        .with_source("query"),
                ))
            }
        };
        params.insert(config.query_field.clone(), Value::String(sql.to_string()));

        let endpoint = config.query_endpoint.clone();
        let payload = self
            .execute(
                &endpoint,
                Method::Post,
                options.params(Value::Object(params)),
                RequestExtras::default(),
            )
            .await?;
        let records = payload
            .get("records")
            .ok_or_else(|| self.decode_failure(&endpoint, "response has no `records` field".to_string()))?;
        self.decode(&endpoint, records)
    }

    /// POST a multipart body built from the upload's file and fields.
    pub async fn upload<T: DeserializeOwned>(&self, url: &str, upload: Upload) -> Result<T> {
        let (multipart, loading) = upload.into_parts();
        let options = RequestOptions {
            loading,
            ..RequestOptions::default()
        };
        let extras = RequestExtras::new()
            .multipart(multipart)
            .header("Content-Type", "multipart/form-data");
        self.call(url, Method::Post, options, extras).await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        url: &str,
        method: Method,
        options: RequestOptions,
        extras: RequestExtras,
    ) -> Result<T> {
        let payload = self.execute(url, method, options, extras).await?;
        self.decode(url, &payload)
    }

    fn decode<T: DeserializeOwned>(&self, url: &str, payload: &Value) -> Result<T> {
        T::deserialize(payload)
            .map_err(|e| self.decode_failure(url, format!("unexpected response shape: {e}")))
    }

    fn decode_failure(&self, url: &str, message: String) -> Error {
        let runtime = self.inner.runtime.load();
        Error::Request(
            runtime
                .hooks
                .normalize(&RawFailure::decode(message).with_url(url)),
        )
    }
}
