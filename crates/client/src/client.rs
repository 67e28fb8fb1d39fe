//! Bazaar REST API client.
//!
//! Owns the HTTP connection pool, the bearer token and the query cache.
//! Endpoint methods live in [`crate::api`]; this module only knows how to
//! send an [`ApiRequest`] and unwrap the response envelope.

use std::sync::Arc;

use bazaar_core::{ErrorResponse, PageMeta};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::cache::QueryCache;
use crate::config::ClientConfig;
use crate::error::{ApiError, FALLBACK_MESSAGE};
use crate::http::{ApiRequest, RequestBody};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Bazaar API client.
///
/// Cloning is cheap; clones share the token and the cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<SecretString>>,
    cache: QueryCache,
}

/// A successful response with its envelope unwrapped.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub data: Value,
    pub message: Option<String>,
    pub meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default = "default_true")]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    meta: Option<PageMeta>,
}

const fn default_true() -> bool {
    true
}

impl ApiClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            "bazaar-client/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http: builder.build()?,
                base_url: config.api_url.clone(),
                token: RwLock::new(config.api_token.clone()),
                cache: QueryCache::new(config.cache_capacity, config.cache_ttl),
            }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    // =========================================================================
    // Token
    // =========================================================================

    /// Use `token` for subsequent requests.
    pub async fn set_token(&self, token: SecretString) {
        *self.inner.token.write().await = Some(token);
    }

    pub async fn clear_token(&self) {
        *self.inner.token.write().await = None;
    }

    pub async fn has_token(&self) -> bool {
        self.inner.token.read().await.is_some()
    }

    async fn authorization(&self) -> Result<Option<HeaderValue>, ApiError> {
        let token = self.inner.token.read().await;
        token
            .as_ref()
            .map(|t| {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", t.expose_secret()))
                    .map_err(|_| {
                        ApiError::InvalidRequest("token contains invalid characters".to_string())
                    })?;
                value.set_sensitive(true);
                Ok(value)
            })
            .transpose()
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Resolve a request path and query against the base URL.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRequest` if the result is not a valid URL.
    pub fn url_for(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        let path = request.path.trim_start_matches('/');
        let mut url = Url::parse(&format!("{base}/{path}"))
            .map_err(|e| ApiError::InvalidRequest(format!("invalid URL for {path}: {e}")))?;

        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Send a request and unwrap the `{success, message, data, meta}` envelope.
    ///
    /// A 401 response also clears the stored token, so the caller ends up
    /// signed out.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server reports failure.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        let url = self.url_for(&request)?;
        let request_id = Uuid::new_v4();

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), url)
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if let Some(auth) = self.authorization().await? {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(payload) => builder.multipart(payload.into_form()?),
        };

        let response = builder.send().await?;
        let status = response.status();
        debug!(%request_id, status = status.as_u16(), "API response");

        let bytes = response.bytes().await?;

        if status.is_success() {
            return decode_envelope(status, &bytes);
        }

        let message = error_message(&bytes);
        match status {
            StatusCode::UNAUTHORIZED => {
                warn!(%request_id, "Token rejected; signing out");
                self.clear_token().await;
                Err(ApiError::Unauthorized(
                    message.unwrap_or_else(|| "Please log in again".to_string()),
                ))
            }
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(
                message.unwrap_or_else(|| "Not found".to_string()),
            )),
            _ => {
                let field_errors = serde_json::from_slice::<ErrorResponse>(&bytes)
                    .map(|e| e.error_messages)
                    .unwrap_or_default();
                if status.is_server_error() {
                    warn!(%request_id, status = status.as_u16(), "API server error");
                }
                Err(ApiError::Server {
                    status: status.as_u16(),
                    message: message.unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
                    field_errors,
                })
            }
        }
    }
}

fn decode_envelope(status: StatusCode, bytes: &[u8]) -> Result<RawResponse, ApiError> {
    if bytes.is_empty() {
        return Ok(RawResponse {
            data: Value::Null,
            message: None,
            meta: None,
        });
    }

    let envelope: Envelope = serde_json::from_slice(bytes)?;
    if !envelope.success {
        let field_errors = serde_json::from_slice::<ErrorResponse>(bytes)
            .map(|e| e.error_messages)
            .unwrap_or_default();
        return Err(ApiError::Server {
            status: status.as_u16(),
            message: envelope
                .message
                .unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
            field_errors,
        });
    }

    Ok(RawResponse {
        data: envelope.data,
        message: envelope.message,
        meta: envelope.meta,
    })
}

/// The `message` of an error body, if it has one.
fn error_message(bytes: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorResponse>(bytes)
        .ok()
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        let config = ClientConfig::new(Url::parse("http://localhost:5000/api/v1/").unwrap());
        ApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_url_for_joins_path_and_query() {
        let request = ApiRequest::get("/products")
            .query("page", 2)
            .query("searchTerm", "red shoes");
        let url = client().url_for(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/v1/products?page=2&searchTerm=red+shoes"
        );
    }

    #[test]
    fn test_decode_envelope_success() {
        let body = br#"{"success":true,"message":"ok","data":{"id":1},"meta":{"total":1,"page":1,"limit":10,"totalPage":1}}"#;
        let raw = decode_envelope(StatusCode::OK, body).unwrap();
        assert_eq!(raw.data["id"], 1);
        assert_eq!(raw.message.as_deref(), Some("ok"));
        assert_eq!(raw.meta.unwrap().total, 1);
    }

    #[test]
    fn test_decode_envelope_reported_failure() {
        let body = br#"{"success":false,"message":"Out of stock","errorMessages":[]}"#;
        let err = decode_envelope(StatusCode::OK, body).unwrap_err();
        assert_eq!(err.toast_message(), "Out of stock");
    }

    #[test]
    fn test_decode_empty_body() {
        let raw = decode_envelope(StatusCode::NO_CONTENT, b"").unwrap();
        assert!(raw.data.is_null());
    }

    #[test]
    fn test_error_message_ignores_blank() {
        assert_eq!(error_message(br#"{"message":"  "}"#), None);
        assert_eq!(
            error_message(br#"{"message":"Invalid credentials"}"#).as_deref(),
            Some("Invalid credentials")
        );
        assert_eq!(error_message(b"<html>"), None);
    }

    #[tokio::test]
    async fn test_token_lifecycle() {
        let client = client();
        assert!(!client.has_token().await);
        client.set_token(SecretString::from("abc")).await;
        let auth = client.authorization().await.unwrap().unwrap();
        assert!(auth.is_sensitive());
        client.clear_token().await;
        assert!(client.authorization().await.unwrap().is_none());
    }
}
