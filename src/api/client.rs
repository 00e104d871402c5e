//! Backend Client
//!
//! Main client for the Campus Assets backend, combining the session store
//! and HTTP functionality. Every authenticated call reads the token from the
//! injected [`SessionStore`]; a 401 answer tears the session down.

use super::error::{ApiError, ApiResult};
use super::http::{error_message, ApiHttpClient, BinaryResponse, Body, ParsedResponse};
use super::session::SessionStore;
use reqwest::multipart::Form;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Main backend client
#[derive(Clone)]
pub struct ApiClient {
    pub session: SessionStore,
    pub http: ApiHttpClient,
    base_url: String,
}

impl ApiClient {
    /// Create a new client with the default request timeout
    pub fn new(base_url: &str, session: SessionStore) -> ApiResult<Self> {
        Self::with_http(base_url, session, ApiHttpClient::new()?)
    }

    /// Create a new client whose requests fail after `timeout`
    pub fn with_timeout(base_url: &str, session: SessionStore, timeout: Duration) -> ApiResult<Self> {
        Self::with_http(base_url, session, ApiHttpClient::with_timeout(timeout)?)
    }

    pub fn with_http(base_url: &str, session: SessionStore, http: ApiHttpClient) -> ApiResult<Self> {
        Ok(Self {
            session,
            http,
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an absolute URL for an API path such as `/api/resources`
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Path of a single entity in a collection, escaping the id
    pub fn entity_path(collection: &str, id: &str) -> String {
        format!(
            "{}/{}",
            collection.trim_end_matches('/'),
            urlencoding::encode(id)
        )
    }

    /// Tear the session down when the backend rejects our credentials
    async fn guard<T>(&self, result: ApiResult<T>) -> ApiResult<T> {
        if let Err(ApiError::Unauthenticated) = &result {
            tracing::warn!("Backend rejected session token, clearing session");
            if let Err(e) = self.session.clear().await {
                tracing::warn!("Failed to clear session: {}", e);
            }
        }
        result
    }

    /// Make an authenticated GET request
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> ApiResult<Value> {
        let token = self.session.require_token().await?;
        let result = self.http.get(&self.url(path), Some(&token), query).await;
        self.guard(result).await
    }

    /// Make an authenticated POST request
    pub async fn post(&self, path: &str, body: Option<&Value>) -> ApiResult<Value> {
        self.send(Method::POST, path, body).await
    }

    /// Make an authenticated PUT request
    pub async fn put(&self, path: &str, body: Option<&Value>) -> ApiResult<Value> {
        self.send(Method::PUT, path, body).await
    }

    /// Make an authenticated DELETE request
    pub async fn delete(&self, path: &str) -> ApiResult<Value> {
        self.send(Method::DELETE, path, None).await
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> ApiResult<Value> {
        let token = self.session.require_token().await?;
        let result = self
            .http
            .send_json(method, &self.url(path), Some(&token), body)
            .await;
        self.guard(result).await
    }

    /// Make an unauthenticated POST request (login, register).
    /// A 401 here is a rejected credential, reported with the backend's message.
    pub async fn post_public(&self, path: &str, body: &Value) -> ApiResult<Value> {
        self.http
            .send_json_parsed(Method::POST, &self.url(path), None, Some(body))
            .await
            .and_then(credential_rejection)?
            .into_json()
    }

    /// Make an authenticated GET request expecting a binary body
    pub async fn get_bytes(&self, path: &str) -> ApiResult<BinaryResponse> {
        let token = self.session.require_token().await?;
        let result = self.http.get_bytes(&self.url(path), Some(&token)).await;
        self.guard(result).await
    }

    /// Make an authenticated multipart POST; the caller judges the status
    pub async fn post_multipart(&self, path: &str, form: Form) -> ApiResult<ParsedResponse> {
        let token = self.session.require_token().await?;
        let result = self
            .http
            .post_multipart(&self.url(path), Some(&token), form)
            .await
            .and_then(reject_unauthorized);
        self.guard(result).await
    }

    /// Make an authenticated JSON POST; the caller judges the status (except 401)
    pub async fn post_parsed(&self, path: &str, body: &Value) -> ApiResult<ParsedResponse> {
        let token = self.session.require_token().await?;
        let result = self
            .http
            .send_json_parsed(Method::POST, &self.url(path), Some(&token), Some(body))
            .await
            .and_then(reject_unauthorized);
        self.guard(result).await
    }
}

fn credential_rejection(parsed: ParsedResponse) -> ApiResult<ParsedResponse> {
    if parsed.status != reqwest::StatusCode::UNAUTHORIZED {
        return Ok(parsed);
    }
    let message = match &parsed.body {
        Body::Json(value) => error_message(value),
        _ => None,
    };
    Err(ApiError::Backend {
        status: 401,
        message: message.unwrap_or_else(|| "Invalid credentials".to_string()),
    })
}

fn reject_unauthorized(parsed: ParsedResponse) -> ApiResult<ParsedResponse> {
    if parsed.status == reqwest::StatusCode::UNAUTHORIZED {
        Err(ApiError::Unauthenticated)
    } else {
        Ok(parsed)
    }
}

fn normalize_base_url(base_url: &str) -> ApiResult<String> {
    let trimmed = base_url.trim();
    let parsed = Url::parse(trimmed)
        .map_err(|e| ApiError::Validation(format!("Invalid backend URL '{}': {}", trimmed, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiError::Validation(format!(
            "Backend URL must use http or https, got '{}'",
            parsed.scheme()
        )));
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Take the `data` member out of a `{success, message, data, error}` envelope
pub fn extract_data(envelope: Value) -> ApiResult<Value> {
    match envelope {
        Value::Object(mut map) => map.remove("data").ok_or_else(|| ApiError::ResponseShape {
            status: 200,
            detail: "response is missing 'data'".to_string(),
        }),
        other => Err(ApiError::ResponseShape {
            status: 200,
            detail: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
    }
}

/// Decode a JSON value into a typed record, failing closed on shape mismatches
pub fn decode<T: DeserializeOwned>(value: Value, what: &str) -> ApiResult<T> {
    serde_json::from_value(value).map_err(|e| ApiError::ResponseShape {
        status: 200,
        detail: format!("malformed {}: {}", what, e),
    })
}

/// `message` member of an envelope, if any
pub fn envelope_message(envelope: &Value) -> Option<String> {
    envelope
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, SessionStore::in_memory()).unwrap()
    }

    #[test]
    fn test_url_building() {
        let client = client("https://assets.example.edu/");
        assert_eq!(
            client.url("/api/resources"),
            "https://assets.example.edu/api/resources"
        );
        assert_eq!(
            client.url("api/locations"),
            "https://assets.example.edu/api/locations"
        );
    }

    #[test]
    fn test_base_path_prefix_is_kept() {
        let client = client("https://example.edu/backend");
        assert_eq!(
            client.url("/api/resources"),
            "https://example.edu/backend/api/resources"
        );
    }

    #[test]
    fn test_entity_path_escapes_id() {
        let client = client("http://localhost:5000");
        let path = ApiClient::entity_path("/api/resources", "a/b c");
        assert_eq!(path, "/api/resources/a%2Fb%20c");
        assert_eq!(
            client.url(&path),
            "http://localhost:5000/api/resources/a%2Fb%20c"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(matches!(
            ApiClient::new("not a url", SessionStore::in_memory()),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            ApiClient::new("ftp://example.edu", SessionStore::in_memory()),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_extract_data() {
        assert_eq!(
            extract_data(json!({"success": true, "data": [1, 2]})).unwrap(),
            json!([1, 2])
        );
        assert!(matches!(
            extract_data(json!({"success": true})),
            Err(ApiError::ResponseShape { .. })
        ));
        assert!(matches!(
            extract_data(json!([1])),
            Err(ApiError::ResponseShape { .. })
        ));
    }

    #[tokio::test]
    async fn test_requests_without_token_fail_before_network() {
        // Port 9 (discard) is never contacted: the token check comes first
        let client = client("http://127.0.0.1:9");
        let err = client.get("/api/resources", &[]).await.unwrap_err();
        assert!(err.is_unauthenticated());
    }
}
