//! HTTP utilities for backend REST calls
//!
//! All responses pass through [`safe_parse_json`], which checks the
//! `Content-Type` before decoding. The backend (or a proxy in front of it)
//! sometimes answers with an HTML error page; that must surface as a
//! response-shape error instead of a JSON parse panic further up.

use super::error::{ApiError, ApiResult};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sanitize response body for logging
/// Truncates long responses and drops control characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control() && c != ' ', "")
}

/// Decoded body of a response
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// JSON content type and a body that parsed
    Json(Value),
    /// Anything else: wrong content type, or JSON that failed to parse
    Text { content_type: String, text: String },
    Empty,
}

/// A response whose body has been read and classified
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub status: StatusCode,
    pub body: Body,
}

/// Read a response body, decoding it as JSON only when the server says it is JSON
pub async fn safe_parse_json(response: Response) -> ApiResult<ParsedResponse> {
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let text = response.text().await.map_err(ApiError::Transport)?;
    Ok(ParsedResponse {
        status,
        body: classify_body(&content_type, text),
    })
}

fn classify_body(content_type: &str, text: String) -> Body {
    if text.trim().is_empty() {
        return Body::Empty;
    }

    if is_json_content_type(content_type) {
        match serde_json::from_str(&text) {
            Ok(value) => return Body::Json(value),
            Err(e) => tracing::warn!("Body declared as JSON failed to parse: {}", e),
        }
    }

    Body::Text {
        content_type: if content_type.is_empty() {
            "unknown content type".to_string()
        } else {
            content_type.to_string()
        },
        text,
    }
}

pub(crate) fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .to_ascii_lowercase()
        .contains("application/json")
}

/// Pull a human-readable error message out of an error envelope
pub fn error_message(value: &Value) -> Option<String> {
    ["error", "message"].iter().find_map(|key| match value.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        // Some services nest {"error": {"message": ...}}
        Some(Value::Object(inner)) => inner
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string),
        _ => None,
    })
}

impl ParsedResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The JSON body of a successful response, or the classified failure
    pub fn into_json(self) -> ApiResult<Value> {
        if self.status.is_success() {
            return match self.body {
                Body::Json(value) => Ok(value),
                Body::Empty => Ok(Value::Null),
                Body::Text { content_type, text } => {
                    tracing::error!(
                        "Expected JSON, got {}: {}",
                        content_type,
                        sanitize_for_log(&text)
                    );
                    Err(ApiError::ResponseShape {
                        status: self.status.as_u16(),
                        detail: format!("Expected JSON but got {}", content_type),
                    })
                }
            };
        }
        Err(self.into_error())
    }

    /// Classify a non-success response
    pub fn into_error(self) -> ApiError {
        let status = self.status.as_u16();
        if self.status == StatusCode::UNAUTHORIZED {
            return ApiError::Unauthenticated;
        }

        match self.body {
            Body::Json(value) => {
                tracing::error!("API error: {} - {}", status, sanitize_for_log(&value.to_string()));
                ApiError::Backend {
                    status,
                    message: error_message(&value)
                        .unwrap_or_else(|| format!("Request failed ({})", status)),
                }
            }
            Body::Text { content_type, text } => {
                // Security: Only log sanitized/truncated error body
                tracing::error!("API error: {} - {}", status, sanitize_for_log(&text));
                ApiError::ResponseShape {
                    status,
                    detail: format!("Expected JSON but got {}", content_type),
                }
            }
            Body::Empty => ApiError::Backend {
                status,
                message: format!("Server returned {}", status),
            },
        }
    }
}

/// Binary payload of a successful download
#[derive(Debug, Clone)]
pub struct BinaryResponse {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// HTTP client wrapper for backend calls
#[derive(Clone)]
pub struct ApiHttpClient {
    client: Client,
    timeout: Duration,
}

impl ApiHttpClient {
    /// Create a new HTTP client with the default timeout
    pub fn new() -> ApiResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a new HTTP client; requests that take longer than `timeout` fail
    pub fn with_timeout(timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("campus-assets/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn request(&self, method: Method, url: &str, token: Option<&str>) -> RequestBuilder {
        tracing::debug!("{} {}", method, url);
        let request = self.client.request(method, url);
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> ApiResult<ParsedResponse> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(e, self.timeout))?;
        safe_parse_json(response).await
    }

    /// Make a GET request with query parameters
    pub async fn get(
        &self,
        url: &str,
        token: Option<&str>,
        query: &[(&str, String)],
    ) -> ApiResult<Value> {
        let request = self.request(Method::GET, url, token).query(query);
        self.execute(request).await?.into_json()
    }

    /// Make a request carrying an optional JSON body
    pub async fn send_json(
        &self,
        method: Method,
        url: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> ApiResult<Value> {
        self.send_json_parsed(method, url, token, body)
            .await?
            .into_json()
    }

    /// Like [`Self::send_json`], but hands back the classified response whatever its status
    pub async fn send_json_parsed(
        &self,
        method: Method,
        url: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> ApiResult<ParsedResponse> {
        let mut request = self.request(method, url, token);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(request).await
    }

    /// Make a multipart POST and return the classified response without judging the status
    pub async fn post_multipart(
        &self,
        url: &str,
        token: Option<&str>,
        form: Form,
    ) -> ApiResult<ParsedResponse> {
        let request = self.request(Method::POST, url, token).multipart(form);
        self.execute(request).await
    }

    /// Make a GET request expecting a binary body
    pub async fn get_bytes(&self, url: &str, token: Option<&str>) -> ApiResult<BinaryResponse> {
        let response = self
            .request(Method::GET, url, token)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(safe_parse_json(response).await?.into_error());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(e, self.timeout))?;

        Ok(BinaryResponse {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parsed(status: u16, body: Body) -> ParsedResponse {
        ParsedResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body,
        }
    }

    #[test]
    fn test_html_body_is_not_json() {
        let body = classify_body("text/html; charset=utf-8", "<html>502</html>".to_string());
        assert!(matches!(body, Body::Text { .. }));
    }

    #[test]
    fn test_malformed_json_falls_back_to_text() {
        let body = classify_body("application/json", "{oops".to_string());
        assert!(matches!(body, Body::Text { ref text, .. } if text == "{oops"));
    }

    #[test]
    fn test_json_with_charset_is_recognized() {
        let body = classify_body("Application/JSON; charset=utf-8", r#"{"a":1}"#.to_string());
        assert_eq!(body, Body::Json(json!({"a": 1})));
    }

    #[test]
    fn test_empty_body_on_success_is_null() {
        assert_eq!(parsed(204, Body::Empty).into_json().unwrap(), Value::Null);
    }

    #[test]
    fn test_401_is_unauthenticated_regardless_of_body() {
        let err = parsed(401, Body::Json(json!({"error": "Invalid session"})))
            .into_json()
            .unwrap_err();
        assert!(err.is_unauthenticated());
    }

    #[test]
    fn test_json_error_uses_error_field() {
        let err = parsed(400, Body::Json(json!({"success": false, "error": "Missing required field: sl_no"})))
            .into_json()
            .unwrap_err();
        assert!(matches!(err, ApiError::Backend { status: 400, ref message } if message == "Missing required field: sl_no"));
    }

    #[test]
    fn test_text_on_success_is_response_shape_error() {
        let err = parsed(
            200,
            Body::Text {
                content_type: "text/html".to_string(),
                text: "<html/>".to_string(),
            },
        )
        .into_json()
        .unwrap_err();
        assert!(matches!(err, ApiError::ResponseShape { status: 200, .. }));
    }

    #[test]
    fn test_error_message_nested() {
        let value = json!({"error": {"code": 403, "message": "Permission denied"}});
        assert_eq!(error_message(&value).as_deref(), Some("Permission denied"));
        assert_eq!(error_message(&json!({"data": 1})), None);
    }

    #[test]
    fn test_sanitize_for_log_truncates() {
        let body = "é".repeat(300);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.contains("truncated"));
    }
}
