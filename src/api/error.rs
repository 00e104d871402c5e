//! Error taxonomy for backend calls
//!
//! Every call site maps failures onto [`ApiError`] so callers can react per
//! kind: re-login on [`ApiError::Unauthenticated`], inline messages on
//! [`ApiError::Validation`], a short notice for everything else.

use std::time::Duration;

/// Failure of a backend request (or of the local checks in front of one)
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never completed (DNS, connect, reset, ...)
    #[error("Network error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The request did not complete within the configured timeout
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// No session token, or the backend answered 401
    #[error("Not authenticated. Run 'campus-assets login' first.")]
    Unauthenticated,

    /// Rejected locally before any network call
    #[error("{0}")]
    Validation(String),

    /// The backend answered with a JSON error body
    #[error("{message}")]
    Backend { status: u16, message: String },

    /// The backend answered with something other than the expected shape
    #[error("Server returned {status}: {detail}")]
    ResponseShape { status: u16, detail: String },

    /// Local file access for uploads and downloads
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Classify a reqwest failure, keeping timeouts apart from other transport errors
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(timeout)
        } else {
            ApiError::Transport(err)
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ApiError::Unauthenticated)
    }

    /// HTTP status attached to the error, if the backend answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Backend { status, .. } | ApiError::ResponseShape { status, .. } => {
                Some(*status)
            }
            ApiError::Unauthenticated => Some(401),
            _ => None,
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Format an API error for display
///
/// Backend messages are shown as-is (they are written for users); transport
/// details are reduced to a generic hint.
pub fn format_api_error(error: &ApiError) -> String {
    match error {
        ApiError::Transport(_) => {
            "Network error occurred. Check your connection and the backend URL.".to_string()
        }
        ApiError::Timeout(_) => "The backend did not respond in time. Please try again.".to_string(),
        ApiError::Unauthenticated => error.to_string(),
        ApiError::Validation(msg) => msg.clone(),
        ApiError::Backend { status, message } => {
            if message.trim().is_empty() {
                format!("Request failed ({})", status)
            } else {
                truncate_message(message)
            }
        }
        ApiError::ResponseShape { .. } => truncate_message(&error.to_string()),
        ApiError::Io(err) => format!("File error: {}", err),
    }
}

fn truncate_message(message: &str) -> String {
    let sanitized = message
        .chars()
        .filter(|c| !c.is_control())
        .take(120)
        .collect::<String>();

    if sanitized.chars().count() < message.chars().count() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
