use thiserror::Error;

use crate::forms::ValidationError;

use super::transport::TransportError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// 401 that could not be recovered by a refresh.
    #[error("Unauthorized - token may be expired")]
    AuthorizationExpired,

    /// The refresh endpoint turned the refresh token down; the session is over.
    #[error("Session expired: {0}")]
    RefreshRejected(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    /// A 4xx carrying a human-readable message, e.g. bad login details.
    #[error("{0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull `message`, `detail` or `error` out of a JSON error body.
    pub(crate) fn server_message(body: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        ["message", "detail", "error"]
            .iter()
            .find_map(|key| value.get(key).and_then(|v| v.as_str()))
            .map(|s| s.to_string())
    }

    pub fn from_status(status: http::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::AuthorizationExpired,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            400..=499 => match Self::server_message(body) {
                Some(message) => ApiError::Rejected(message),
                None => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
            },
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Whether the user has to sign in again.
    pub fn is_session_ended(&self) -> bool {
        matches!(self, ApiError::AuthorizationExpired | ApiError::RefreshRejected(_))
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::AuthorizationExpired | ApiError::RefreshRejected(_) => {
                "Session expired. Please sign in again.".to_string()
            }
            ApiError::AccessDenied(_) => "You do not have access to this page.".to_string(),
            ApiError::NotFound(_) => "Not found.".to_string(),
            ApiError::RateLimited => "Server is busy. Please wait a moment and try again.".to_string(),
            ApiError::ServerError(_) => "Something went wrong on the server.".to_string(),
            ApiError::Transport(e) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            ApiError::Transport(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            ApiError::Rejected(message) => message.clone(),
            ApiError::Validation(e) => e.to_string(),
            ApiError::InvalidResponse(_) => "Unexpected response from server.".to_string(),
            ApiError::InvalidRequest(e) => format!("Could not build request: {}", e),
        }
    }
}
