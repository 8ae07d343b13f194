use reqwest::Method;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Lightdash API returned error (HTTP {status}, {name}): {message}")]
    Api {
        status: u16,
        name: String,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Response is missing {0}")]
    MissingUuid(&'static str),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// Transient failures worth another attempt. A request that may have
    /// reached the server is only resent when `method` is idempotent.
    pub fn is_retryable(&self, method: &Method) -> bool {
        match self {
            ApiError::ServiceUnavailable(_) => true,
            ApiError::Api { status: 503, .. } => true,
            ApiError::Api { status, .. } => *status >= 500 && method.is_idempotent(),
            ApiError::Timeout(_) => method.is_idempotent(),
            _ => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::NotFound(_) => Some(404),
            ApiError::AuthError(_) => Some(401),
            ApiError::Forbidden(_) => Some(403),
            _ => None,
        }
    }
}
