//! Mapping of HTTP error responses onto [`ApiError`]
//!
//! First match wins:
//! - 400 + `invalid_request` → InvalidRequest
//! - 401 + `invalid_token` → InvalidToken
//! - 401 + `WWW-Authenticate: Basic …` → ClientCredentialsRequired
//! - 401 + `WWW-Authenticate: Bearer …` → AccessTokenRequired
//! - 403 + `insufficient_scope` → InsufficientScope
//! - 429 → RateLimitExceeded
//! - other 4xx → ClientError
//! - 503 → Unavailable
//! - other 5xx → ServerError
//! - anything else is not an error

use reqwest::header::{HeaderMap, WWW_AUTHENTICATE};
use serde::Deserialize;

use crate::error::{ApiError, ErrorDetails};

/// Error body returned by the API: `{"error": "...", "error_description": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ErrorBody {
    /// Parse a raw response body. Anything that is not the expected JSON
    /// object counts as an empty error body.
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }
}

/// Classify a response. `None` means the status is not an error (2xx/3xx).
pub fn classify(status: u16, headers: &HeaderMap, body: &ErrorBody) -> Option<ApiError> {
    let error_type = body.error.as_deref().unwrap_or_default();
    let details = || ErrorDetails::new(status, error_type, body.error_description.clone());
    let scheme = if status == 401 {
        challenge_scheme(headers)
    } else {
        None
    };

    let classified = match status {
        400 if error_type == "invalid_request" => ApiError::InvalidRequest(details()),
        401 if error_type == "invalid_token" => ApiError::InvalidToken(details()),
        401 if scheme == Some("Basic") => ApiError::ClientCredentialsRequired(details()),
        401 if scheme == Some("Bearer") => ApiError::AccessTokenRequired(details()),
        403 if error_type == "insufficient_scope" => ApiError::InsufficientScope(details()),
        429 => ApiError::RateLimitExceeded(details()),
        400..=499 => ApiError::ClientError(details()),
        503 => ApiError::Unavailable(details()),
        500..=599 => ApiError::ServerError(details()),
        _ => return None,
    };
    Some(classified)
}

/// Authentication scheme of the `WWW-Authenticate` challenge, e.g. `Bearer`.
fn challenge_scheme(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(WWW_AUTHENTICATE)?
        .to_str()
        .ok()?
        .split_whitespace()
        .next()
}
