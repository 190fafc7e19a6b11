//! SDK error types

use tuenti_api::{ApiError, ErrorDetails};
use tuenti_context::ContextError;

/// Errors surfaced by the SDK facade and the access-token manager.
///
/// Nothing is logged or swallowed on the way up; the caller decides how to
/// recover (fall back to the unauthenticated flow, re-authorize, back off).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] common::Error),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Request(#[from] tuenti_api::Error),

    #[error("authorization request failed: {error_type} - {}", .description.as_deref().unwrap_or_default())]
    AuthorizationRequestFailed {
        error_type: String,
        description: Option<String>,
    },

    #[error("couldn't find an authorization response in the request")]
    AuthorizationCodeNotFound,

    #[error("authorization code exchange failed: {0}")]
    AuthorizationCodeExchangeFailed(ErrorDetails),

    #[error("invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("missing request data: {0}")]
    MissingRequestData(String),
}

impl Error {
    /// The classified API error behind a failed request, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Request(err) => err.api_error(),
            _ => None,
        }
    }

    /// The API rejected the access token; clear it and re-authorize.
    pub fn is_invalid_token(&self) -> bool {
        matches!(self.api_error(), Some(ApiError::InvalidToken(_)))
    }
}

/// Result alias for SDK operations.
pub type Result<T> = std::result::Result<T, Error>;
