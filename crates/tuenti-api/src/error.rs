//! Error types for API requests

use std::fmt;

use crate::transport::TransportError;

/// What the API said about a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetails {
    pub status: u16,
    /// Machine-readable `error` field; empty when the body had none
    pub error_type: String,
    /// Human-readable `error_description` field
    pub description: Option<String>,
}

impl ErrorDetails {
    pub fn new(status: u16, error_type: impl Into<String>, description: Option<String>) -> Self {
        Self {
            status,
            error_type: error_type.into(),
            description,
        }
    }
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {}", self.status)?;
        if !self.error_type.is_empty() {
            write!(f, " [{}]", self.error_type)?;
        }
        match self.description.as_deref() {
            Some(description) if !description.is_empty() => write!(f, " {description}"),
            _ => Ok(()),
        }
    }
}

/// An HTTP error response, classified by status, `error` type and
/// `WWW-Authenticate` scheme.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(ErrorDetails),

    #[error("invalid access token: {0}")]
    InvalidToken(ErrorDetails),

    #[error("insufficient scope: {0}")]
    InsufficientScope(ErrorDetails),

    #[error("rate limit exceeded: {0}")]
    RateLimitExceeded(ErrorDetails),

    #[error("access token required: {0}")]
    AccessTokenRequired(ErrorDetails),

    #[error("client credentials required: {0}")]
    ClientCredentialsRequired(ErrorDetails),

    #[error("client error: {0}")]
    ClientError(ErrorDetails),

    #[error("API unavailable: {0}")]
    Unavailable(ErrorDetails),

    #[error("server error: {0}")]
    ServerError(ErrorDetails),
}

impl ApiError {
    pub fn details(&self) -> &ErrorDetails {
        match self {
            Self::InvalidRequest(details)
            | Self::InvalidToken(details)
            | Self::InsufficientScope(details)
            | Self::RateLimitExceeded(details)
            | Self::AccessTokenRequired(details)
            | Self::ClientCredentialsRequired(details)
            | Self::ClientError(details)
            | Self::Unavailable(details)
            | Self::ServerError(details) => details,
        }
    }

    pub fn into_details(self) -> ErrorDetails {
        match self {
            Self::InvalidRequest(details)
            | Self::InvalidToken(details)
            | Self::InsufficientScope(details)
            | Self::RateLimitExceeded(details)
            | Self::AccessTokenRequired(details)
            | Self::ClientCredentialsRequired(details)
            | Self::ClientError(details)
            | Self::Unavailable(details)
            | Self::ServerError(details) => details,
        }
    }

    pub fn status(&self) -> u16 {
        self.details().status
    }

    pub fn error_type(&self) -> &str {
        &self.details().error_type
    }

    pub fn description(&self) -> Option<&str> {
        self.details().description.as_deref()
    }

    /// Any 4xx kind, including the specialised ones.
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::ServerError(_))
    }
}

/// Errors from building or sending an API request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "\"{0}\" is not a valid resource path; resource paths must start with a slash \
         and must not end with a slash"
    )]
    InvalidRequestPath(String),

    #[error(
        "resource owner authentication requested but no access token is available; \
         complete the authorization flow first"
    )]
    AccessTokenNotFound,

    #[error("access token contains characters not allowed in an HTTP header")]
    MalformedAccessToken,

    #[error("this API request has already been used to send a request")]
    RequestAlreadySent,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid API response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// The classified API error, if the server answered with one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }
}

/// Result alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;
