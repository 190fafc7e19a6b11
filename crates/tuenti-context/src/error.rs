//! Error types for signed context verification

/// Why a signed context could not be used.
///
/// Both variants are recoverable: callers treat an invalid context exactly
/// like a missing one and fall back to the unauthenticated flow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error(
        "no signed context was sent with the request; the application is not \
         embedded or this is not its initial page"
    )]
    NotFound,

    #[error("invalid signed context: {0}")]
    Invalid(String),
}

impl ContextError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid(reason.into())
    }

    /// Validation failure reason, if the context was present but rejected.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::NotFound => None,
            Self::Invalid(reason) => Some(reason),
        }
    }
}

/// Result alias for context operations.
pub type Result<T> = std::result::Result<T, ContextError>;
