//! Error types for the store
//!
//! Every failure a read or write can produce. The HTTP layer maps each
//! variant to one status code; nothing below it talks to the network.

use rwd_model::ValidationError;

/// Kind of per-session resource subject to a cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Registered accounts
    Users,
    /// Articles
    Articles,
    /// Comments
    Comments,
    /// Follow edges
    Follows,
    /// Favorite edges
    Favorites,
}

impl ResourceKind {
    /// Lowercase name, as used in logs and messages
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Articles => "articles",
            Self::Comments => "comments",
            Self::Follows => "follows",
            Self::Favorites => "favorites",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Resource does not exist in the caller's view
    #[error("{0}")]
    NotFound(String),

    /// Input rejected before any mutation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Uniqueness violation within the caller's view
    #[error("{0}")]
    Conflict(String),

    /// Missing or unknown credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Caller is not allowed to touch the resource
    #[error("{0}")]
    Forbidden(String),

    /// Per-session cap reached
    #[error("session limit reached: at most {limit} {kind}")]
    ResourceLimitExceeded {
        /// Capped resource
        kind: ResourceKind,
        /// Configured maximum
        limit: usize,
    },

    /// Unexpected failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Not found error with message
    #[inline]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Single-message validation error
    #[inline]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(message))
    }

    /// Generic 401
    #[inline]
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::Unauthorized("Unauthorized".to_string())
    }

    /// Generic 403
    #[inline]
    #[must_use]
    pub fn forbidden() -> Self {
        Self::Forbidden("Forbidden".to_string())
    }

    /// Messages suitable for the `errors.body` envelope
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Validation(err) => err.messages.clone(),
            other => vec![other.to_string()],
        }
    }

    /// Check if the error is a client mistake rather than a server fault
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

/// Store result type
pub type StoreResult<T> = Result<T, StoreError>;
