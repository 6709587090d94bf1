//! API errors and their mapping to HTTP status codes
//!
//! This is the only place where failures become status codes. Everything the
//! store raises arrives here as a [`StoreError`]; the dispatcher adds the
//! request-shape failures it detects itself.

use rwd_store::StoreError;
use serde::Serialize;
use thiserror::Error;
use warp::http::StatusCode;

/// Failure of one API request
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Raised by the store
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No route matches the method and path
    #[error("Not found")]
    RouteNotFound,

    /// Body is not valid JSON or has the wrong shape
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    /// Non-numeric `limit` or `offset`
    #[error("{param} must be a non-negative integer")]
    InvalidQuery {
        /// Parameter name
        param: &'static str,
    },

    /// `Origin` is not in the allowed list
    #[error("Origin not allowed")]
    OriginRejected,

    /// Unexpected failure inside the dispatcher
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store(err) => match err {
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                StoreError::Conflict(_) => StatusCode::CONFLICT,
                StoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                StoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                StoreError::ResourceLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
                StoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::MalformedBody(_) | Self::InvalidQuery { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::OriginRejected => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Messages for the error envelope
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Store(StoreError::Internal(_)) | Self::Internal(_) => {
                vec!["Internal Server Error".to_string()]
            }
            Self::Store(err) => err.messages(),
            other => vec![other.to_string()],
        }
    }

    /// Short kind name for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Store(StoreError::NotFound(_)) | Self::RouteNotFound => "not_found",
            Self::Store(StoreError::Validation(_))
            | Self::MalformedBody(_)
            | Self::InvalidQuery { .. } => "validation",
            Self::Store(StoreError::Conflict(_)) => "conflict",
            Self::Store(StoreError::Unauthorized(_)) => "unauthorized",
            Self::Store(StoreError::Forbidden(_)) | Self::OriginRejected => "forbidden",
            Self::Store(StoreError::ResourceLimitExceeded { .. }) => "resource_limit_exceeded",
            Self::Store(StoreError::Internal(_)) | Self::Internal(_) => "internal",
        }
    }

    /// Error envelope body
    #[must_use]
    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope::new(self.messages())
    }
}

/// Result type for dispatcher operations
pub type ApiResult<T> = Result<T, ApiError>;

/// `{"errors": {"body": [...]}}`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorEnvelope {
    /// Wrapped messages
    pub errors: ErrorBody,
}

/// Inner part of [`ErrorEnvelope`]
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// Human-readable messages
    pub body: Vec<String>,
}

impl ErrorEnvelope {
    /// Wrap messages
    #[must_use]
    pub fn new(messages: Vec<String>) -> Self {
        Self {
            errors: ErrorBody { body: messages },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rwd_store::ResourceKind;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::not_found("Article not found"), 404),
            (StoreError::validation("Body is required"), 422),
            (StoreError::Conflict("User already exists".into()), 409),
            (StoreError::unauthorized(), 401),
            (StoreError::forbidden(), 403),
            (
                StoreError::ResourceLimitExceeded {
                    kind: ResourceKind::Articles,
                    limit: 2,
                },
                429,
            ),
            (StoreError::Internal("boom".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status().as_u16(), status);
        }
    }

    #[test]
    fn request_shape_errors_are_validation() {
        assert_eq!(
            ApiError::MalformedBody("eof".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::InvalidQuery { param: "limit" }.messages(),
            vec!["limit must be a non-negative integer"]
        );
        assert_eq!(ApiError::RouteNotFound.messages(), vec!["Not found"]);
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = ApiError::Internal("poisoned state".into());
        assert_eq!(err.messages(), vec!["Internal Server Error"]);
        assert_eq!(err.kind(), "internal");
    }

    #[test]
    fn envelope_shape() {
        let json = serde_json::to_value(ApiError::RouteNotFound.envelope()).unwrap();
        assert_eq!(json, serde_json::json!({"errors": {"body": ["Not found"]}}));
    }
}
