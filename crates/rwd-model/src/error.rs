//! Validation failures for request inputs

/// One or more human-readable reasons an input was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validation failed: {}", .messages.join("; "))]
pub struct ValidationError {
    /// Messages, in the order the checks ran
    pub messages: Vec<String>,
}

impl ValidationError {
    /// Single-message error
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }

    /// Append another message
    #[inline]
    #[must_use]
    pub fn with(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }
}
