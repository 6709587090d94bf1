//! Session keys

use std::sync::Arc;

/// Opaque identifier of one isolation scope
///
/// Derived from the caller (bound token, client address, ...). Not a login
/// token: many tokens can point at the same session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionKey(Arc<str>);

impl SessionKey {
    /// Key used when nothing identifies the caller
    pub const ANONYMOUS: &'static str = "anonymous";
    /// Key every caller collapses into when isolation is off
    pub const SHARED: &'static str = "shared";

    /// Create key from any string
    #[inline]
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    /// Fallback key for unidentified callers
    #[inline]
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(Self::ANONYMOUS)
    }

    /// Single key used in shared mode
    #[inline]
    #[must_use]
    pub fn shared() -> Self {
        Self::new(Self::SHARED)
    }

    /// Borrow as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for SessionKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}
