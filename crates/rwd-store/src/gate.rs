//! Isolation gate
//!
//! Chosen once at startup. Decides whether a caller's session key is honored
//! or collapsed into the one shared key that contract-test suites expect.

use crate::session::SessionKey;
use std::sync::Arc;

/// How session keys map onto overlays
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsolationMode {
    /// Every caller gets a private overlay
    #[default]
    PerCaller,
    /// All callers share one overlay
    Shared,
}

impl IsolationMode {
    /// Mode for the `DISABLE_ISOLATION_MODE` flag
    #[inline]
    #[must_use]
    pub fn from_disabled_flag(disabled: bool) -> Self {
        if disabled {
            Self::Shared
        } else {
            Self::PerCaller
        }
    }

    /// Gate implementing this mode
    #[must_use]
    pub fn gate(self) -> Arc<dyn IsolationGate> {
        match self {
            Self::PerCaller => Arc::new(PerCallerGate),
            Self::Shared => Arc::new(SharedGate),
        }
    }
}

/// Maps a caller's key to the key of the overlay it reads and writes
pub trait IsolationGate: Send + Sync + std::fmt::Debug {
    /// Overlay key for `key`
    fn scope(&self, key: &SessionKey) -> SessionKey;

    /// Mode this gate implements
    fn mode(&self) -> IsolationMode;

    /// Whether distinct keys stay apart
    fn is_isolated(&self) -> bool {
        self.mode() == IsolationMode::PerCaller
    }
}

/// Honors the caller's key
#[derive(Debug, Clone, Copy, Default)]
pub struct PerCallerGate;

impl IsolationGate for PerCallerGate {
    fn scope(&self, key: &SessionKey) -> SessionKey {
        key.clone()
    }

    fn mode(&self) -> IsolationMode {
        IsolationMode::PerCaller
    }
}

/// Collapses every key into [`SessionKey::shared`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SharedGate;

impl IsolationGate for SharedGate {
    fn scope(&self, _key: &SessionKey) -> SessionKey {
        SessionKey::shared()
    }

    fn mode(&self) -> IsolationMode {
        IsolationMode::Shared
    }
}
