//! Per-request lifecycle
//!
//! `Received → SessionKeyResolved → ViewResolved → {Served | Failed}`.
//! A request may fail from any non-terminal phase; terminal phases have no
//! way out, so a failed request is never retried.

use std::fmt;
use std::time::Instant;
use thiserror::Error;

/// Phase of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestPhase {
    /// Accepted by the dispatcher
    Received,
    /// Session key chosen and passed through the isolation gate
    SessionKeyResolved,
    /// Overlay and caller identity resolved
    ViewResolved,
    /// Response produced
    Served,
    /// Error response produced
    Failed,
}

impl RequestPhase {
    /// Name used in logs
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::SessionKeyResolved => "session_key_resolved",
            Self::ViewResolved => "view_resolved",
            Self::Served => "served",
            Self::Failed => "failed",
        }
    }

    /// Check if no further transition is possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Served | Self::Failed)
    }
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected phase change
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("illegal request transition {from} -> {to}")]
pub struct IllegalTransition {
    /// Current phase
    pub from: RequestPhase,
    /// Requested phase
    pub to: RequestPhase,
}

/// Validate a phase change
///
/// # Errors
/// `IllegalTransition` when `to` is not reachable from `from` in one step.
pub fn validate_transition(from: RequestPhase, to: RequestPhase) -> Result<(), IllegalTransition> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}

/// Phases reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: RequestPhase) -> &'static [RequestPhase] {
    use RequestPhase::{Failed, Received, Served, SessionKeyResolved, ViewResolved};
    match from {
        Received => &[SessionKeyResolved, Failed],
        SessionKeyResolved => &[ViewResolved, Failed],
        ViewResolved => &[Served, Failed],
        Served | Failed => &[],
    }
}

/// Tracks one request through its phases
#[derive(Debug)]
pub struct RequestLifecycle {
    phase: RequestPhase,
    started: Instant,
}

impl RequestLifecycle {
    /// Start in `Received`
    #[must_use]
    pub fn start() -> Self {
        Self {
            phase: RequestPhase::Received,
            started: Instant::now(),
        }
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    /// Move to `to`
    ///
    /// # Errors
    /// `IllegalTransition` when the move is not allowed; the phase is unchanged.
    pub fn advance(&mut self, to: RequestPhase) -> Result<(), IllegalTransition> {
        validate_transition(self.phase, to)?;
        tracing::trace!(target: "lifecycle", from = %self.phase, to = %to, "phase change");
        self.phase = to;
        Ok(())
    }

    /// Move to `Failed` unless already terminal
    pub fn fail(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = RequestPhase::Failed;
        }
    }

    /// Milliseconds since `start`
    #[must_use]
    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}
