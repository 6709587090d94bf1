//! Session store
//!
//! Maps session keys to overlays. Overlays are created lazily on first use
//! and live in a `moka` cache, which gives atomic get-or-insert per key and
//! optional whole-session eviction (LRU bound, idle expiry). Each overlay
//! sits behind its own mutex, so writes of one session apply in arrival order
//! while different sessions never contend.

use crate::error::{StoreError, StoreResult};
use crate::gate::IsolationGate;
use crate::overlay::SessionOverlay;
use crate::resolver::Resolver;
use crate::session::SessionKey;
use crate::tokens::{AuthToken, TokenRegistry};
use crate::view::EffectiveView;
use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use parking_lot::Mutex;
use rwd_model::{Credentials, Login, NewUser, User};
use std::sync::Arc;
use std::time::Duration;

/// Overlay handle shared by concurrent requests of one session
pub type SharedOverlay = Arc<Mutex<SessionOverlay>>;

/// Whole-session eviction settings; both off by default
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// Maximum live sessions; least recently used go first
    pub max_sessions: Option<u64>,
    /// Drop sessions idle for this long
    pub idle_timeout: Option<Duration>,
}

impl StoreConfig {
    /// Bound the number of sessions
    #[inline]
    #[must_use]
    pub fn with_max_sessions(mut self, max: u64) -> Self {
        self.max_sessions = Some(max);
        self
    }

    /// Expire idle sessions
    #[inline]
    #[must_use]
    pub fn with_idle_timeout(mut self, idle: Duration) -> Self {
        self.idle_timeout = Some(idle);
        self
    }
}

/// Result of a successful register or login
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// Session the user lives in
    pub session: SessionKey,
    /// The user
    pub user: User,
    /// Freshly issued token
    pub token: AuthToken,
}

/// Concurrent map of session key → overlay
#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<SessionKey, SharedOverlay>,
    tokens: Arc<TokenRegistry>,
    resolver: Arc<Resolver>,
    gate: Arc<dyn IsolationGate>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.entry_count())
            .field("tokens", &self.tokens.len())
            .field("mode", &self.gate.mode())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create store
    #[must_use]
    pub fn new(resolver: Resolver, gate: Arc<dyn IsolationGate>, config: StoreConfig) -> Self {
        let tokens = Arc::new(TokenRegistry::new());

        let listener_tokens = Arc::clone(&tokens);
        let mut builder = Cache::<SessionKey, SharedOverlay>::builder()
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(move |key: Arc<SessionKey>, overlay: SharedOverlay, cause| {
                if cause == RemovalCause::Replaced {
                    return;
                }
                let revoked = listener_tokens.revoke_session(&key);
                let stats = overlay.try_lock().map(|guard| guard.stats());
                tracing::info!(
                    target: "storage",
                    session = %key,
                    ?cause,
                    revoked_tokens = revoked,
                    ?stats,
                    "session evicted"
                );
            });
        if let Some(max) = config.max_sessions {
            builder = builder.max_capacity(max);
        }
        if let Some(idle) = config.idle_timeout {
            builder = builder.time_to_idle(idle);
        }

        Self {
            sessions: builder.build(),
            tokens,
            resolver: Arc::new(resolver),
            gate,
        }
    }

    /// Resolver used for every session
    #[inline]
    #[must_use]
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Token registry
    #[inline]
    #[must_use]
    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    /// Isolation gate
    #[inline]
    #[must_use]
    pub fn gate(&self) -> &dyn IsolationGate {
        self.gate.as_ref()
    }

    /// Overlay key for a caller key, after the isolation gate
    #[inline]
    #[must_use]
    pub fn scope(&self, key: &SessionKey) -> SessionKey {
        self.gate.scope(key)
    }

    /// Overlay for `key`, created empty on first use
    ///
    /// Idempotent: concurrent first calls for one key observe the same
    /// overlay.
    pub fn get_or_create_overlay(&self, key: &SessionKey) -> SharedOverlay {
        let scoped = self.scope(key);
        self.sessions.get_with(scoped.clone(), || {
            tracing::debug!(target: "storage", session = %scoped, "session created");
            Arc::new(Mutex::new(SessionOverlay::new()))
        })
    }

    /// Run a read against the session's effective view
    ///
    /// Reads never create a session: an unknown key sees the seed alone.
    pub fn resolve_view<R>(&self, key: &SessionKey, read: impl FnOnce(&EffectiveView<'_>) -> R) -> R {
        match self.sessions.get(&self.scope(key)) {
            Some(overlay) => {
                let guard = overlay.lock();
                read(&self.resolver.view(&guard))
            }
            None => {
                let empty = SessionOverlay::new();
                read(&self.resolver.view(&empty))
            }
        }
    }

    /// Run a write against the session's overlay, serialized with every
    /// other write of the same session
    pub fn write<R>(
        &self,
        key: &SessionKey,
        write: impl FnOnce(&Resolver, &mut SessionOverlay) -> R,
    ) -> R {
        let overlay = self.get_or_create_overlay(key);
        let mut guard = overlay.lock();
        write(self.resolver.as_ref(), &mut *guard)
    }

    /// Register in `key`'s session and issue a token
    ///
    /// # Errors
    /// Whatever [`Resolver::register`] rejects.
    pub fn register(&self, key: &SessionKey, input: NewUser) -> StoreResult<Authenticated> {
        let session = self.scope(key);
        let user = self.write(&session, |resolver, overlay| resolver.register(overlay, input))?;
        let token = self.tokens.issue(session.clone(), user.id);
        tracing::info!(target: "auth", session = %session, user = %user.id, "registered");
        Ok(Authenticated {
            session,
            user,
            token,
        })
    }

    /// Log in and issue a token
    ///
    /// The caller's own session is searched first. With isolation on, other
    /// live sessions are searched next and the token is bound to the one
    /// holding the account, so a temporary account stays reachable from a
    /// different address.
    ///
    /// # Errors
    /// - `Validation` when email or password is missing
    /// - `Unauthorized` when no session holds matching credentials
    pub fn login(&self, key: &SessionKey, input: Credentials) -> StoreResult<Authenticated> {
        let login = input.validate()?;
        let own = self.scope(key);

        let found = self
            .resolve_view(&own, |view| {
                self.resolver.authenticate(view.overlay(), &login)
            })
            .map(|user| (own.clone(), user))
            .or_else(|| {
                if self.gate.is_isolated() {
                    self.find_session(&login, &own)
                } else {
                    None
                }
            });

        let Some((session, user)) = found else {
            tracing::warn!(target: "security", session = %own, "invalid credentials");
            return Err(StoreError::Unauthorized("Invalid credentials".to_string()));
        };
        if session != own {
            tracing::info!(target: "auth", from = %own, to = %session, "login bound to owning session");
        }
        // Tokens live only as long as a cached session does
        self.get_or_create_overlay(&session);
        let token = self.tokens.issue(session.clone(), user.id);
        tracing::info!(target: "auth", session = %session, user = %user.id, "logged in");
        Ok(Authenticated {
            session,
            user,
            token,
        })
    }

    /// Search every live session except `skip` for matching credentials
    #[must_use]
    pub fn find_session(&self, login: &Login, skip: &SessionKey) -> Option<(SessionKey, User)> {
        self.sessions.iter().find_map(|(key, overlay)| {
            if *key == *skip {
                return None;
            }
            let guard = overlay.lock();
            self.resolver
                .authenticate(&guard, login)
                .map(|user| (SessionKey::clone(&key), user))
        })
    }

    /// Whether an overlay exists for `key` (after the gate)
    #[must_use]
    pub fn contains(&self, key: &SessionKey) -> bool {
        self.sessions.contains_key(&self.scope(key))
    }

    /// Drop a session and every token bound to it
    pub fn evict(&self, key: &SessionKey) {
        let scoped = self.scope(key);
        self.sessions.invalidate(&scoped);
        self.tokens.revoke_session(&scoped);
    }

    /// Approximate number of live sessions
    #[must_use]
    pub fn session_count(&self) -> u64 {
        self.sessions.run_pending_tasks();
        self.sessions.entry_count()
    }

    /// Apply pending evictions now
    pub fn run_pending_tasks(&self) {
        self.sessions.run_pending_tasks();
    }
}
