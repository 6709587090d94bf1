//! Bearer tokens
//!
//! A token binds a caller to one session and one user inside it. Tokens are
//! random, not derived from the user. Each user holds at most one live token
//! per session: logging in again replaces the previous one.

use crate::session::SessionKey;
use dashmap::DashMap;
use rwd_model::UserId;

/// Prefix every issued token carries
pub const TOKEN_PREFIX: &str = "token_";

/// Opaque bearer token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthToken(String);

impl AuthToken {
    /// Fresh random token
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{TOKEN_PREFIX}{}", uuid::Uuid::new_v4().simple()))
    }

    /// Extract the token from an `Authorization` header value
    ///
    /// Accepts `Token <t>` (RealWorld) and `Bearer <t>`. Values without the
    /// token prefix are rejected.
    #[must_use]
    pub fn from_header(value: &str) -> Option<Self> {
        let raw = value
            .strip_prefix("Token ")
            .or_else(|| value.strip_prefix("Bearer "))?
            .trim();
        raw.starts_with(TOKEN_PREFIX).then(|| Self(raw.to_string()))
    }

    /// Borrow as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a token resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBinding {
    /// Session the token's user lives in
    pub session: SessionKey,
    /// Authenticated user
    pub user: UserId,
}

/// Live token bindings
#[derive(Debug, Default)]
pub struct TokenRegistry {
    bindings: DashMap<AuthToken, TokenBinding>,
    current: DashMap<(SessionKey, UserId), AuthToken>,
}

impl TokenRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token for `user` in `session`, revoking the one it replaces
    pub fn issue(&self, session: SessionKey, user: UserId) -> AuthToken {
        let token = AuthToken::generate();
        tracing::debug!(target: "auth", session = %session, user = %user, "token issued");
        self.bindings.insert(
            token.clone(),
            TokenBinding {
                session: session.clone(),
                user,
            },
        );
        if let Some(previous) = self.current.insert((session, user), token.clone()) {
            self.bindings.remove(&previous);
        }
        token
    }

    /// Resolve a token
    #[must_use]
    pub fn lookup(&self, token: &AuthToken) -> Option<TokenBinding> {
        self.bindings.get(token).map(|entry| entry.value().clone())
    }

    /// Drop every token bound to `session`, returning how many went
    pub fn revoke_session(&self, session: &SessionKey) -> usize {
        self.current.retain(|(bound, _), _| bound != session);
        let before = self.bindings.len();
        self.bindings.retain(|_, binding| &binding.session != session);
        before.saturating_sub(self.bindings.len())
    }

    /// Number of live tokens
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if no token is live
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
