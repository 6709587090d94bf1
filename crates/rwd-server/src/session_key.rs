//! Session key derivation
//!
//! An ordered chain of pure strategies over what is known about the caller.
//! The first strategy that yields a key wins; the anonymous key closes the
//! chain. The isolation gate is applied afterwards by the store.

use rwd_store::SessionKey;

/// What the dispatcher knows about the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerContext {
    /// Session of a valid bearer token
    pub token_session: Option<SessionKey>,
    /// Raw value of the configured client-address header
    pub client_header: Option<String>,
    /// Remote socket address, without port
    pub remote_addr: Option<String>,
}

/// One step of the chain
pub type KeyStrategy = fn(&CallerContext) -> Option<SessionKey>;

/// Chain used by the dispatcher
pub const DEFAULT_CHAIN: &[KeyStrategy] = &[from_token, from_client_header, from_remote_addr];

/// Session bound to the caller's token
#[must_use]
pub fn from_token(ctx: &CallerContext) -> Option<SessionKey> {
    ctx.token_session.clone()
}

/// First entry of the client-address header, e.g. `X-Forwarded-For`
#[must_use]
pub fn from_client_header(ctx: &CallerContext) -> Option<SessionKey> {
    ctx.client_header
        .as_deref()
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .map(SessionKey::new)
}

/// Remote socket address
#[must_use]
pub fn from_remote_addr(ctx: &CallerContext) -> Option<SessionKey> {
    ctx.remote_addr
        .as_deref()
        .filter(|addr| !addr.is_empty())
        .map(SessionKey::new)
}

/// Run `chain` over `ctx`, falling back to the anonymous key
#[must_use]
pub fn resolve(chain: &[KeyStrategy], ctx: &CallerContext) -> SessionKey {
    chain
        .iter()
        .find_map(|strategy| strategy(ctx))
        .unwrap_or_else(SessionKey::anonymous)
}
