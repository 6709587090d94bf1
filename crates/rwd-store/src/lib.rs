//! RWD Store - session-isolated in-memory storage
//!
//! One immutable [`SeedDataset`] shared by everyone, one [`SessionOverlay`]
//! per session key. Reads merge the two through an [`EffectiveView`]; writes
//! go through the [`Resolver`] and only ever touch the caller's overlay.
//!
//! # Architecture
//!
//! ```text
//! SessionKey ──► IsolationGate ──► SessionStore (moka) ──► Mutex<SessionOverlay>
//!                                                         │
//!                         SeedDataset (Arc, read-only) ───┴──► EffectiveView / Resolver
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rwd_model::{IdAllocator, MonotonicClock, NewUser, Timestamp};
//! use rwd_store::{IsolationMode, Resolver, SeedDataset, SessionKey, SessionStore, StoreConfig};
//!
//! let ids = Arc::new(IdAllocator::new());
//! let at = Timestamp::from_millis(0).unwrap();
//! let seed = Arc::new(SeedDataset::demo(&ids, at, "").unwrap());
//! let resolver = Resolver::new(seed, ids, Arc::new(MonotonicClock::new()));
//! let store = SessionStore::new(resolver, IsolationMode::PerCaller.gate(), StoreConfig::default());
//!
//! let alice = SessionKey::new("10.0.0.1");
//! let input = NewUser {
//!     email: Some("alice@example.org".into()),
//!     username: Some("alice".into()),
//!     password: Some("secret".into()),
//! };
//! store.register(&alice, input).unwrap();
//!
//! let bob = SessionKey::new("10.0.0.2");
//! assert!(store.resolve_view(&bob, |view| view.user_by_username("alice").is_none()));
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod gate;
pub mod limits;
pub mod overlay;
pub mod resolver;
pub mod seed;
pub mod session;
pub mod store;
pub mod tokens;
pub mod view;

pub use error::{ResourceKind, StoreError, StoreResult};
pub use gate::{IsolationGate, IsolationMode, PerCallerGate, SharedGate};
pub use limits::SessionLimits;
pub use overlay::{Edge, Entry, OverlayStats, SessionOverlay};
pub use resolver::Resolver;
pub use seed::{Page, SeedArticle, SeedBuilder, SeedDataset};
pub use session::SessionKey;
pub use store::{Authenticated, SessionStore, SharedOverlay, StoreConfig};
pub use tokens::{AuthToken, TokenBinding, TokenRegistry};
pub use view::{ArticleFilter, ArticlePage, EffectiveView};
