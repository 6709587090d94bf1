//! Typed identifiers and the process-wide id allocator
//!
//! Every record id in the process comes from one [`IdAllocator`]. The seed
//! dataset draws its ids first, overlays draw theirs afterwards, so ids never
//! collide across the seed and any number of sessions.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw numeric value
            #[inline]
            #[must_use]
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

record_id!(
    /// User identifier
    UserId
);
record_id!(
    /// Article identifier
    ArticleId
);
record_id!(
    /// Comment identifier (exposed on the wire as an integer)
    CommentId
);

/// Monotonic id source shared by the seed dataset and all overlays
#[derive(Debug)]
pub struct IdAllocator {
    users: AtomicU64,
    articles: AtomicU64,
    comments: AtomicU64,
}

impl IdAllocator {
    /// Create allocator whose first id of every kind is 1
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: AtomicU64::new(1),
            articles: AtomicU64::new(1),
            comments: AtomicU64::new(1),
        }
    }

    /// Allocate next user id
    #[inline]
    pub fn next_user(&self) -> UserId {
        UserId(self.users.fetch_add(1, Ordering::SeqCst))
    }

    /// Allocate next article id
    #[inline]
    pub fn next_article(&self) -> ArticleId {
        ArticleId(self.articles.fetch_add(1, Ordering::SeqCst))
    }

    /// Allocate next comment id
    #[inline]
    pub fn next_comment(&self) -> CommentId {
        CommentId(self.comments.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
