//! Per-session resource caps

use crate::error::{ResourceKind, StoreError};

/// Upper bounds on what one session may create; `None` means unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionLimits {
    /// Accounts registered in the session
    pub max_users: Option<usize>,
    /// Articles created in the session
    pub max_articles: Option<usize>,
    /// Comments created in the session
    pub max_comments: Option<usize>,
    /// Follow edges added in the session
    pub max_follows: Option<usize>,
    /// Favorite edges added in the session
    pub max_favorites: Option<usize>,
}

impl SessionLimits {
    /// No caps at all
    #[inline]
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Set user cap
    #[inline]
    #[must_use]
    pub fn with_max_users(mut self, max: usize) -> Self {
        self.max_users = Some(max);
        self
    }

    /// Set article cap
    #[inline]
    #[must_use]
    pub fn with_max_articles(mut self, max: usize) -> Self {
        self.max_articles = Some(max);
        self
    }

    /// Set comment cap
    #[inline]
    #[must_use]
    pub fn with_max_comments(mut self, max: usize) -> Self {
        self.max_comments = Some(max);
        self
    }

    /// Set follow cap
    #[inline]
    #[must_use]
    pub fn with_max_follows(mut self, max: usize) -> Self {
        self.max_follows = Some(max);
        self
    }

    /// Set favorite cap
    #[inline]
    #[must_use]
    pub fn with_max_favorites(mut self, max: usize) -> Self {
        self.max_favorites = Some(max);
        self
    }

    /// Configured cap for `kind`
    #[inline]
    #[must_use]
    pub fn limit(&self, kind: ResourceKind) -> Option<usize> {
        match kind {
            ResourceKind::Users => self.max_users,
            ResourceKind::Articles => self.max_articles,
            ResourceKind::Comments => self.max_comments,
            ResourceKind::Follows => self.max_follows,
            ResourceKind::Favorites => self.max_favorites,
        }
    }

    /// Check that one more `kind` fits next to `current` live ones
    ///
    /// # Errors
    /// `StoreError::ResourceLimitExceeded` when the cap is already reached.
    pub fn ensure_room(&self, kind: ResourceKind, current: usize) -> Result<(), StoreError> {
        match self.limit(kind) {
            Some(limit) if current >= limit => {
                tracing::warn!(
                    target: "security",
                    kind = kind.as_str(),
                    limit,
                    "session resource limit reached"
                );
                Err(StoreError::ResourceLimitExceeded { kind, limit })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_always_has_room() {
        let limits = SessionLimits::unbounded();
        assert!(limits.ensure_room(ResourceKind::Articles, usize::MAX - 1).is_ok());
    }

    #[test]
    fn cap_rejects_at_limit() {
        let limits = SessionLimits::unbounded().with_max_comments(2);
        assert!(limits.ensure_room(ResourceKind::Comments, 1).is_ok());
        assert_eq!(
            limits.ensure_room(ResourceKind::Comments, 2),
            Err(StoreError::ResourceLimitExceeded {
                kind: ResourceKind::Comments,
                limit: 2
            })
        );
        assert!(limits.ensure_room(ResourceKind::Users, 100).is_ok());
    }

    #[test]
    fn zero_cap_forbids_everything() {
        let limits = SessionLimits::unbounded().with_max_follows(0);
        assert!(limits.ensure_room(ResourceKind::Follows, 0).is_err());
    }
}
