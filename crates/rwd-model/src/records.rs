//! Stored records
//!
//! Records are plain values. Relations (follows, favorites) are edges kept by
//! the store, not fields here.

use crate::clock::Timestamp;
use crate::ids::{ArticleId, CommentId, UserId};

/// Registered account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Identifier
    pub id: UserId,
    /// Login email
    pub email: String,
    /// Public handle
    pub username: String,
    /// Hex SHA-256 of the password
    pub password_hash: String,
    /// Profile text
    pub bio: String,
    /// Avatar URL
    pub image: String,
    /// Registration time
    pub created_at: Timestamp,
}

/// Published article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Identifier
    pub id: ArticleId,
    /// URL key, unique within one session's view
    pub slug: String,
    /// Title
    pub title: String,
    /// Short description
    pub description: String,
    /// Markdown body
    pub body: String,
    /// Sorted, deduplicated tags
    pub tag_list: Vec<String>,
    /// Author
    pub author_id: UserId,
    /// Creation time
    pub created_at: Timestamp,
    /// Last modification time
    pub updated_at: Timestamp,
}

impl Article {
    /// Check whether the article carries `tag`
    #[inline]
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag_list.binary_search_by(|t| t.as_str().cmp(tag)).is_ok()
    }
}

/// Comment on an article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Identifier
    pub id: CommentId,
    /// Commented article
    pub article_id: ArticleId,
    /// Author
    pub author_id: UserId,
    /// Text
    pub body: String,
    /// Creation time
    pub created_at: Timestamp,
    /// Last modification time
    pub updated_at: Timestamp,
}

/// Normalize a tag list: sorted, without duplicates
#[must_use]
pub fn normalize_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut tags: Vec<String> = tags.into_iter().collect();
    tags.sort();
    tags.dedup();
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_sorted_and_deduplicated() {
        let tags = normalize_tags(vec!["rust".into(), "async".into(), "rust".into()]);
        assert_eq!(tags, vec!["async".to_string(), "rust".to_string()]);
    }

    #[test]
    fn has_tag_uses_sorted_list() {
        let article = Article {
            id: ArticleId(1),
            slug: "a".into(),
            title: "A".into(),
            description: String::new(),
            body: String::new(),
            tag_list: normalize_tags(vec!["b".into(), "a".into(), "c".into()]),
            author_id: UserId(1),
            created_at: Timestamp::from_millis(0).unwrap(),
            updated_at: Timestamp::from_millis(0).unwrap(),
        };
        assert!(article.has_tag("b"));
        assert!(!article.has_tag("d"));
    }
}
