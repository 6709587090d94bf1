//! Per-session overlay
//!
//! Records what one session changed relative to the seed. Records are keyed
//! by id; an id present here shadows the seed's record of the same id
//! entirely. Edges are keyed by `(source, target)`; an edge present here
//! overrides the seed's answer for that pair.

use rwd_model::{Article, ArticleId, Comment, CommentId, User, UserId};
use std::collections::BTreeMap;

/// Overlay state of one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry<T> {
    /// Created in this session; absent from the seed
    Created(T),
    /// Seed record replaced in this session
    Modified(T),
    /// Seed record hidden in this session
    Deleted,
}

impl<T> Entry<T> {
    /// Visible record, if any
    #[inline]
    #[must_use]
    pub fn live(&self) -> Option<&T> {
        match self {
            Self::Created(value) | Self::Modified(value) => Some(value),
            Self::Deleted => None,
        }
    }

    /// Check if created in this session
    #[inline]
    #[must_use]
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    /// Check if tombstone
    #[inline]
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

/// Overlay state of one relation edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Edge exists in this session
    Added,
    /// Seed edge hidden in this session
    Removed,
}

/// Size summary of one overlay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayStats {
    /// Users created
    pub users: usize,
    /// Articles created
    pub articles: usize,
    /// Comments created
    pub comments: usize,
    /// Follow edges added
    pub follows: usize,
    /// Favorite edges added
    pub favorites: usize,
    /// Seed records modified
    pub modified: usize,
    /// Seed records and edges hidden
    pub tombstones: usize,
    /// Mutations applied so far
    pub writes: u64,
}

/// Mutations recorded by one session
#[derive(Debug, Default)]
pub struct SessionOverlay {
    users: BTreeMap<UserId, Entry<User>>,
    articles: BTreeMap<ArticleId, Entry<Article>>,
    comments: BTreeMap<CommentId, Entry<Comment>>,
    follows: BTreeMap<(UserId, UserId), Edge>,
    favorites: BTreeMap<(UserId, ArticleId), Edge>,
    writes: u64,
}

fn put<K: Ord, T>(map: &mut BTreeMap<K, Entry<T>>, key: K, value: T, seeded: bool) {
    let entry = if seeded {
        Entry::Modified(value)
    } else {
        Entry::Created(value)
    };
    map.insert(key, entry);
}

fn remove<K: Ord, T>(map: &mut BTreeMap<K, Entry<T>>, key: K, seeded: bool) {
    if seeded {
        map.insert(key, Entry::Deleted);
    } else {
        map.remove(&key);
    }
}

fn set_edge<K: Ord>(map: &mut BTreeMap<K, Edge>, key: K, on: bool, in_seed: bool) {
    match (on, in_seed) {
        (true, true) | (false, false) => {
            map.remove(&key);
        }
        (true, false) => {
            map.insert(key, Edge::Added);
        }
        (false, true) => {
            map.insert(key, Edge::Removed);
        }
    }
}

fn count_created<K, T>(map: &BTreeMap<K, Entry<T>>) -> usize {
    map.values().filter(|e| e.is_created()).count()
}

fn count_added<K>(map: &BTreeMap<K, Edge>) -> usize {
    map.values().filter(|e| **e == Edge::Added).count()
}

impl SessionOverlay {
    /// Create empty overlay
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay entry for a user id
    #[inline]
    #[must_use]
    pub fn user_entry(&self, id: UserId) -> Option<&Entry<User>> {
        self.users.get(&id)
    }

    /// Overlay entry for an article id
    #[inline]
    #[must_use]
    pub fn article_entry(&self, id: ArticleId) -> Option<&Entry<Article>> {
        self.articles.get(&id)
    }

    /// Overlay entry for a comment id
    #[inline]
    #[must_use]
    pub fn comment_entry(&self, id: CommentId) -> Option<&Entry<Comment>> {
        self.comments.get(&id)
    }

    /// Overlay state of a follow edge
    #[inline]
    #[must_use]
    pub fn follow_edge(&self, follower: UserId, followee: UserId) -> Option<Edge> {
        self.follows.get(&(follower, followee)).copied()
    }

    /// Overlay state of a favorite edge
    #[inline]
    #[must_use]
    pub fn favorite_edge(&self, user: UserId, article: ArticleId) -> Option<Edge> {
        self.favorites.get(&(user, article)).copied()
    }

    /// Visible users recorded here
    pub fn live_users(&self) -> impl Iterator<Item = &User> {
        self.users.values().filter_map(Entry::live)
    }

    /// Visible articles recorded here
    pub fn live_articles(&self) -> impl Iterator<Item = &Article> {
        self.articles.values().filter_map(Entry::live)
    }

    /// Visible comments recorded here
    pub fn live_comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments.values().filter_map(Entry::live)
    }

    /// All follow overrides
    pub fn follow_edges(&self) -> impl Iterator<Item = ((UserId, UserId), Edge)> + '_ {
        self.follows.iter().map(|(k, v)| (*k, *v))
    }

    /// All favorite overrides
    pub fn favorite_edges(&self) -> impl Iterator<Item = ((UserId, ArticleId), Edge)> + '_ {
        self.favorites.iter().map(|(k, v)| (*k, *v))
    }

    /// Store a user; `seeded` marks ids that exist in the seed
    pub fn put_user(&mut self, user: User, seeded: bool) {
        put(&mut self.users, user.id, user, seeded);
        self.writes += 1;
    }

    /// Store an article
    pub fn put_article(&mut self, article: Article, seeded: bool) {
        put(&mut self.articles, article.id, article, seeded);
        self.writes += 1;
    }

    /// Store a comment
    pub fn put_comment(&mut self, comment: Comment, seeded: bool) {
        put(&mut self.comments, comment.id, comment, seeded);
        self.writes += 1;
    }

    /// Hide an article: tombstone for seed ids, plain removal otherwise
    pub fn remove_article(&mut self, id: ArticleId, seeded: bool) {
        remove(&mut self.articles, id, seeded);
        self.writes += 1;
    }

    /// Hide a comment
    pub fn remove_comment(&mut self, id: CommentId, seeded: bool) {
        remove(&mut self.comments, id, seeded);
        self.writes += 1;
    }

    /// Set a follow edge; `in_seed` is the seed's answer for the pair
    pub fn set_follow(&mut self, follower: UserId, followee: UserId, on: bool, in_seed: bool) {
        set_edge(&mut self.follows, (follower, followee), on, in_seed);
        self.writes += 1;
    }

    /// Set a favorite edge
    pub fn set_favorite(&mut self, user: UserId, article: ArticleId, on: bool, in_seed: bool) {
        set_edge(&mut self.favorites, (user, article), on, in_seed);
        self.writes += 1;
    }

    /// Users created in this session
    #[must_use]
    pub fn created_users(&self) -> usize {
        count_created(&self.users)
    }

    /// Articles created in this session and still live
    #[must_use]
    pub fn created_articles(&self) -> usize {
        count_created(&self.articles)
    }

    /// Comments created in this session and still live
    #[must_use]
    pub fn created_comments(&self) -> usize {
        count_created(&self.comments)
    }

    /// Follow edges added on top of the seed
    #[must_use]
    pub fn added_follows(&self) -> usize {
        count_added(&self.follows)
    }

    /// Favorite edges added on top of the seed
    #[must_use]
    pub fn added_favorites(&self) -> usize {
        count_added(&self.favorites)
    }

    /// Size summary
    #[must_use]
    pub fn stats(&self) -> OverlayStats {
        let modified = self
            .users
            .values()
            .filter(|e| matches!(e, Entry::Modified(_)))
            .count()
            + self
                .articles
                .values()
                .filter(|e| matches!(e, Entry::Modified(_)))
                .count()
            + self
                .comments
                .values()
                .filter(|e| matches!(e, Entry::Modified(_)))
                .count();
        let tombstones = self.articles.values().filter(|e| e.is_deleted()).count()
            + self.comments.values().filter(|e| e.is_deleted()).count()
            + self.follows.values().filter(|e| **e == Edge::Removed).count()
            + self.favorites.values().filter(|e| **e == Edge::Removed).count();
        OverlayStats {
            users: self.created_users(),
            articles: self.created_articles(),
            comments: self.created_comments(),
            follows: self.added_follows(),
            favorites: self.added_favorites(),
            modified,
            tombstones,
            writes: self.writes,
        }
    }
}
