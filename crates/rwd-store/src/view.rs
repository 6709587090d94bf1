//! Effective view: one session's overlay laid over the seed
//!
//! Built per request, borrowed from the seed and a locked overlay, never
//! stored. Lookup rule for every record kind: an overlay entry for the id wins
//! (live value or tombstone); only ids the overlay has never touched fall
//! through to the seed.

use crate::overlay::{Edge, SessionOverlay};
use crate::seed::{newest_first, Page, SeedDataset};
use rwd_model::{slugify, Article, ArticleId, Comment, CommentId, User, UserId};
use std::collections::BTreeSet;

/// Filters of the article listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    /// Only articles carrying this tag
    pub tag: Option<String>,
    /// Only articles written by this username
    pub author: Option<String>,
    /// Only articles favorited by this username
    pub favorited: Option<String>,
}

impl ArticleFilter {
    /// Filter by tag
    #[inline]
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Filter by author username
    #[inline]
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Filter by favoriting username
    #[inline]
    #[must_use]
    pub fn with_favorited(mut self, username: impl Into<String>) -> Self {
        self.favorited = Some(username.into());
        self
    }
}

/// One page of articles plus the unpaginated total
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticlePage<'a> {
    /// Articles in the requested window
    pub articles: Vec<&'a Article>,
    /// Matches before pagination
    pub total: usize,
}

/// Read-only merge of seed and overlay
#[derive(Debug, Clone, Copy)]
pub struct EffectiveView<'a> {
    seed: &'a SeedDataset,
    overlay: &'a SessionOverlay,
}

impl<'a> EffectiveView<'a> {
    /// Create view
    #[inline]
    #[must_use]
    pub fn new(seed: &'a SeedDataset, overlay: &'a SessionOverlay) -> Self {
        Self { seed, overlay }
    }

    /// Underlying seed
    #[inline]
    #[must_use]
    pub fn seed(&self) -> &'a SeedDataset {
        self.seed
    }

    /// Underlying overlay
    #[inline]
    #[must_use]
    pub fn overlay(&self) -> &'a SessionOverlay {
        self.overlay
    }

    // Users

    /// User by id
    #[must_use]
    pub fn user(&self, id: UserId) -> Option<&'a User> {
        match self.overlay.user_entry(id) {
            Some(entry) => entry.live(),
            None => self.seed.user(id),
        }
    }

    /// User by username
    #[must_use]
    pub fn user_by_username(&self, username: &str) -> Option<&'a User> {
        self.overlay
            .live_users()
            .find(|u| u.username == username)
            .or_else(|| {
                self.seed
                    .user_by_username(username)
                    .filter(|u| self.overlay.user_entry(u.id).is_none())
            })
    }

    /// User by email
    #[must_use]
    pub fn user_by_email(&self, email: &str) -> Option<&'a User> {
        self.overlay
            .live_users()
            .find(|u| u.email == email)
            .or_else(|| {
                self.seed
                    .user_by_email(email)
                    .filter(|u| self.overlay.user_entry(u.id).is_none())
            })
    }

    /// Every visible user
    #[must_use]
    pub fn users(&self) -> Vec<&'a User> {
        self.seed
            .users()
            .filter(|u| self.overlay.user_entry(u.id).is_none())
            .chain(self.overlay.live_users())
            .collect()
    }

    // Articles

    /// Article by id
    #[must_use]
    pub fn article(&self, id: ArticleId) -> Option<&'a Article> {
        match self.overlay.article_entry(id) {
            Some(entry) => entry.live(),
            None => self.seed.article(id),
        }
    }

    /// Article by slug
    #[must_use]
    pub fn article_by_slug(&self, slug: &str) -> Option<&'a Article> {
        self.overlay
            .live_articles()
            .find(|a| a.slug == slug)
            .or_else(|| {
                self.seed
                    .article_by_slug(slug)
                    .filter(|a| self.overlay.article_entry(a.id).is_none())
            })
    }

    /// Every visible article, unordered
    pub fn articles(&self) -> impl Iterator<Item = &'a Article> + 'a {
        let overlay = self.overlay;
        self.seed
            .articles()
            .filter(move |a| overlay.article_entry(a.id).is_none())
            .chain(overlay.live_articles())
    }

    /// Visible articles carrying `tag`, unordered
    ///
    /// Seed articles come from the seed's tag index; any the overlay touched
    /// are answered by the overlay instead.
    #[must_use]
    pub fn articles_tagged(&self, tag: &str) -> Vec<&'a Article> {
        let overlay = self.overlay;
        self.seed
            .articles_tagged(tag)
            .filter(|a| overlay.article_entry(a.id).is_none())
            .chain(overlay.live_articles().filter(|a| a.has_tag(tag)))
            .collect()
    }

    /// Whether `slug` is taken by a visible article other than `except`
    #[must_use]
    pub fn slug_taken(&self, slug: &str, except: Option<ArticleId>) -> bool {
        self.article_by_slug(slug)
            .is_some_and(|a| Some(a.id) != except)
    }

    /// Slug for `title` that no other visible article uses
    ///
    /// Collisions get `-1`, `-2`, ... appended to the base slug.
    #[must_use]
    pub fn unique_slug(&self, title: &str, except: Option<ArticleId>) -> String {
        let base = slugify(title);
        if !self.slug_taken(&base, except) {
            return base;
        }
        let mut n = 1_u64;
        loop {
            let candidate = format!("{base}-{n}");
            if !self.slug_taken(&candidate, except) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Filtered, paginated article listing, newest first
    #[must_use]
    pub fn list_articles(&self, filter: &ArticleFilter, page: Page) -> ArticlePage<'a> {
        let author = match filter.author.as_deref() {
            Some(name) => match self.user_by_username(name) {
                Some(user) => Some(user.id),
                None => return ArticlePage::empty(),
            },
            None => None,
        };
        let favorited = match filter.favorited.as_deref() {
            Some(name) => match self.user_by_username(name) {
                Some(user) => Some(self.favorites_of(user.id)),
                None => return ArticlePage::empty(),
            },
            None => None,
        };

        let candidates = match filter.tag.as_deref() {
            Some(tag) => self.articles_tagged(tag),
            None => self.articles().collect(),
        };
        let matches: Vec<&'a Article> = candidates
            .into_iter()
            .filter(|a| author.map_or(true, |id| a.author_id == id))
            .filter(|a| favorited.as_ref().map_or(true, |set| set.contains(&a.id)))
            .collect();
        ArticlePage::ordered(matches, page)
    }

    /// Articles by users `follower` follows, newest first
    #[must_use]
    pub fn feed(&self, follower: UserId, page: Page) -> ArticlePage<'a> {
        let followees = self.followees(follower);
        let matches: Vec<&'a Article> = self
            .articles()
            .filter(|a| followees.contains(&a.author_id))
            .collect();
        ArticlePage::ordered(matches, page)
    }

    /// Every tag on a visible article, sorted
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        self.articles()
            .flat_map(|a| a.tag_list.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    // Comments

    /// Comment by id; hidden when its article is not visible
    #[must_use]
    pub fn comment(&self, id: CommentId) -> Option<&'a Comment> {
        let comment = match self.overlay.comment_entry(id) {
            Some(entry) => entry.live(),
            None => self.seed.comment(id),
        }?;
        self.article(comment.article_id).map(|_| comment)
    }

    /// Comments of `article`, newest first
    #[must_use]
    pub fn comments_for(&self, article: ArticleId) -> Vec<&'a Comment> {
        if self.article(article).is_none() {
            return Vec::new();
        }
        let mut comments: Vec<&'a Comment> = self
            .seed
            .comments_for(article)
            .filter(|c| self.overlay.comment_entry(c.id).is_none())
            .chain(self.overlay.live_comments().filter(|c| c.article_id == article))
            .collect();
        comments.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        comments
    }

    // Relations

    /// Whether `follower` follows `followee`
    #[must_use]
    pub fn is_following(&self, follower: UserId, followee: UserId) -> bool {
        match self.overlay.follow_edge(follower, followee) {
            Some(edge) => edge == Edge::Added,
            None => self.seed.is_following(follower, followee),
        }
    }

    /// Users `follower` follows
    #[must_use]
    pub fn followees(&self, follower: UserId) -> BTreeSet<UserId> {
        let mut set: BTreeSet<UserId> = self
            .seed
            .followees(follower)
            .filter(|followee| self.overlay.follow_edge(follower, *followee).is_none())
            .collect();
        set.extend(
            self.overlay
                .follow_edges()
                .filter(|((src, _), edge)| *src == follower && *edge == Edge::Added)
                .map(|((_, dst), _)| dst),
        );
        set
    }

    /// Whether `user` favorited `article`
    #[must_use]
    pub fn is_favorited(&self, user: UserId, article: ArticleId) -> bool {
        match self.overlay.favorite_edge(user, article) {
            Some(edge) => edge == Edge::Added,
            None => self.seed.is_favorited(user, article),
        }
    }

    /// Articles `user` favorited
    #[must_use]
    pub fn favorites_of(&self, user: UserId) -> BTreeSet<ArticleId> {
        let mut set: BTreeSet<ArticleId> = self
            .seed
            .favorites_of(user)
            .filter(|article| self.overlay.favorite_edge(user, *article).is_none())
            .collect();
        set.extend(
            self.overlay
                .favorite_edges()
                .filter(|((src, _), edge)| *src == user && *edge == Edge::Added)
                .map(|((_, dst), _)| dst),
        );
        set
    }

    /// Number of users who favorited `article`
    #[must_use]
    pub fn favorites_count(&self, article: ArticleId) -> usize {
        let from_seed = self
            .seed
            .favorited_by(article)
            .filter(|user| self.overlay.favorite_edge(*user, article).is_none())
            .count();
        let from_overlay = self
            .overlay
            .favorite_edges()
            .filter(|((_, dst), edge)| *dst == article && *edge == Edge::Added)
            .count();
        from_seed + from_overlay
    }
}

impl<'a> ArticlePage<'a> {
    fn empty() -> Self {
        Self {
            articles: Vec::new(),
            total: 0,
        }
    }

    fn ordered(mut matches: Vec<&'a Article>, page: Page) -> Self {
        matches.sort_by(|a, b| newest_first(a, b));
        let total = matches.len();
        Self {
            articles: page.slice(matches),
            total,
        }
    }
}
