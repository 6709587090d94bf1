//! Resource resolver
//!
//! Every write follows the same two steps:
//! 1. validate against the caller's [`EffectiveView`] (input, existence,
//!    ownership, uniqueness, caps) without touching the overlay
//! 2. apply the mutation to the overlay
//!
//! A write that fails in step 1 leaves the overlay exactly as it was.

use crate::error::{ResourceKind, StoreError, StoreResult};
use crate::limits::SessionLimits;
use crate::overlay::{Edge, SessionOverlay};
use crate::seed::SeedDataset;
use crate::view::EffectiveView;
use rwd_model::{
    hash_password, verify_password, Article, ArticleChanges, Clock, Comment, CommentId,
    FieldLimits, IdAllocator, Login, NewArticle, NewComment, NewUser, User, UserChanges, UserId,
};
use std::sync::Arc;

/// Conflict message for a taken email or username
pub const USER_EXISTS: &str = "User already exists";
/// Missing profile
pub const PROFILE_NOT_FOUND: &str = "Profile not found";
/// Missing article
pub const ARTICLE_NOT_FOUND: &str = "Article not found";
/// Missing comment
pub const COMMENT_NOT_FOUND: &str = "Comment not found";

/// Applies reads and writes of one session against seed + overlay
#[derive(Debug, Clone)]
pub struct Resolver {
    seed: Arc<SeedDataset>,
    ids: Arc<IdAllocator>,
    clock: Arc<dyn Clock>,
    limits: SessionLimits,
    fields: FieldLimits,
    default_image: String,
}

impl Resolver {
    /// Create resolver with no caps and default field limits
    #[must_use]
    pub fn new(seed: Arc<SeedDataset>, ids: Arc<IdAllocator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            seed,
            ids,
            clock,
            limits: SessionLimits::unbounded(),
            fields: FieldLimits::default(),
            default_image: String::new(),
        }
    }

    /// Set per-session caps
    #[inline]
    #[must_use]
    pub fn with_session_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set field limits
    #[inline]
    #[must_use]
    pub fn with_field_limits(mut self, fields: FieldLimits) -> Self {
        self.fields = fields;
        self
    }

    /// Set image given to newly registered users
    #[inline]
    #[must_use]
    pub fn with_default_image(mut self, image: impl Into<String>) -> Self {
        self.default_image = image.into();
        self
    }

    /// Shared seed
    #[inline]
    #[must_use]
    pub fn seed(&self) -> &Arc<SeedDataset> {
        &self.seed
    }

    /// Configured caps
    #[inline]
    #[must_use]
    pub fn session_limits(&self) -> &SessionLimits {
        &self.limits
    }

    /// Configured field limits
    #[inline]
    #[must_use]
    pub fn field_limits(&self) -> &FieldLimits {
        &self.fields
    }

    /// View of `overlay` over the seed
    #[inline]
    #[must_use]
    pub fn view<'a>(&'a self, overlay: &'a SessionOverlay) -> EffectiveView<'a> {
        EffectiveView::new(&self.seed, overlay)
    }

    // Users

    /// Register a new account in this session
    ///
    /// # Errors
    /// - `Validation` on missing or over-length fields
    /// - `Conflict` when the email or username is already visible
    /// - `ResourceLimitExceeded` when the user cap is reached
    pub fn register(&self, overlay: &mut SessionOverlay, input: NewUser) -> StoreResult<User> {
        let registration = input.validate(&self.fields)?;
        {
            let view = self.view(overlay);
            if view.user_by_email(&registration.email).is_some()
                || view.user_by_username(&registration.username).is_some()
            {
                return Err(StoreError::Conflict(USER_EXISTS.to_string()));
            }
        }
        self.limits
            .ensure_room(ResourceKind::Users, overlay.created_users())?;

        let user = User {
            id: self.ids.next_user(),
            email: registration.email,
            username: registration.username,
            password_hash: hash_password(&registration.password),
            bio: String::new(),
            image: self.default_image.clone(),
            created_at: self.clock.now(),
        };
        overlay.put_user(user.clone(), false);
        tracing::info!(target: "storage", user = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Find the account matching `login` in this session
    #[must_use]
    pub fn authenticate(&self, overlay: &SessionOverlay, login: &Login) -> Option<User> {
        self.view(overlay)
            .user_by_email(&login.email)
            .filter(|user| verify_password(&login.password, &user.password_hash))
            .cloned()
    }

    /// Update the current user's profile
    ///
    /// # Errors
    /// - `Validation` on over-length or empty fields
    /// - `Unauthorized` when `user` is not visible
    /// - `Conflict` when the new email or username belongs to someone else
    pub fn update_user(
        &self,
        overlay: &mut SessionOverlay,
        user: UserId,
        changes: UserChanges,
    ) -> StoreResult<User> {
        let changes = changes.validate(&self.fields)?;
        let updated = {
            let view = self.view(overlay);
            let mut current = view.user(user).cloned().ok_or_else(StoreError::unauthorized)?;

            if let Some(email) = changes.email {
                if email != current.email && view.user_by_email(&email).is_some() {
                    return Err(StoreError::Conflict(USER_EXISTS.to_string()));
                }
                current.email = email;
            }
            if let Some(username) = changes.username {
                if username != current.username && view.user_by_username(&username).is_some() {
                    return Err(StoreError::Conflict(USER_EXISTS.to_string()));
                }
                current.username = username;
            }
            if let Some(password) = changes.password {
                current.password_hash = hash_password(&password);
            }
            if let Some(bio) = changes.bio {
                current.bio = bio;
            }
            if let Some(image) = changes.image {
                current.image = image;
            }
            current
        };

        let seeded = self.seed.user(user).is_some();
        overlay.put_user(updated.clone(), seeded);
        tracing::info!(target: "storage", user = %user, "user updated");
        Ok(updated)
    }

    /// Follow `username`; following twice is a no-op
    ///
    /// # Errors
    /// - `NotFound` when the profile is not visible
    /// - `Validation` when following oneself
    /// - `ResourceLimitExceeded` when the follow cap is reached
    pub fn follow(
        &self,
        overlay: &mut SessionOverlay,
        follower: UserId,
        username: &str,
    ) -> StoreResult<User> {
        let (target, already) = {
            let view = self.view(overlay);
            actor(&view, follower)?;
            let target = view
                .user_by_username(username)
                .cloned()
                .ok_or_else(|| StoreError::not_found(PROFILE_NOT_FOUND))?;
            if target.id == follower {
                return Err(StoreError::validation("Cannot follow yourself"));
            }
            let already = view.is_following(follower, target.id);
            (target, already)
        };

        if !already {
            let in_seed = self.seed.is_following(follower, target.id);
            if !in_seed {
                self.limits
                    .ensure_room(ResourceKind::Follows, overlay.added_follows())?;
            }
            overlay.set_follow(follower, target.id, true, in_seed);
            tracing::info!(target: "storage", follower = %follower, followee = %target.id, "user followed");
        }
        Ok(target)
    }

    /// Stop following `username`; unfollowing twice is a no-op
    ///
    /// # Errors
    /// `NotFound` when the profile is not visible.
    pub fn unfollow(
        &self,
        overlay: &mut SessionOverlay,
        follower: UserId,
        username: &str,
    ) -> StoreResult<User> {
        let (target, following) = {
            let view = self.view(overlay);
            actor(&view, follower)?;
            let target = view
                .user_by_username(username)
                .cloned()
                .ok_or_else(|| StoreError::not_found(PROFILE_NOT_FOUND))?;
            let following = view.is_following(follower, target.id);
            (target, following)
        };

        if following {
            let in_seed = self.seed.is_following(follower, target.id);
            overlay.set_follow(follower, target.id, false, in_seed);
            tracing::info!(target: "storage", follower = %follower, followee = %target.id, "user unfollowed");
        }
        Ok(target)
    }

    // Articles

    /// Publish an article; its slug is unique within this session's view
    ///
    /// # Errors
    /// - `Validation` on missing or over-length fields
    /// - `Unauthorized` when `author` is not visible
    /// - `ResourceLimitExceeded` when the article cap is reached
    pub fn create_article(
        &self,
        overlay: &mut SessionOverlay,
        author: UserId,
        input: NewArticle,
    ) -> StoreResult<Article> {
        let draft = input.validate(&self.fields)?;
        let slug = {
            let view = self.view(overlay);
            actor(&view, author)?;
            view.unique_slug(&draft.title, None)
        };
        self.limits
            .ensure_room(ResourceKind::Articles, overlay.created_articles())?;

        let now = self.clock.now();
        let article = Article {
            id: self.ids.next_article(),
            slug,
            title: draft.title,
            description: draft.description,
            body: draft.body,
            tag_list: draft.tag_list,
            author_id: author,
            created_at: now,
            updated_at: now,
        };
        overlay.put_article(article.clone(), false);
        tracing::info!(target: "storage", article = %article.id, slug = %article.slug, "article created");
        Ok(article)
    }

    /// Update an article owned by `actor`
    ///
    /// A changed title regenerates the slug from the new title.
    ///
    /// # Errors
    /// - `NotFound` when the slug is not visible
    /// - `Forbidden` when `actor` is not the author
    /// - `Validation` on over-length fields
    pub fn update_article(
        &self,
        overlay: &mut SessionOverlay,
        actor_id: UserId,
        slug: &str,
        changes: ArticleChanges,
    ) -> StoreResult<Article> {
        let updated = {
            let view = self.view(overlay);
            let mut article = view
                .article_by_slug(slug)
                .cloned()
                .ok_or_else(|| StoreError::not_found(ARTICLE_NOT_FOUND))?;
            if article.author_id != actor_id {
                return Err(StoreError::forbidden());
            }
            let changes = changes.validate(&self.fields)?;

            if let Some(title) = changes.title {
                if title != article.title {
                    article.slug = view.unique_slug(&title, Some(article.id));
                    article.title = title;
                }
            }
            if let Some(description) = changes.description {
                article.description = description;
            }
            if let Some(body) = changes.body {
                article.body = body;
            }
            if let Some(tags) = changes.tag_list {
                article.tag_list = tags;
            }
            article.updated_at = self.clock.now();
            article
        };

        let seeded = self.seed.article(updated.id).is_some();
        overlay.put_article(updated.clone(), seeded);
        tracing::info!(target: "storage", article = %updated.id, slug = %updated.slug, "article updated");
        Ok(updated)
    }

    /// Delete an article owned by `actor`, with its comments and favorites
    ///
    /// # Errors
    /// - `NotFound` when the slug is not visible
    /// - `Forbidden` when `actor` is not the author
    pub fn delete_article(
        &self,
        overlay: &mut SessionOverlay,
        actor_id: UserId,
        slug: &str,
    ) -> StoreResult<()> {
        let (article, created_comments, added_favorites) = {
            let view = self.view(overlay);
            let article = view
                .article_by_slug(slug)
                .ok_or_else(|| StoreError::not_found(ARTICLE_NOT_FOUND))?;
            if article.author_id != actor_id {
                return Err(StoreError::forbidden());
            }
            let created_comments: Vec<CommentId> = view
                .comments_for(article.id)
                .into_iter()
                .filter(|c| self.seed.comment(c.id).is_none())
                .map(|c| c.id)
                .collect();
            let added_favorites: Vec<UserId> = overlay
                .favorite_edges()
                .filter(|((_, dst), edge)| *dst == article.id && *edge == Edge::Added)
                .map(|((src, _), _)| src)
                .collect();
            (article.id, created_comments, added_favorites)
        };

        // Seed comments and favorites vanish with the article; only records
        // this session created need removing.
        for comment in created_comments {
            overlay.remove_comment(comment, false);
        }
        for user in added_favorites {
            overlay.set_favorite(user, article, false, false);
        }
        let seeded = self.seed.article(article).is_some();
        overlay.remove_article(article, seeded);
        tracing::info!(target: "storage", article = %article, slug, "article deleted");
        Ok(())
    }

    /// Favorite an article; favoriting twice is a no-op
    ///
    /// # Errors
    /// - `NotFound` when the slug is not visible
    /// - `ResourceLimitExceeded` when the favorite cap is reached
    pub fn favorite(
        &self,
        overlay: &mut SessionOverlay,
        user: UserId,
        slug: &str,
    ) -> StoreResult<Article> {
        let (article, already) = {
            let view = self.view(overlay);
            actor(&view, user)?;
            let article = view
                .article_by_slug(slug)
                .cloned()
                .ok_or_else(|| StoreError::not_found(ARTICLE_NOT_FOUND))?;
            let already = view.is_favorited(user, article.id);
            (article, already)
        };

        if !already {
            let in_seed = self.seed.is_favorited(user, article.id);
            if !in_seed {
                self.limits
                    .ensure_room(ResourceKind::Favorites, overlay.added_favorites())?;
            }
            overlay.set_favorite(user, article.id, true, in_seed);
            tracing::info!(target: "storage", user = %user, article = %article.id, "article favorited");
        }
        Ok(article)
    }

    /// Remove a favorite; unfavoriting twice is a no-op
    ///
    /// # Errors
    /// `NotFound` when the slug is not visible.
    pub fn unfavorite(
        &self,
        overlay: &mut SessionOverlay,
        user: UserId,
        slug: &str,
    ) -> StoreResult<Article> {
        let (article, favorited) = {
            let view = self.view(overlay);
            actor(&view, user)?;
            let article = view
                .article_by_slug(slug)
                .cloned()
                .ok_or_else(|| StoreError::not_found(ARTICLE_NOT_FOUND))?;
            let favorited = view.is_favorited(user, article.id);
            (article, favorited)
        };

        if favorited {
            let in_seed = self.seed.is_favorited(user, article.id);
            overlay.set_favorite(user, article.id, false, in_seed);
            tracing::info!(target: "storage", user = %user, article = %article.id, "article unfavorited");
        }
        Ok(article)
    }

    // Comments

    /// Comment on an article
    ///
    /// # Errors
    /// - `NotFound` when the slug is not visible
    /// - `Validation` on a missing or over-length body
    /// - `ResourceLimitExceeded` when the comment cap is reached
    pub fn add_comment(
        &self,
        overlay: &mut SessionOverlay,
        author: UserId,
        slug: &str,
        input: NewComment,
    ) -> StoreResult<Comment> {
        let article = {
            let view = self.view(overlay);
            actor(&view, author)?;
            view.article_by_slug(slug)
                .map(|a| a.id)
                .ok_or_else(|| StoreError::not_found(ARTICLE_NOT_FOUND))?
        };
        let draft = input.validate(&self.fields)?;
        self.limits
            .ensure_room(ResourceKind::Comments, overlay.created_comments())?;

        let now = self.clock.now();
        let comment = Comment {
            id: self.ids.next_comment(),
            article_id: article,
            author_id: author,
            body: draft.body,
            created_at: now,
            updated_at: now,
        };
        overlay.put_comment(comment.clone(), false);
        tracing::info!(target: "storage", comment = %comment.id, article = %article, "comment created");
        Ok(comment)
    }

    /// Delete a comment; allowed for its author and the article's author
    ///
    /// # Errors
    /// - `NotFound` when the article or comment is not visible
    /// - `Forbidden` for anyone else
    pub fn delete_comment(
        &self,
        overlay: &mut SessionOverlay,
        actor_id: UserId,
        slug: &str,
        id: CommentId,
    ) -> StoreResult<()> {
        {
            let view = self.view(overlay);
            let article = view
                .article_by_slug(slug)
                .ok_or_else(|| StoreError::not_found(ARTICLE_NOT_FOUND))?;
            let comment = view
                .comment(id)
                .filter(|c| c.article_id == article.id)
                .ok_or_else(|| StoreError::not_found(COMMENT_NOT_FOUND))?;
            if comment.author_id != actor_id && article.author_id != actor_id {
                return Err(StoreError::forbidden());
            }
        }

        let seeded = self.seed.comment(id).is_some();
        overlay.remove_comment(id, seeded);
        tracing::info!(target: "storage", comment = %id, "comment deleted");
        Ok(())
    }
}

fn actor<'v>(view: &EffectiveView<'v>, id: UserId) -> StoreResult<&'v User> {
    view.user(id).ok_or_else(StoreError::unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rwd_model::{ManualClock, Timestamp};

    fn resolver() -> Resolver {
        resolver_with(SessionLimits::unbounded())
    }

    fn resolver_with(limits: SessionLimits) -> Resolver {
        let ids = Arc::new(IdAllocator::new());
        let at = Timestamp::from_millis(1_704_067_200_000).unwrap();
        let seed = Arc::new(SeedDataset::demo(&ids, at, "img").unwrap());
        let clock = Arc::new(ManualClock::starting_at(1_704_067_300_000));
        Resolver::new(seed, ids, clock)
            .with_session_limits(limits)
            .with_default_image("default.png")
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            email: Some(format!("{name}@example.org")),
            username: Some(name.to_string()),
            password: Some("secret".to_string()),
        }
    }

    fn new_article(title: &str) -> NewArticle {
        NewArticle {
            title: Some(title.to_string()),
            description: Some("desc".to_string()),
            body: Some("body".to_string()),
            tag_list: Some(vec!["dragons".to_string()]),
        }
    }

    fn seed_user(resolver: &Resolver, name: &str) -> UserId {
        resolver.seed().user_by_username(name).unwrap().id
    }

    #[test]
    fn register_then_authenticate() {
        let resolver = resolver();
        let mut overlay = SessionOverlay::new();
        let user = resolver.register(&mut overlay, new_user("alice")).unwrap();
        assert_eq!(user.image, "default.png");
        assert!(user.bio.is_empty());

        let login = Login {
            email: "alice@example.org".into(),
            password: "secret".into(),
        };
        assert_eq!(resolver.authenticate(&overlay, &login).map(|u| u.id), Some(user.id));

        let wrong = Login {
            password: "nope".into(),
            ..login
        };
        assert!(resolver.authenticate(&overlay, &wrong).is_none());
    }

    #[test]
    fn register_rejects_seed_username() {
        let resolver = resolver();
        let mut overlay = SessionOverlay::new();
        let err = resolver.register(&mut overlay, new_user("johndoe")).unwrap_err();
        assert_eq!(err, StoreError::Conflict("User already exists".into()));
        assert_eq!(overlay.stats().writes, 0);
    }

    #[test]
    fn update_user_checks_uniqueness() {
        let resolver = resolver();
        let mut overlay = SessionOverlay::new();
        let alice = resolver.register(&mut overlay, new_user("alice")).unwrap();
        let writes = overlay.stats().writes;

        let clash = UserChanges {
            username: Some("janesmith".into()),
            ..UserChanges::default()
        };
        assert!(matches!(
            resolver.update_user(&mut overlay, alice.id, clash),
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(overlay.stats().writes, writes);

        let changes = UserChanges {
            bio: Some("hello".into()),
            password: Some("newpass".into()),
            ..UserChanges::default()
        };
        let updated = resolver.update_user(&mut overlay, alice.id, changes).unwrap();
        assert_eq!(updated.bio, "hello");
        assert!(verify_password("newpass", &updated.password_hash));
    }

    #[test]
    fn updating_seed_user_stays_in_overlay() {
        let resolver = resolver();
        let mut overlay = SessionOverlay::new();
        let john = seed_user(&resolver, "johndoe");
        let changes = UserChanges {
            bio: Some("changed".into()),
            ..UserChanges::default()
        };
        resolver.update_user(&mut overlay, john, changes).unwrap();

        assert_eq!(resolver.view(&overlay).user(john).unwrap().bio, "changed");
        assert_ne!(resolver.seed().user(john).unwrap().bio, "changed");
        assert_eq!(overlay.created_users(), 0);
    }

    #[test]
    fn follow_rules() {
        let resolver = resolver();
        let mut overlay = SessionOverlay::new();
        let john = seed_user(&resolver, "johndoe");

        let err = resolver.follow(&mut overlay, john, "johndoe").unwrap_err();
        assert_eq!(err.messages(), vec!["Cannot follow yourself"]);

        let err = resolver.follow(&mut overlay, john, "ghost").unwrap_err();
        assert_eq!(err, StoreError::NotFound("Profile not found".into()));

        // Already followed in the seed: nothing recorded.
        resolver.follow(&mut overlay, john, "janesmith").unwrap();
        assert_eq!(overlay.stats().writes, 0);

        resolver.follow(&mut overlay, john, "sarahchen").unwrap();
        assert_eq!(overlay.added_follows(), 1);
        resolver.unfollow(&mut overlay, john, "janesmith").unwrap();

        let view = resolver.view(&overlay);
        let followees = view.followees(john);
        assert!(followees.contains(&seed_user(&resolver, "sarahchen")));
        assert!(!followees.contains(&seed_user(&resolver, "janesmith")));
    }

    #[test]
    fn article_lifecycle() {
        let resolver = resolver();
        let mut overlay = SessionOverlay::new();
        let author = resolver.register(&mut overlay, new_user("alice")).unwrap().id;

        let article = resolver
            .create_article(&mut overlay, author, new_article("How to train your dragon"))
            .unwrap();
        assert_eq!(article.slug, "how-to-train-your-dragon");
        assert_eq!(article.created_at, article.updated_at);

        let changes = ArticleChanges {
            title: Some("How to tame your dragon".into()),
            body: Some("Patience".into()),
            ..ArticleChanges::default()
        };
        let updated = resolver
            .update_article(&mut overlay, author, &article.slug, changes)
            .unwrap();
        assert_eq!(updated.slug, "how-to-tame-your-dragon");
        assert_eq!(updated.body, "Patience");
        assert_eq!(updated.description, "desc");
        assert!(updated.updated_at > updated.created_at);

        let view = resolver.view(&overlay);
        assert!(view.article_by_slug("how-to-train-your-dragon").is_none());
        assert_eq!(view.article_by_slug("how-to-tame-your-dragon").unwrap().id, article.id);
    }

    #[test]
    fn colliding_titles_get_suffixes() {
        let resolver = resolver();
        let mut overlay = SessionOverlay::new();
        let author = resolver.register(&mut overlay, new_user("alice")).unwrap().id;

        let slugs: Vec<String> = (0..3)
            .map(|_| {
                resolver
                    .create_article(&mut overlay, author, new_article("Same Title"))
                    .unwrap()
                    .slug
            })
            .collect();
        assert_eq!(slugs, vec!["same-title", "same-title-1", "same-title-2"]);
    }

    #[test]
    fn only_author_may_edit_or_delete() {
        let resolver = resolver();
        let mut overlay = SessionOverlay::new();
        let alice = resolver.register(&mut overlay, new_user("alice")).unwrap().id;

        let err = resolver
            .update_article(
                &mut overlay,
                alice,
                "react-hooks-best-practices",
                ArticleChanges::default(),
            )
            .unwrap_err();
        assert_eq!(err, StoreError::Forbidden("Forbidden".into()));
        let err = resolver
            .delete_article(&mut overlay, alice, "react-hooks-best-practices")
            .unwrap_err();
        assert_eq!(err, StoreError::Forbidden("Forbidden".into()));
    }

    #[test]
    fn deleting_seed_article_tombstones_it() {
        let resolver = resolver();
        let mut overlay = SessionOverlay::new();
        let jane = seed_user(&resolver, "janesmith");
        let alice = resolver.register(&mut overlay, new_user("alice")).unwrap().id;
        resolver
            .add_comment(
                &mut overlay,
                alice,
                "react-hooks-best-practices",
                NewComment {
                    body: Some("first!".into()),
                },
            )
            .unwrap();
        resolver
            .favorite(&mut overlay, alice, "react-hooks-best-practices")
            .unwrap();

        resolver
            .delete_article(&mut overlay, jane, "react-hooks-best-practices")
            .unwrap();

        let stats = overlay.stats();
        assert_eq!(stats.comments, 0);
        assert_eq!(stats.favorites, 0);
        assert_eq!(stats.tombstones, 1);
        assert!(resolver
            .view(&overlay)
            .article_by_slug("react-hooks-best-practices")
            .is_none());
        assert!(resolver
            .seed()
            .article_by_slug("react-hooks-best-practices")
            .is_some());
    }

    #[test]
    fn comment_deletion_rights() {
        let resolver = resolver();
        let mut overlay = SessionOverlay::new();
        let alice = resolver.register(&mut overlay, new_user("alice")).unwrap().id;
        let bob = resolver.register(&mut overlay, new_user("bob")).unwrap().id;
        let jane = seed_user(&resolver, "janesmith");
        let slug = "react-hooks-best-practices";

        let comment = resolver
            .add_comment(
                &mut overlay,
                alice,
                slug,
                NewComment {
                    body: Some("hi".into()),
                },
            )
            .unwrap();

        assert_eq!(
            resolver.delete_comment(&mut overlay, bob, slug, comment.id),
            Err(StoreError::Forbidden("Forbidden".into()))
        );
        assert_eq!(
            resolver.delete_comment(&mut overlay, alice, "building-scalable-apis-with-node-js", comment.id),
            Err(StoreError::NotFound("Comment not found".into()))
        );
        // The article's author may remove comments on it.
        resolver.delete_comment(&mut overlay, jane, slug, comment.id).unwrap();
        assert!(resolver.view(&overlay).comment(comment.id).is_none());
    }

    #[test]
    fn caps_fail_without_side_effects() {
        let resolver = resolver_with(SessionLimits::unbounded().with_max_articles(2));
        let mut overlay = SessionOverlay::new();
        let author = resolver.register(&mut overlay, new_user("alice")).unwrap().id;

        resolver.create_article(&mut overlay, author, new_article("One")).unwrap();
        resolver.create_article(&mut overlay, author, new_article("Two")).unwrap();
        let writes = overlay.stats().writes;

        let err = resolver
            .create_article(&mut overlay, author, new_article("Three"))
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::ResourceLimitExceeded {
                kind: ResourceKind::Articles,
                limit: 2
            }
        );
        assert_eq!(overlay.stats().writes, writes);
        assert_eq!(overlay.created_articles(), 2);

        // Deleting frees a slot.
        resolver.delete_article(&mut overlay, author, "one").unwrap();
        assert!(resolver.create_article(&mut overlay, author, new_article("Three")).is_ok());
    }

    #[test]
    fn favorite_cap_ignores_seed_edges() {
        let resolver = resolver_with(SessionLimits::unbounded().with_max_favorites(0));
        let mut overlay = SessionOverlay::new();
        let john = seed_user(&resolver, "johndoe");

        // johndoe already favorites the hooks article in the seed.
        resolver.unfavorite(&mut overlay, john, "react-hooks-best-practices").unwrap();
        resolver.favorite(&mut overlay, john, "react-hooks-best-practices").unwrap();
        assert!(matches!(
            resolver.favorite(&mut overlay, john, "how-to-learn-javascript-efficiently"),
            Err(StoreError::ResourceLimitExceeded { .. })
        ));
    }
}
