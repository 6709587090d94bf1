//! Seed dataset
//!
//! Immutable base data shared by every session. Built once through
//! [`SeedBuilder`] (which draws ids from the process allocator before any
//! overlay can), then wrapped in an `Arc` and only ever read.
//!
//! Indexes:
//! - username / email → user
//! - slug → article
//! - tag → articles
//! - article → comments
//! - follower → followees, user → favorited articles, article → favoriting users

use crate::error::{StoreError, StoreResult};
use rwd_model::records::normalize_tags;
use rwd_model::{
    hash_password, Article, ArticleId, Comment, CommentId, IdAllocator, Timestamp, User, UserId,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Offset/limit window over a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Items to skip
    pub offset: usize,
    /// Maximum items to return
    pub limit: usize,
}

impl Page {
    /// Default page size of the RealWorld contract
    pub const DEFAULT_LIMIT: usize = 20;

    /// Create page
    #[inline]
    #[must_use]
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Apply window to an already ordered list
    #[must_use]
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_LIMIT)
    }
}

/// Ordering used by every article listing: newest first, ties by id desc
pub(crate) fn newest_first(a: &Article, b: &Article) -> std::cmp::Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Read-only base dataset
#[derive(Debug, Default)]
pub struct SeedDataset {
    users: BTreeMap<UserId, User>,
    articles: BTreeMap<ArticleId, Article>,
    comments: BTreeMap<CommentId, Comment>,
    by_username: HashMap<String, UserId>,
    by_email: HashMap<String, UserId>,
    by_slug: HashMap<String, ArticleId>,
    by_tag: BTreeMap<String, BTreeSet<ArticleId>>,
    comments_by_article: HashMap<ArticleId, Vec<CommentId>>,
    following: HashMap<UserId, BTreeSet<UserId>>,
    favorites_of: HashMap<UserId, BTreeSet<ArticleId>>,
    favorited_by: HashMap<ArticleId, BTreeSet<UserId>>,
}

impl SeedDataset {
    /// Dataset with nothing in it
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start building a dataset whose records are all stamped `at`
    #[inline]
    #[must_use]
    pub fn builder(ids: &IdAllocator, at: Timestamp) -> SeedBuilder<'_> {
        SeedBuilder::new(ids, at)
    }

    /// User by id
    #[inline]
    #[must_use]
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    /// User by username
    #[must_use]
    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.by_username.get(username).and_then(|id| self.users.get(id))
    }

    /// User by email
    #[must_use]
    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.by_email.get(email).and_then(|id| self.users.get(id))
    }

    /// Article by id
    #[inline]
    #[must_use]
    pub fn article(&self, id: ArticleId) -> Option<&Article> {
        self.articles.get(&id)
    }

    /// Article by slug
    #[must_use]
    pub fn article_by_slug(&self, slug: &str) -> Option<&Article> {
        self.by_slug.get(slug).and_then(|id| self.articles.get(id))
    }

    /// Comment by id
    #[inline]
    #[must_use]
    pub fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments.get(&id)
    }

    /// All users, by id
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// All articles, by id
    pub fn articles(&self) -> impl Iterator<Item = &Article> {
        self.articles.values()
    }

    /// Articles carrying `tag`
    pub fn articles_tagged<'a>(&'a self, tag: &str) -> impl Iterator<Item = &'a Article> + 'a {
        self.by_tag
            .get(tag)
            .into_iter()
            .flatten()
            .filter_map(|id| self.articles.get(id))
    }

    /// Comments of `article`, in insertion order
    pub fn comments_for(&self, article: ArticleId) -> impl Iterator<Item = &Comment> {
        self.comments_by_article
            .get(&article)
            .into_iter()
            .flatten()
            .filter_map(|id| self.comments.get(id))
    }

    /// Every tag in use, sorted
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.by_tag.keys().map(String::as_str)
    }

    /// Whether `follower` follows `followee`
    #[must_use]
    pub fn is_following(&self, follower: UserId, followee: UserId) -> bool {
        self.following
            .get(&follower)
            .is_some_and(|set| set.contains(&followee))
    }

    /// Users `follower` follows
    pub fn followees(&self, follower: UserId) -> impl Iterator<Item = UserId> + '_ {
        self.following.get(&follower).into_iter().flatten().copied()
    }

    /// Whether `user` favorited `article`
    #[must_use]
    pub fn is_favorited(&self, user: UserId, article: ArticleId) -> bool {
        self.favorites_of
            .get(&user)
            .is_some_and(|set| set.contains(&article))
    }

    /// Articles `user` favorited
    pub fn favorites_of(&self, user: UserId) -> impl Iterator<Item = ArticleId> + '_ {
        self.favorites_of.get(&user).into_iter().flatten().copied()
    }

    /// Users who favorited `article`
    pub fn favorited_by(&self, article: ArticleId) -> impl Iterator<Item = UserId> + '_ {
        self.favorited_by.get(&article).into_iter().flatten().copied()
    }

    /// One page of all articles, newest first
    #[must_use]
    pub fn list_articles(&self, page: Page) -> Vec<&Article> {
        let mut all: Vec<&Article> = self.articles.values().collect();
        all.sort_by(|a, b| newest_first(a, b));
        page.slice(all)
    }

    /// Number of users
    #[inline]
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of articles
    #[inline]
    #[must_use]
    pub fn article_count(&self) -> usize {
        self.articles.len()
    }

    /// Number of comments
    #[inline]
    #[must_use]
    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    /// Demo content: four authors, one article each, a few comments,
    /// follows and favorites. Every account's password is `password123`.
    ///
    /// # Errors
    /// Never in practice; the builder's consistency checks still run.
    pub fn demo(ids: &IdAllocator, at: Timestamp, image: &str) -> StoreResult<Self> {
        let mut seed = Self::builder(ids, at);

        let john = seed.user(
            "johndoe",
            "john.doe@example.com",
            "password123",
            "Full-stack developer passionate about clean code and innovative solutions. \
             Love working with modern web technologies.",
            image,
        );
        let jane = seed.user(
            "janesmith",
            "jane.smith@example.com",
            "password123",
            "Frontend developer with a keen eye for UI/UX design. \
             Specializing in React and modern CSS frameworks.",
            image,
        );
        let mike = seed.user(
            "mikewilson",
            "mike.wilson@example.com",
            "password123",
            "Backend engineer focused on scalable architecture and DevOps. \
             Enthusiast of cloud technologies and automation.",
            image,
        );
        let sarah = seed.user(
            "sarahchen",
            "sarah.chen@example.com",
            "password123",
            "Data scientist and machine learning engineer. \
             Passionate about turning data into actionable insights.",
            image,
        );

        let js = seed.article(SeedArticle {
            author: john,
            slug: Some("how-to-learn-javascript-efficiently"),
            title: "How to Learn JavaScript Efficiently",
            description: "A comprehensive guide to mastering JavaScript from beginner to advanced level",
            body: "Learning JavaScript can be overwhelming with so many resources available. \
                   Here's a structured approach that has helped thousands of developers master \
                   this essential language.\n\n## Start with the Fundamentals\n\nBefore diving \
                   into frameworks, master the core concepts: variables, functions, objects, and \
                   arrays. Understanding these building blocks is crucial for writing clean, \
                   maintainable code.\n\n## Practice with Real Projects\n\nThe best way to learn \
                   is by building actual applications. Start with simple projects like a todo \
                   list or calculator, then gradually increase complexity.\n\n## Join the \
                   Community\n\nEngage with other developers through forums, Discord servers, \
                   and local meetups. The JavaScript community is incredibly welcoming and helpful.",
            tags: &["javascript", "programming", "webdev", "beginners"],
        });
        let hooks = seed.article(SeedArticle {
            author: jane,
            slug: Some("react-hooks-best-practices"),
            title: "React Hooks: Best Practices and Common Pitfalls",
            description: "Essential patterns and anti-patterns when working with React Hooks",
            body: "React Hooks have revolutionized how we write React components, but they come \
                   with their own set of best practices and potential pitfalls.\n\n## useEffect \
                   Dependencies\n\nOne of the most common mistakes is forgetting to include \
                   dependencies in the useEffect array. This can lead to stale closures and \
                   unexpected behavior.\n\n## Custom Hooks for Reusability\n\nCreate custom hooks \
                   to encapsulate stateful logic that can be shared across components. This \
                   promotes code reuse and maintainability.\n\n## Performance Considerations\n\n\
                   Use useMemo and useCallback judiciously. Don't optimize prematurely, but be \
                   aware of when these hooks can help prevent unnecessary re-renders.",
            tags: &["react", "hooks", "javascript", "frontend"],
        });
        let apis = seed.article(SeedArticle {
            author: mike,
            slug: Some("building-scalable-apis-with-node-js"),
            title: "Building Scalable APIs with Node.js",
            description: "Architectural patterns and best practices for creating robust backend services",
            body: "Building scalable APIs requires careful consideration of architecture, error \
                   handling, and performance optimization.\n\n## API Design Principles\n\nFollow \
                   RESTful conventions and use appropriate HTTP status codes. Design your API to \
                   be intuitive and self-documenting.\n\n## Error Handling Strategy\n\nImplement \
                   comprehensive error handling with proper logging and monitoring. Use \
                   middleware to handle errors consistently across your application.\n\n## \
                   Database Optimization\n\nOptimize database queries and consider implementing \
                   caching strategies for frequently accessed data. Connection pooling is \
                   essential for production applications.",
            tags: &["nodejs", "api", "backend", "architecture"],
        });
        let ml = seed.article(SeedArticle {
            author: sarah,
            slug: Some("introduction-to-machine-learning-for-developers"),
            title: "Introduction to Machine Learning for Developers",
            description: "Getting started with ML concepts and practical applications for software developers",
            body: "Machine learning might seem intimidating, but it's more accessible than ever \
                   for developers looking to expand their skillset.\n\n## Understanding the \
                   Basics\n\nStart with supervised learning concepts like classification and \
                   regression. These form the foundation for more complex ML algorithms.\n\n## \
                   Practical Tools and Libraries\n\nPython's scikit-learn is perfect for \
                   beginners, while TensorFlow and PyTorch offer more advanced capabilities for \
                   deep learning projects.\n\n## Data Preprocessing\n\nMost of ML work involves \
                   cleaning and preparing data. Learn to handle missing values, normalize \
                   features, and split datasets properly.",
            tags: &["machinelearning", "python", "ai", "datascience"],
        });

        seed.comment(js, jane, "Great article! I've been struggling with JavaScript concepts and this really helps clarify things.");
        seed.comment(js, mike, "The project-based approach really works. I built three projects following this guide and learned so much!");
        seed.comment(hooks, john, "useEffect dependencies caught me so many times when I was learning React. Wish I had read this earlier!");
        seed.comment(hooks, sarah, "Custom hooks are a game-changer. They make components so much cleaner and more reusable.");
        seed.comment(apis, jane, "Error handling is definitely something I need to improve on. Thanks for the practical tips!");
        seed.comment(apis, john, "Connection pooling made such a difference in my API performance. Great advice!");
        seed.comment(ml, jane, "As someone new to ML, this is exactly the kind of practical introduction I was looking for.");
        seed.comment(ml, mike, "The data preprocessing section is spot on. It's definitely where most of the work happens in ML projects.");

        seed.follow(john, jane);
        seed.follow(john, mike);
        seed.follow(jane, sarah);
        seed.follow(mike, john);
        seed.follow(mike, sarah);

        seed.favorite(john, hooks);
        seed.favorite(john, ml);
        seed.favorite(jane, apis);
        seed.favorite(mike, js);
        seed.favorite(sarah, js);
        seed.favorite(sarah, hooks);

        seed.build()
    }
}

/// Article to add through [`SeedBuilder::article`]
#[derive(Debug, Clone, Copy)]
pub struct SeedArticle<'s> {
    /// Author, as returned by [`SeedBuilder::user`]
    pub author: UserId,
    /// Explicit slug; derived from the title when `None`
    pub slug: Option<&'s str>,
    /// Title
    pub title: &'s str,
    /// Description
    pub description: &'s str,
    /// Body
    pub body: &'s str,
    /// Tags
    pub tags: &'s [&'s str],
}

/// Incremental constructor for [`SeedDataset`]
#[derive(Debug)]
pub struct SeedBuilder<'a> {
    ids: &'a IdAllocator,
    at: Timestamp,
    users: Vec<User>,
    articles: Vec<Article>,
    comments: Vec<Comment>,
    follows: Vec<(UserId, UserId)>,
    favorites: Vec<(UserId, ArticleId)>,
}

impl<'a> SeedBuilder<'a> {
    /// Create builder stamping every record with `at`
    #[must_use]
    pub fn new(ids: &'a IdAllocator, at: Timestamp) -> Self {
        Self {
            ids,
            at,
            users: Vec::new(),
            articles: Vec::new(),
            comments: Vec::new(),
            follows: Vec::new(),
            favorites: Vec::new(),
        }
    }

    /// Add user with a plaintext password
    pub fn user(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
        bio: &str,
        image: &str,
    ) -> UserId {
        let id = self.ids.next_user();
        self.users.push(User {
            id,
            email: email.to_string(),
            username: username.to_string(),
            password_hash: hash_password(password),
            bio: bio.to_string(),
            image: image.to_string(),
            created_at: self.at,
        });
        id
    }

    /// Add article
    pub fn article(&mut self, article: SeedArticle<'_>) -> ArticleId {
        let id = self.ids.next_article();
        let slug = article
            .slug
            .map_or_else(|| rwd_model::slugify(article.title), str::to_string);
        self.articles.push(Article {
            id,
            slug,
            title: article.title.to_string(),
            description: article.description.to_string(),
            body: article.body.to_string(),
            tag_list: normalize_tags(article.tags.iter().map(|t| (*t).to_string())),
            author_id: article.author,
            created_at: self.at,
            updated_at: self.at,
        });
        id
    }

    /// Add comment
    pub fn comment(&mut self, article: ArticleId, author: UserId, body: &str) -> CommentId {
        let id = self.ids.next_comment();
        self.comments.push(Comment {
            id,
            article_id: article,
            author_id: author,
            body: body.to_string(),
            created_at: self.at,
            updated_at: self.at,
        });
        id
    }

    /// Add follow edge
    pub fn follow(&mut self, follower: UserId, followee: UserId) {
        self.follows.push((follower, followee));
    }

    /// Add favorite edge
    pub fn favorite(&mut self, user: UserId, article: ArticleId) {
        self.favorites.push((user, article));
    }

    /// Check consistency and freeze
    ///
    /// # Errors
    /// - `StoreError::Conflict` on duplicate username, email or slug
    /// - `StoreError::NotFound` when an article, comment or edge references a
    ///   record that was never added
    pub fn build(self) -> StoreResult<SeedDataset> {
        let mut data = SeedDataset::empty();

        for user in self.users {
            if data.by_username.insert(user.username.clone(), user.id).is_some() {
                return Err(StoreError::Conflict(format!(
                    "duplicate seed username {}",
                    user.username
                )));
            }
            if data.by_email.insert(user.email.clone(), user.id).is_some() {
                return Err(StoreError::Conflict(format!(
                    "duplicate seed email {}",
                    user.email
                )));
            }
            data.users.insert(user.id, user);
        }

        for article in self.articles {
            if !data.users.contains_key(&article.author_id) {
                return Err(StoreError::not_found(format!(
                    "seed article {} has unknown author {}",
                    article.slug, article.author_id
                )));
            }
            if data.by_slug.insert(article.slug.clone(), article.id).is_some() {
                return Err(StoreError::Conflict(format!(
                    "duplicate seed slug {}",
                    article.slug
                )));
            }
            for tag in &article.tag_list {
                data.by_tag.entry(tag.clone()).or_default().insert(article.id);
            }
            data.articles.insert(article.id, article);
        }

        for comment in self.comments {
            if !data.articles.contains_key(&comment.article_id)
                || !data.users.contains_key(&comment.author_id)
            {
                return Err(StoreError::not_found(format!(
                    "seed comment {} references unknown records",
                    comment.id
                )));
            }
            data.comments_by_article
                .entry(comment.article_id)
                .or_default()
                .push(comment.id);
            data.comments.insert(comment.id, comment);
        }

        for (follower, followee) in self.follows {
            if !data.users.contains_key(&follower) || !data.users.contains_key(&followee) {
                return Err(StoreError::not_found("seed follow references unknown user"));
            }
            data.following.entry(follower).or_default().insert(followee);
        }

        for (user, article) in self.favorites {
            if !data.users.contains_key(&user) || !data.articles.contains_key(&article) {
                return Err(StoreError::not_found(
                    "seed favorite references unknown record",
                ));
            }
            data.favorites_of.entry(user).or_default().insert(article);
            data.favorited_by.entry(article).or_default().insert(user);
        }

        tracing::info!(
            target: "storage",
            users = data.users.len(),
            articles = data.articles.len(),
            comments = data.comments.len(),
            "seed dataset loaded"
        );
        Ok(data)
    }
}
