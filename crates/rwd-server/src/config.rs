//! Server configuration
//!
//! Everything is read from the environment once at startup. [`ServerConfig::from_lookup`]
//! takes any `name -> value` function so tests never touch the process
//! environment.

use rwd_model::FieldLimits;
use rwd_store::{IsolationMode, SessionLimits, StoreConfig};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default listen port
pub const DEFAULT_PORT: u16 = 8000;

/// Default size of one log file before rotation
pub const DEFAULT_LOG_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// Default number of rotated log files kept
pub const DEFAULT_LOG_BACKUP_COUNT: usize = 5;

/// Default bound on live sessions
pub const DEFAULT_MAX_SESSIONS: u64 = 3000;

/// Default per-session cap on registered users
pub const DEFAULT_MAX_USERS: usize = 60;

/// Default per-session cap on created articles
pub const DEFAULT_MAX_ARTICLES: usize = 20;

/// Default per-session cap on created comments
pub const DEFAULT_MAX_COMMENTS: usize = 20;

/// Default per-session cap on follow edges
pub const DEFAULT_MAX_FOLLOWS: usize = 100;

/// Default per-session cap on favorite edges
pub const DEFAULT_MAX_FAVORITES: usize = 100;

/// Default avatar of demo users
pub const DEFAULT_DEMO_IMAGE: &str = "https://upload.wikimedia.org/wikipedia/commons/thumb/8/8f/Cute-kittens-12929201-1600-1200.jpg/960px-Cute-kittens-12929201-1600-1200.jpg";

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A numeric variable did not parse
    #[error("{var}: expected a non-negative integer, got `{value}`")]
    InvalidNumber {
        /// Variable name
        var: String,
        /// Raw value
        value: String,
    },
}

/// Log sink settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `rwd_store=debug`
    pub level: String,
    /// Rotating JSON log file; stdout only when unset
    pub file: Option<String>,
    /// Rotate after this many bytes
    pub max_size: u64,
    /// Rotated files kept
    pub backup_count: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_size: DEFAULT_LOG_MAX_SIZE,
            backup_count: DEFAULT_LOG_BACKUP_COUNT,
        }
    }
}

/// Cross-origin policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    /// Any origin, answered with `*`
    Any,
    /// Only the listed origins
    Allow(Vec<String>),
}

impl OriginPolicy {
    /// Check an `Origin` header value; requests without one always pass
    #[must_use]
    pub fn permits(&self, origin: Option<&str>) -> bool {
        match (self, origin) {
            (Self::Any, _) | (_, None) => true,
            (Self::Allow(list), Some(origin)) => list.iter().any(|o| o == origin),
        }
    }

    /// Value of `Access-Control-Allow-Origin` for a permitted request
    #[must_use]
    pub fn allow_origin_header<'a>(&self, origin: Option<&'a str>) -> &'a str {
        match (self, origin) {
            (Self::Allow(_), Some(origin)) => origin,
            _ => "*",
        }
    }
}

/// Full server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen port
    pub port: u16,
    /// Mount prefix, empty or `/segment[/segment...]` without trailing slash
    pub path_prefix: String,
    /// Load the demo dataset as the seed
    pub populate_demo_data: bool,
    /// Avatar for demo users and new registrations
    pub default_image: String,
    /// Header carrying the client address behind a proxy
    pub client_ip_header: Option<String>,
    /// Per-caller or shared overlays
    pub isolation: IsolationMode,
    /// Cross-origin policy
    pub origins: OriginPolicy,
    /// Logging
    pub log: LogConfig,
    /// Whole-session eviction
    pub store: StoreConfig,
    /// Per-session caps
    pub session_limits: SessionLimits,
    /// Field length limits
    pub field_limits: FieldLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            path_prefix: String::new(),
            populate_demo_data: false,
            default_image: DEFAULT_DEMO_IMAGE.to_string(),
            client_ip_header: None,
            isolation: IsolationMode::PerCaller,
            origins: OriginPolicy::Any,
            log: LogConfig::default(),
            store: StoreConfig::default().with_max_sessions(DEFAULT_MAX_SESSIONS),
            session_limits: default_session_limits(),
            field_limits: FieldLimits::default(),
        }
    }
}

/// Caps applied when no override is given
#[must_use]
pub fn default_session_limits() -> SessionLimits {
    SessionLimits::unbounded()
        .with_max_users(DEFAULT_MAX_USERS)
        .with_max_articles(DEFAULT_MAX_ARTICLES)
        .with_max_comments(DEFAULT_MAX_COMMENTS)
        .with_max_follows(DEFAULT_MAX_FOLLOWS)
        .with_max_favorites(DEFAULT_MAX_FAVORITES)
}

impl ServerConfig {
    /// Read configuration from the process environment
    ///
    /// # Errors
    /// See [`ServerConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`
    ///
    /// # Errors
    /// `ConfigError` when a numeric variable is malformed.
    ///
    /// Session count and per-session caps fall back to their defaults when
    /// unset; an explicit `0` turns one off.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup: &lookup };
        let defaults = FieldLimits::default();

        let port = env.number("PORT")?.unwrap_or(DEFAULT_PORT);
        let bypass_origin = env.flag("BYPASS_ORIGIN_CHECK");
        let origins = match env.text("ALLOWED_ORIGINS") {
            Some(list) if !bypass_origin => OriginPolicy::Allow(
                list.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            _ => OriginPolicy::Any,
        };

        let mut store = StoreConfig::default();
        if let Some(max) = env.cap("MAX_SESSIONS", DEFAULT_MAX_SESSIONS)? {
            store = store.with_max_sessions(max);
        }
        if let Some(secs) = env.number::<u64>("SESSION_IDLE_SECS")? {
            store = store.with_idle_timeout(Duration::from_secs(secs));
        }

        let session_limits = SessionLimits {
            max_users: env.cap("MAX_USERS_PER_SESSION", DEFAULT_MAX_USERS)?,
            max_articles: env.cap("MAX_ARTICLES_PER_SESSION", DEFAULT_MAX_ARTICLES)?,
            max_comments: env.cap("MAX_COMMENTS_PER_SESSION", DEFAULT_MAX_COMMENTS)?,
            max_follows: env.cap("MAX_FOLLOWS_PER_SESSION", DEFAULT_MAX_FOLLOWS)?,
            max_favorites: env.cap("MAX_FAVORITES_PER_SESSION", DEFAULT_MAX_FAVORITES)?,
        };

        let field_limits = FieldLimits {
            user_email: env.number("MAX_LEN_USER_EMAIL")?.unwrap_or(defaults.user_email),
            user_username: env
                .number("MAX_LEN_USER_USERNAME")?
                .unwrap_or(defaults.user_username),
            user_password: env
                .number("MAX_LEN_USER_PASSWORD")?
                .unwrap_or(defaults.user_password),
            user_bio: env.number("MAX_LEN_USER_BIO")?.unwrap_or(defaults.user_bio),
            user_image: env.number("MAX_LEN_USER_IMAGE")?.unwrap_or(defaults.user_image),
            article_title: env
                .number("MAX_LEN_ARTICLE_TITLE")?
                .unwrap_or(defaults.article_title),
            article_description: env
                .number("MAX_LEN_ARTICLE_DESCRIPTION")?
                .unwrap_or(defaults.article_description),
            article_body: env
                .number("MAX_LEN_ARTICLE_BODY")?
                .unwrap_or(defaults.article_body),
            article_tag_count: env
                .number("MAX_LEN_ARTICLE_TAG_LIST")?
                .unwrap_or(defaults.article_tag_count),
            article_tag_len: env
                .number("MAX_LEN_ARTICLE_TAG_LEN")?
                .unwrap_or(defaults.article_tag_len),
            comment_body: env
                .number("MAX_LEN_COMMENT_BODY")?
                .unwrap_or(defaults.comment_body),
        };

        Ok(Self {
            port,
            path_prefix: normalize_prefix(&env.text("PATH_PREFIX").unwrap_or_default()),
            populate_demo_data: env.flag("POPULATE_DEMO_DATA"),
            default_image: env
                .text("DEMO_DATA_DEFAULT_IMAGE")
                .unwrap_or_else(|| DEFAULT_DEMO_IMAGE.to_string()),
            client_ip_header: env.text("CLIENT_IP_HEADER").filter(|h| !h.is_empty()),
            isolation: IsolationMode::from_disabled_flag(env.flag("DISABLE_ISOLATION_MODE")),
            origins,
            log: LogConfig {
                level: env.text("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
                file: env.text("LOG_FILE").filter(|f| !f.is_empty()),
                max_size: env.number("LOG_MAX_SIZE")?.unwrap_or(DEFAULT_LOG_MAX_SIZE),
                backup_count: env
                    .number("LOG_BACKUP_COUNT")?
                    .unwrap_or(DEFAULT_LOG_BACKUP_COUNT),
            },
            store,
            session_limits,
            field_limits,
        })
    }

    /// Override the listen port
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the mount prefix
    #[must_use]
    pub fn with_path_prefix(mut self, prefix: &str) -> Self {
        self.path_prefix = normalize_prefix(prefix);
        self
    }

    /// Override the isolation mode
    #[inline]
    #[must_use]
    pub fn with_isolation(mut self, mode: IsolationMode) -> Self {
        self.isolation = mode;
        self
    }

    /// Override the session caps
    #[inline]
    #[must_use]
    pub fn with_session_limits(mut self, limits: SessionLimits) -> Self {
        self.session_limits = limits;
        self
    }

    /// Override the client address header
    #[must_use]
    pub fn with_client_ip_header(mut self, header: impl Into<String>) -> Self {
        self.client_ip_header = Some(header.into());
        self
    }

    /// Load or skip the demo dataset
    #[inline]
    #[must_use]
    pub fn with_demo_data(mut self, populate: bool) -> Self {
        self.populate_demo_data = populate;
        self
    }
}

struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    fn text(&self, name: &str) -> Option<String> {
        (self.lookup)(name).map(|v| v.trim().to_string())
    }

    fn flag(&self, name: &str) -> bool {
        self.text(name)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    fn number<T: FromStr>(&self, name: &str) -> Result<Option<T>, ConfigError> {
        match self.text(name) {
            None => Ok(None),
            Some(v) if v.is_empty() => Ok(None),
            Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidNumber {
                var: name.to_string(),
                value: v,
            }),
        }
    }

    /// A bound with a default; `0` means unbounded
    fn cap<T: FromStr + Default + PartialEq>(
        &self,
        name: &str,
        default: T,
    ) -> Result<Option<T>, ConfigError> {
        Ok(match self.number(name)? {
            None => Some(default),
            Some(v) if v == T::default() => None,
            Some(v) => Some(v),
        })
    }
}

/// Normalize a mount prefix to `""` or `/a/b`
#[must_use]
pub fn normalize_prefix(raw: &str) -> String {
    let parts: Vec<&str> = raw.split('/').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!("/{}", parts.join("/"))
    }
}
