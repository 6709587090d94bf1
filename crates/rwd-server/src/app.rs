//! Dispatcher
//!
//! [`App::handle`] turns one [`ApiRequest`] into one [`ApiResponse`] without
//! touching the network, which keeps the whole API testable in-process. It
//! resolves the caller's session, runs the route against the store and maps
//! any failure to a status code and the error envelope.

use crate::config::{OriginPolicy, ServerConfig};
use crate::error::{ApiError, ApiResult};
use crate::lifecycle::{RequestLifecycle, RequestPhase};
use crate::routes::Route;
use crate::session_key::{self, CallerContext};
use crate::wire::{
    parse_listing, parse_wrapped, ArticleDto, ArticlesDto, CommentDto, ProfileDto, UserDto,
};
use rwd_model::{
    ArticleChanges, Clock, Credentials, IdAllocator, MonotonicClock, NewArticle, NewComment,
    NewUser, UserChanges, UserId,
};
use rwd_store::resolver::{ARTICLE_NOT_FOUND, PROFILE_NOT_FOUND};
use rwd_store::{
    AuthToken, EffectiveView, Resolver, SeedDataset, SessionKey, SessionStore, StoreError,
    StoreResult,
};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::http::header::{HeaderName, AUTHORIZATION, ORIGIN};
use warp::http::{HeaderMap, HeaderValue, Method, StatusCode};

/// Transport-independent request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Raw path, including the mount prefix
    pub path: String,
    /// Decoded query parameters
    pub query: HashMap<String, String>,
    /// Request headers
    pub headers: HeaderMap,
    /// Peer address, when known
    pub remote_addr: Option<SocketAddr>,
    /// Raw body
    pub body: Vec<u8>,
}

impl ApiRequest {
    /// Create request with no headers, query or body
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            headers: HeaderMap::new(),
            remote_addr: None,
            body: Vec::new(),
        }
    }

    /// `GET` request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST` request
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PUT` request
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// `DELETE` request
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a query parameter
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Add a header; invalid names or values are ignored
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Add `Authorization: Token <token>`
    #[must_use]
    pub fn with_token(self, token: &str) -> Self {
        self.with_header(AUTHORIZATION.as_str(), &format!("Token {token}"))
    }

    /// Set a JSON body
    #[must_use]
    pub fn with_json(mut self, body: &serde_json::Value) -> Self {
        self.body = body.to_string().into_bytes();
        self
    }

    /// Set a raw body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the peer address
    #[must_use]
    pub fn with_remote(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Header value as text
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Transport-independent response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// Status code
    pub status: StatusCode,
    /// JSON body; `None` for empty responses
    pub body: Option<serde_json::Value>,
}

impl ApiResponse {
    /// Response with `{"<key>": value}` as body
    ///
    /// # Errors
    /// `Internal` when `value` does not serialize.
    pub fn wrapped(status: StatusCode, key: &str, value: impl Serialize) -> ApiResult<Self> {
        let value = serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))?;
        let mut object = serde_json::Map::new();
        object.insert(key.to_string(), value);
        Ok(Self {
            status,
            body: Some(serde_json::Value::Object(object)),
        })
    }

    /// Response with a serialized body as-is
    ///
    /// # Errors
    /// `Internal` when `value` does not serialize.
    pub fn json(status: StatusCode, value: impl Serialize) -> ApiResult<Self> {
        let value = serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(Self {
            status,
            body: Some(value),
        })
    }

    /// Response without body
    #[must_use]
    pub fn empty(status: StatusCode) -> Self {
        Self { status, body: None }
    }

    /// Error envelope response
    #[must_use]
    pub fn error(err: &ApiError) -> Self {
        Self {
            status: err.status(),
            body: serde_json::to_value(err.envelope()).ok(),
        }
    }

    /// Serialized body
    #[must_use]
    pub fn body_bytes(&self) -> Vec<u8> {
        self.body
            .as_ref()
            .map(|b| b.to_string().into_bytes())
            .unwrap_or_default()
    }
}

/// Who is calling, after session resolution
#[derive(Debug, Clone)]
struct Caller {
    session: SessionKey,
    authenticated: Option<(UserId, AuthToken)>,
}

impl Caller {
    fn user(&self) -> Option<UserId> {
        self.authenticated.as_ref().map(|(user, _)| *user)
    }

    /// Checked once before dispatch; protected handlers only unpack it
    fn require(&self) -> ApiResult<(UserId, &AuthToken)> {
        self.authenticated
            .as_ref()
            .map(|(user, token)| (*user, token))
            .ok_or_else(|| ApiError::Store(StoreError::unauthorized()))
    }
}

/// The API application
#[derive(Debug, Clone)]
pub struct App {
    store: SessionStore,
    prefix: String,
    client_ip_header: Option<String>,
    origins: OriginPolicy,
}

impl App {
    /// Build from configuration with the production clock
    ///
    /// # Errors
    /// When the demo dataset fails to build.
    pub fn from_config(config: &ServerConfig) -> StoreResult<Self> {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    /// Build from configuration with an explicit clock
    ///
    /// # Errors
    /// When the demo dataset fails to build.
    pub fn with_clock(config: &ServerConfig, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        let ids = Arc::new(IdAllocator::new());
        let seed = if config.populate_demo_data {
            SeedDataset::demo(&ids, clock.now(), &config.default_image)?
        } else {
            SeedDataset::empty()
        };
        tracing::info!(
            target: "storage",
            users = seed.user_count(),
            articles = seed.article_count(),
            comments = seed.comment_count(),
            "seed dataset loaded"
        );

        let resolver = Resolver::new(Arc::new(seed), ids, clock)
            .with_session_limits(config.session_limits)
            .with_field_limits(config.field_limits)
            .with_default_image(config.default_image.clone());
        let store = SessionStore::new(resolver, config.isolation.gate(), config.store);

        Ok(Self {
            store,
            prefix: config.path_prefix.clone(),
            client_ip_header: config.client_ip_header.clone(),
            origins: config.origins.clone(),
        })
    }

    /// Underlying session store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Cross-origin policy
    #[inline]
    #[must_use]
    pub fn origins(&self) -> &OriginPolicy {
        &self.origins
    }

    /// Handle one request
    pub fn handle(&self, request: ApiRequest) -> ApiResponse {
        let mut lifecycle = RequestLifecycle::start();
        let route = Route::parse(&request.method, &request.path, &self.prefix);
        tracing::debug!(
            target: "http",
            method = %request.method,
            path = %request.path,
            route = route.as_ref().map_or("none", Route::name),
            "request received"
        );

        let mut session = None;
        let outcome = self.process(&request, route.as_ref(), &mut lifecycle, &mut session);
        let response = match outcome {
            Ok(response) => match lifecycle.advance(RequestPhase::Served) {
                Ok(()) => response,
                Err(err) => {
                    lifecycle.fail();
                    ApiResponse::error(&ApiError::Internal(err.to_string()))
                }
            },
            Err(err) => {
                lifecycle.fail();
                log_failure(&request, &err);
                ApiResponse::error(&err)
            }
        };

        tracing::info!(
            target: "http",
            method = %request.method,
            path = %request.path,
            status = response.status.as_u16(),
            duration_ms = u64::try_from(lifecycle.elapsed_ms()).unwrap_or(u64::MAX),
            session = session.as_ref().map_or("-", SessionKey::as_str),
            phase = %lifecycle.phase(),
            "request completed"
        );
        response
    }

    fn process(
        &self,
        request: &ApiRequest,
        route: Option<&Route>,
        lifecycle: &mut RequestLifecycle,
        session_out: &mut Option<SessionKey>,
    ) -> ApiResult<ApiResponse> {
        if route == Some(&Route::Preflight) {
            lifecycle.advance(RequestPhase::SessionKeyResolved).map_err(internal)?;
            lifecycle.advance(RequestPhase::ViewResolved).map_err(internal)?;
            return Ok(ApiResponse::empty(StatusCode::OK));
        }
        if !self.origins.permits(request.header(ORIGIN.as_str())) {
            return Err(ApiError::OriginRejected);
        }
        let route = route.ok_or(ApiError::RouteNotFound)?;

        let token = request
            .header(AUTHORIZATION.as_str())
            .and_then(AuthToken::from_header);
        let binding = token.as_ref().and_then(|t| self.store.tokens().lookup(t));
        let ctx = CallerContext {
            token_session: binding.as_ref().map(|b| b.session.clone()),
            client_header: self
                .client_ip_header
                .as_deref()
                .and_then(|name| request.header(name))
                .map(str::to_string),
            remote_addr: request.remote_addr.map(|addr| addr.ip().to_string()),
        };
        let session = self
            .store
            .scope(&session_key::resolve(session_key::DEFAULT_CHAIN, &ctx));
        *session_out = Some(session.clone());
        lifecycle.advance(RequestPhase::SessionKeyResolved).map_err(internal)?;

        let authenticated = match (binding, token) {
            (Some(binding), Some(token)) if binding.session == session => {
                let visible = self
                    .store
                    .resolve_view(&session, |view| view.user(binding.user).is_some());
                visible.then_some((binding.user, token))
            }
            _ => None,
        };
        let caller = Caller {
            session,
            authenticated,
        };
        lifecycle.advance(RequestPhase::ViewResolved).map_err(internal)?;

        if route.requires_auth() && caller.authenticated.is_none() {
            tracing::warn!(
                target: "security",
                session = %caller.session,
                route = route.name(),
                "authentication required but not provided"
            );
            return Err(ApiError::Store(StoreError::unauthorized()));
        }
        self.dispatch(route, request, &caller)
    }

    fn dispatch(&self, route: &Route, request: &ApiRequest, caller: &Caller) -> ApiResult<ApiResponse> {
        let session = &caller.session;
        let viewer = caller.user();

        match route {
            Route::Register => {
                let input: NewUser = parse_wrapped(&request.body, "user")?;
                let auth = self.store.register(session, input)?;
                ApiResponse::wrapped(
                    StatusCode::CREATED,
                    "user",
                    UserDto::new(&auth.user, &auth.token),
                )
            }
            Route::Login => {
                let input: Credentials = parse_wrapped(&request.body, "user")?;
                let auth = self.store.login(session, input)?;
                ApiResponse::wrapped(StatusCode::OK, "user", UserDto::new(&auth.user, &auth.token))
            }
            Route::CurrentUser => {
                let (user, token) = caller.require()?;
                let dto = self.store.resolve_view(session, |view| {
                    view.user(user)
                        .map(|u| UserDto::new(u, token))
                        .ok_or(ApiError::Store(StoreError::unauthorized()))
                })?;
                ApiResponse::wrapped(StatusCode::OK, "user", dto)
            }
            Route::UpdateUser => {
                let (user, token) = caller.require()?;
                let changes: UserChanges = parse_wrapped(&request.body, "user")?;
                let updated = self
                    .store
                    .write(session, |resolver, overlay| {
                        resolver.update_user(overlay, user, changes)
                    })?;
                ApiResponse::wrapped(StatusCode::OK, "user", UserDto::new(&updated, token))
            }
            Route::GetProfile(username) => {
                let profile = self.store.resolve_view(session, |view| {
                    view.user_by_username(username)
                        .map(|u| ProfileDto::build(view, u, viewer))
                        .ok_or_else(|| StoreError::not_found(PROFILE_NOT_FOUND))
                })?;
                ApiResponse::wrapped(StatusCode::OK, "profile", profile)
            }
            Route::Follow(username) | Route::Unfollow(username) => {
                let (user, _) = caller.require()?;
                let follow = matches!(route, Route::Follow(_));
                let profile = self.store.write(session, |resolver, overlay| {
                    let target = if follow {
                        resolver.follow(overlay, user, username)?
                    } else {
                        resolver.unfollow(overlay, user, username)?
                    };
                    Ok::<_, StoreError>(ProfileDto::build(&resolver.view(overlay), &target, Some(user)))
                })?;
                ApiResponse::wrapped(StatusCode::OK, "profile", profile)
            }
            Route::ListArticles => {
                let (filter, page) = parse_listing(&request.query)?;
                let dto = self.store.resolve_view(session, |view| {
                    let listed = view.list_articles(&filter, page);
                    articles_dto(view, &listed.articles, listed.total, viewer)
                })?;
                ApiResponse::json(StatusCode::OK, dto)
            }
            Route::Feed => {
                let (user, _) = caller.require()?;
                let (_, page) = parse_listing(&request.query)?;
                let dto = self.store.resolve_view(session, |view| {
                    let listed = view.feed(user, page);
                    articles_dto(view, &listed.articles, listed.total, viewer)
                })?;
                ApiResponse::json(StatusCode::OK, dto)
            }
            Route::CreateArticle => {
                let (user, _) = caller.require()?;
                let input: NewArticle = parse_wrapped(&request.body, "article")?;
                let dto = self.store.write(session, |resolver, overlay| {
                    let article = resolver.create_article(overlay, user, input)?;
                    ArticleDto::build(&resolver.view(overlay), &article, Some(user))
                })?;
                ApiResponse::wrapped(StatusCode::CREATED, "article", dto)
            }
            Route::GetArticle(slug) => {
                let dto = self.store.resolve_view(session, |view| {
                    let article = view
                        .article_by_slug(slug)
                        .ok_or_else(|| StoreError::not_found(ARTICLE_NOT_FOUND))?;
                    ArticleDto::build(view, article, viewer)
                })?;
                ApiResponse::wrapped(StatusCode::OK, "article", dto)
            }
            Route::UpdateArticle(slug) => {
                let (user, _) = caller.require()?;
                let changes: ArticleChanges = parse_wrapped(&request.body, "article")?;
                let dto = self.store.write(session, |resolver, overlay| {
                    let article = resolver.update_article(overlay, user, slug, changes)?;
                    ArticleDto::build(&resolver.view(overlay), &article, Some(user))
                })?;
                ApiResponse::wrapped(StatusCode::OK, "article", dto)
            }
            Route::DeleteArticle(slug) => {
                let (user, _) = caller.require()?;
                self.store.write(session, |resolver, overlay| {
                    resolver.delete_article(overlay, user, slug)
                })?;
                Ok(ApiResponse::empty(StatusCode::NO_CONTENT))
            }
            Route::Favorite(slug) | Route::Unfavorite(slug) => {
                let (user, _) = caller.require()?;
                let favorite = matches!(route, Route::Favorite(_));
                let dto = self.store.write(session, |resolver, overlay| {
                    let article = if favorite {
                        resolver.favorite(overlay, user, slug)?
                    } else {
                        resolver.unfavorite(overlay, user, slug)?
                    };
                    ArticleDto::build(&resolver.view(overlay), &article, Some(user))
                })?;
                ApiResponse::wrapped(StatusCode::OK, "article", dto)
            }
            Route::ListComments(slug) => {
                let comments = self.store.resolve_view(session, |view| {
                    let article = view
                        .article_by_slug(slug)
                        .ok_or_else(|| StoreError::not_found(ARTICLE_NOT_FOUND))?;
                    view.comments_for(article.id)
                        .into_iter()
                        .map(|c| CommentDto::build(view, c, viewer))
                        .collect::<ApiResult<Vec<_>>>()
                })?;
                ApiResponse::wrapped(StatusCode::OK, "comments", comments)
            }
            Route::AddComment(slug) => {
                let (user, _) = caller.require()?;
                let input: NewComment = parse_wrapped(&request.body, "comment")?;
                let dto = self.store.write(session, |resolver, overlay| {
                    let comment = resolver.add_comment(overlay, user, slug, input)?;
                    CommentDto::build(&resolver.view(overlay), &comment, Some(user))
                })?;
                ApiResponse::wrapped(StatusCode::OK, "comment", dto)
            }
            Route::DeleteComment { slug, id } => {
                let (user, _) = caller.require()?;
                self.store.write(session, |resolver, overlay| {
                    resolver.delete_comment(overlay, user, slug, *id)
                })?;
                Ok(ApiResponse::empty(StatusCode::NO_CONTENT))
            }
            Route::Tags => {
                let tags = self.store.resolve_view(session, |view| view.tags());
                ApiResponse::wrapped(StatusCode::OK, "tags", tags)
            }
            Route::Preflight => Ok(ApiResponse::empty(StatusCode::OK)),
        }
    }
}

fn log_failure(request: &ApiRequest, err: &ApiError) {
    let status = err.status();
    if status.is_server_error() {
        tracing::error!(
            target: "http",
            method = %request.method,
            path = %request.path,
            kind = err.kind(),
            error = %err,
            "request failed"
        );
    } else if matches!(err, ApiError::OriginRejected) {
        tracing::warn!(
            target: "security",
            origin = request.header(ORIGIN.as_str()).unwrap_or("-"),
            "origin rejected"
        );
    } else {
        tracing::info!(
            target: "http",
            method = %request.method,
            path = %request.path,
            kind = err.kind(),
            error = %err,
            "request rejected"
        );
    }
}

fn internal(err: impl std::fmt::Display) -> ApiError {
    ApiError::Internal(err.to_string())
}

fn articles_dto(
    view: &EffectiveView<'_>,
    articles: &[&rwd_model::Article],
    total: usize,
    viewer: Option<UserId>,
) -> ApiResult<ArticlesDto> {
    let articles = articles
        .iter()
        .map(|a| ArticleDto::build(view, a, viewer))
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(ArticlesDto {
        articles,
        articles_count: total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn app() -> App {
        App::from_config(&ServerConfig::default().with_demo_data(true)).unwrap()
    }

    fn remote(ip: &str) -> SocketAddr {
        format!("{ip}:40000").parse().unwrap()
    }

    #[test]
    fn preflight_is_empty_ok() {
        let response = app().handle(ApiRequest::new(Method::OPTIONS, "/whatever"));
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body.is_none());
    }

    #[test]
    fn unknown_route_is_enveloped_404() {
        let response = app().handle(ApiRequest::get("/nope"));
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.body, Some(json!({"errors": {"body": ["Not found"]}})));
    }

    #[test]
    fn protected_route_without_token_is_401() {
        let response = app().handle(ApiRequest::get("/user"));
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.body,
            Some(json!({"errors": {"body": ["Unauthorized"]}}))
        );
    }

    #[test]
    fn every_protected_route_rejects_before_dispatch() {
        let app = app();
        let slug = "react-hooks-best-practices";
        let requests = [
            ApiRequest::get("/user"),
            ApiRequest::put("/user"),
            ApiRequest::post("/profiles/janesmith/follow"),
            ApiRequest::delete("/profiles/janesmith/follow"),
            ApiRequest::get("/articles/feed"),
            ApiRequest::post("/articles"),
            ApiRequest::put(format!("/articles/{slug}")),
            ApiRequest::delete(format!("/articles/{slug}")),
            ApiRequest::post(format!("/articles/{slug}/favorite")),
            ApiRequest::delete(format!("/articles/{slug}/favorite")),
            ApiRequest::post(format!("/articles/{slug}/comments")),
            ApiRequest::delete(format!("/articles/{slug}/comments/1")),
        ];
        for request in requests {
            let path = request.path.clone();
            let response = app.handle(request.with_remote(remote("10.9.0.1")).with_body("{broken"));
            assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{path}");
        }
        assert_eq!(app.store().session_count(), 0);
    }

    #[test]
    fn invalid_token_on_public_route_is_anonymous() {
        let response = app().handle(ApiRequest::get("/tags").with_token("token_bogus"));
        assert_eq!(response.status, StatusCode::OK);
    }

    #[test]
    fn register_then_current_user() {
        let app = app();
        let response = app.handle(
            ApiRequest::post("/users")
                .with_remote(remote("10.0.0.1"))
                .with_json(&json!({"user": {
                    "email": "alice@example.org",
                    "username": "alice",
                    "password": "secret"
                }})),
        );
        assert_eq!(response.status, StatusCode::CREATED);
        let body = response.body.unwrap();
        let token = body["user"]["token"].as_str().unwrap().to_string();
        assert_eq!(body["user"]["username"], "alice");

        // The token carries the session, so another address still sees the user.
        let me = app.handle(
            ApiRequest::get("/user")
                .with_remote(remote("10.9.9.9"))
                .with_token(&token),
        );
        assert_eq!(me.status, StatusCode::OK);
        assert_eq!(me.body.unwrap()["user"]["email"], "alice@example.org");
    }

    #[test]
    fn malformed_body_is_422() {
        let response = app().handle(ApiRequest::post("/users/login").with_body("{oops"));
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn origin_outside_allow_list_is_403() {
        let mut config = ServerConfig::default();
        config.origins = OriginPolicy::Allow(vec!["http://ok.test".into()]);
        let app = App::from_config(&config).unwrap();

        let denied = app.handle(ApiRequest::get("/tags").with_header("origin", "http://evil.test"));
        assert_eq!(denied.status, StatusCode::FORBIDDEN);
        let allowed = app.handle(ApiRequest::get("/tags").with_header("origin", "http://ok.test"));
        assert_eq!(allowed.status, StatusCode::OK);
    }

    #[test]
    fn client_ip_header_selects_session() {
        let config = ServerConfig::default().with_client_ip_header("X-Forwarded-For");
        let app = App::from_config(&config).unwrap();
        let forwarded = |ip: &str| {
            ApiRequest::post("/users")
                .with_remote(remote("127.0.0.1"))
                .with_header("x-forwarded-for", &format!("{ip}, 127.0.0.1"))
                .with_json(&json!({"user": {
                    "email": "bob@example.org",
                    "username": "bob",
                    "password": "pw"
                }}))
        };
        assert_eq!(app.handle(forwarded("1.1.1.1")).status, StatusCode::CREATED);
        // Same proxy, different client: a different session, so no conflict.
        assert_eq!(app.handle(forwarded("2.2.2.2")).status, StatusCode::CREATED);
        // Same client again: conflict.
        assert_eq!(app.handle(forwarded("1.1.1.1")).status, StatusCode::CONFLICT);
    }
}
