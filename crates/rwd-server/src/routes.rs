//! Route table
//!
//! Maps `{method, path}` under the mount prefix to one API operation.
//! Trailing and doubled slashes are ignored. Path segments are
//! percent-decoded, so `/profiles/jane%20doe` names `jane doe`.

use percent_encoding::percent_decode_str;
use rwd_model::CommentId;
use warp::http::Method;

/// One API operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `POST /users`
    Register,
    /// `POST /users/login`
    Login,
    /// `GET /user`
    CurrentUser,
    /// `PUT /user`
    UpdateUser,
    /// `GET /profiles/:username`
    GetProfile(String),
    /// `POST /profiles/:username/follow`
    Follow(String),
    /// `DELETE /profiles/:username/follow`
    Unfollow(String),
    /// `GET /articles`
    ListArticles,
    /// `GET /articles/feed`
    Feed,
    /// `POST /articles`
    CreateArticle,
    /// `GET /articles/:slug`
    GetArticle(String),
    /// `PUT /articles/:slug`
    UpdateArticle(String),
    /// `DELETE /articles/:slug`
    DeleteArticle(String),
    /// `POST /articles/:slug/favorite`
    Favorite(String),
    /// `DELETE /articles/:slug/favorite`
    Unfavorite(String),
    /// `GET /articles/:slug/comments`
    ListComments(String),
    /// `POST /articles/:slug/comments`
    AddComment(String),
    /// `DELETE /articles/:slug/comments/:id`
    DeleteComment {
        /// Article slug
        slug: String,
        /// Comment id
        id: CommentId,
    },
    /// `GET /tags`
    Tags,
    /// `OPTIONS` on any path
    Preflight,
}

impl Route {
    /// Match a request; `None` means not found
    ///
    /// `prefix` is either empty or a normalized `/a/b` mount path.
    #[must_use]
    pub fn parse(method: &Method, path: &str, prefix: &str) -> Option<Self> {
        if *method == Method::OPTIONS {
            return Some(Self::Preflight);
        }

        let segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| percent_decode_str(s).decode_utf8().map(|d| d.into_owned()))
            .collect::<Result<_, _>>()
            .ok()?;
        let mount: Vec<&str> = prefix.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() < mount.len() || segments.iter().zip(&mount).any(|(a, b)| a.as_str() != *b) {
            return None;
        }
        let rest: Vec<&str> = segments[mount.len()..].iter().map(String::as_str).collect();

        let route = match (method.as_str(), rest.as_slice()) {
            ("POST", ["users"]) => Self::Register,
            ("POST", ["users", "login"]) => Self::Login,
            ("GET", ["user"]) => Self::CurrentUser,
            ("PUT", ["user"]) => Self::UpdateUser,
            ("GET", ["profiles", name]) => Self::GetProfile((*name).to_string()),
            ("POST", ["profiles", name, "follow"]) => Self::Follow((*name).to_string()),
            ("DELETE", ["profiles", name, "follow"]) => Self::Unfollow((*name).to_string()),
            ("GET", ["articles"]) => Self::ListArticles,
            ("GET", ["articles", "feed"]) => Self::Feed,
            ("POST", ["articles"]) => Self::CreateArticle,
            ("GET", ["articles", slug]) => Self::GetArticle((*slug).to_string()),
            ("PUT", ["articles", slug]) => Self::UpdateArticle((*slug).to_string()),
            ("DELETE", ["articles", slug]) => Self::DeleteArticle((*slug).to_string()),
            ("POST", ["articles", slug, "favorite"]) => Self::Favorite((*slug).to_string()),
            ("DELETE", ["articles", slug, "favorite"]) => Self::Unfavorite((*slug).to_string()),
            ("GET", ["articles", slug, "comments"]) => Self::ListComments((*slug).to_string()),
            ("POST", ["articles", slug, "comments"]) => Self::AddComment((*slug).to_string()),
            ("DELETE", ["articles", slug, "comments", id]) => Self::DeleteComment {
                slug: (*slug).to_string(),
                id: CommentId(id.parse().ok()?),
            },
            ("GET", ["tags"]) => Self::Tags,
            _ => return None,
        };
        Some(route)
    }

    /// Whether the operation needs an authenticated user
    #[must_use]
    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Self::CurrentUser
                | Self::UpdateUser
                | Self::Follow(_)
                | Self::Unfollow(_)
                | Self::Feed
                | Self::CreateArticle
                | Self::UpdateArticle(_)
                | Self::DeleteArticle(_)
                | Self::Favorite(_)
                | Self::Unfavorite(_)
                | Self::AddComment(_)
                | Self::DeleteComment { .. }
        )
    }

    /// Operation name for logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Login => "login",
            Self::CurrentUser => "current_user",
            Self::UpdateUser => "update_user",
            Self::GetProfile(_) => "get_profile",
            Self::Follow(_) => "follow",
            Self::Unfollow(_) => "unfollow",
            Self::ListArticles => "list_articles",
            Self::Feed => "feed",
            Self::CreateArticle => "create_article",
            Self::GetArticle(_) => "get_article",
            Self::UpdateArticle(_) => "update_article",
            Self::DeleteArticle(_) => "delete_article",
            Self::Favorite(_) => "favorite",
            Self::Unfavorite(_) => "unfavorite",
            Self::ListComments(_) => "list_comments",
            Self::AddComment(_) => "add_comment",
            Self::DeleteComment { .. } => "delete_comment",
            Self::Tags => "tags",
            Self::Preflight => "preflight",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse(method: Method, path: &str) -> Option<Route> {
        Route::parse(&method, path, "")
    }

    #[test]
    fn matches_every_operation() {
        let cases = [
            (Method::POST, "/users", Route::Register),
            (Method::POST, "/users/login", Route::Login),
            (Method::GET, "/user", Route::CurrentUser),
            (Method::PUT, "/user", Route::UpdateUser),
            (Method::GET, "/profiles/jake", Route::GetProfile("jake".into())),
            (Method::POST, "/profiles/jake/follow", Route::Follow("jake".into())),
            (Method::DELETE, "/profiles/jake/follow", Route::Unfollow("jake".into())),
            (Method::GET, "/articles", Route::ListArticles),
            (Method::GET, "/articles/feed", Route::Feed),
            (Method::POST, "/articles", Route::CreateArticle),
            (Method::GET, "/articles/a-b", Route::GetArticle("a-b".into())),
            (Method::PUT, "/articles/a-b", Route::UpdateArticle("a-b".into())),
            (Method::DELETE, "/articles/a-b", Route::DeleteArticle("a-b".into())),
            (Method::POST, "/articles/a-b/favorite", Route::Favorite("a-b".into())),
            (Method::DELETE, "/articles/a-b/favorite", Route::Unfavorite("a-b".into())),
            (Method::GET, "/articles/a-b/comments", Route::ListComments("a-b".into())),
            (Method::POST, "/articles/a-b/comments", Route::AddComment("a-b".into())),
            (
                Method::DELETE,
                "/articles/a-b/comments/7",
                Route::DeleteComment {
                    slug: "a-b".into(),
                    id: CommentId(7),
                },
            ),
            (Method::GET, "/tags", Route::Tags),
        ];
        for (method, path, expected) in cases {
            assert_eq!(parse(method, path), Some(expected), "{path}");
        }
    }

    #[test]
    fn trailing_slash_is_ignored() {
        assert_eq!(parse(Method::GET, "/articles/"), Some(Route::ListArticles));
        assert_eq!(parse(Method::GET, "//tags//"), Some(Route::Tags));
    }

    #[test]
    fn prefix_must_match() {
        let route = Route::parse(&Method::GET, "/api/tags", "/api");
        assert_eq!(route, Some(Route::Tags));
        assert_eq!(Route::parse(&Method::GET, "/tags", "/api"), None);
        assert_eq!(Route::parse(&Method::GET, "/v2/tags", "/api"), None);
    }

    #[test]
    fn unknown_paths_and_methods_miss() {
        assert_eq!(parse(Method::PATCH, "/user"), None);
        assert_eq!(parse(Method::GET, "/nope"), None);
        assert_eq!(parse(Method::DELETE, "/articles/a/comments/x"), None);
        assert_eq!(parse(Method::GET, "/"), None);
    }

    #[test]
    fn options_is_always_preflight() {
        assert_eq!(parse(Method::OPTIONS, "/anything/at/all"), Some(Route::Preflight));
        assert!(!Route::Preflight.requires_auth());
    }

    #[test]
    fn segments_are_percent_decoded() {
        assert_eq!(
            parse(Method::GET, "/profiles/jane%20doe"),
            Some(Route::GetProfile("jane doe".into()))
        );
    }

    #[test]
    fn public_routes_do_not_require_auth() {
        for route in [
            Route::Register,
            Route::Login,
            Route::ListArticles,
            Route::GetArticle("x".into()),
            Route::ListComments("x".into()),
            Route::GetProfile("x".into()),
            Route::Tags,
        ] {
            assert!(!route.requires_auth(), "{}", route.name());
        }
        assert!(Route::Feed.requires_auth());
    }

    proptest! {
        #[test]
        fn slugs_round_trip_through_get(slug in "[a-z0-9][a-z0-9-]{0,30}") {
            prop_assume!(slug != "feed");
            let path = format!("/articles/{slug}/");
            prop_assert_eq!(parse(Method::GET, &path), Some(Route::GetArticle(slug)));
        }
    }
}
