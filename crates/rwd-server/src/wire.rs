//! JSON wire format
//!
//! Request bodies arrive wrapped (`{"user": {...}}`, `{"article": {...}}`,
//! `{"comment": {...}}`); a missing wrapper reads as an empty payload so the
//! validation messages name the missing fields. Responses are built from an
//! [`EffectiveView`], which supplies the per-viewer `following`/`favorited`
//! flags.

use crate::error::{ApiError, ApiResult};
use rwd_model::{Article, Comment, Timestamp, User, UserId};
use rwd_store::{ArticleFilter, AuthToken, EffectiveView, Page};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

/// Unwrap `{"<key>": payload}`; an empty body or missing key gives the default
///
/// # Errors
/// `MalformedBody` when the body is not JSON, not an object, or the payload
/// has the wrong shape.
pub fn parse_wrapped<T: DeserializeOwned + Default>(body: &[u8], key: &str) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| ApiError::MalformedBody(e.to_string()))?;
    let serde_json::Value::Object(mut object) = value else {
        return Err(ApiError::MalformedBody("expected a JSON object".to_string()));
    };
    match object.remove(key) {
        None | Some(serde_json::Value::Null) => Ok(T::default()),
        Some(payload) => {
            serde_json::from_value(payload).map_err(|e| ApiError::MalformedBody(e.to_string()))
        }
    }
}

/// Parse listing query parameters
///
/// # Errors
/// `InvalidQuery` for a non-numeric `limit` or `offset`.
pub fn parse_listing(query: &HashMap<String, String>) -> ApiResult<(ArticleFilter, Page)> {
    let number = |param: &'static str, default: usize| -> ApiResult<usize> {
        match query.get(param).map(|v| v.trim()) {
            None | Some("") => Ok(default),
            Some(v) => v.parse().map_err(|_| ApiError::InvalidQuery { param }),
        }
    };
    let page = Page::new(number("offset", 0)?, number("limit", Page::DEFAULT_LIMIT)?);

    let text = |param: &str| query.get(param).filter(|v| !v.is_empty()).cloned();
    let filter = ArticleFilter {
        tag: text("tag"),
        author: text("author"),
        favorited: text("favorited"),
    };
    Ok((filter, page))
}

/// Authenticated user
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserDto {
    /// Login email
    pub email: String,
    /// Bearer token
    pub token: String,
    /// Handle
    pub username: String,
    /// Profile text
    pub bio: String,
    /// Avatar URL
    pub image: String,
}

impl UserDto {
    /// Build from a user and the token presented or issued
    #[must_use]
    pub fn new(user: &User, token: &AuthToken) -> Self {
        Self {
            email: user.email.clone(),
            token: token.to_string(),
            username: user.username.clone(),
            bio: user.bio.clone(),
            image: user.image.clone(),
        }
    }
}

/// Public profile as seen by one viewer
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProfileDto {
    /// Handle
    pub username: String,
    /// Profile text
    pub bio: String,
    /// Avatar URL
    pub image: String,
    /// Whether the viewer follows this user
    pub following: bool,
}

impl ProfileDto {
    /// Build for `viewer` (anonymous when `None`)
    #[must_use]
    pub fn build(view: &EffectiveView<'_>, user: &User, viewer: Option<UserId>) -> Self {
        Self {
            username: user.username.clone(),
            bio: user.bio.clone(),
            image: user.image.clone(),
            following: viewer.is_some_and(|v| view.is_following(v, user.id)),
        }
    }
}

/// Article as seen by one viewer
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDto {
    /// URL key
    pub slug: String,
    /// Title
    pub title: String,
    /// Short description
    pub description: String,
    /// Markdown body
    pub body: String,
    /// Sorted tags
    pub tag_list: Vec<String>,
    /// Creation time
    pub created_at: Timestamp,
    /// Last change
    pub updated_at: Timestamp,
    /// Whether the viewer favorited it
    pub favorited: bool,
    /// Favorites visible in this session
    pub favorites_count: usize,
    /// Author profile
    pub author: ProfileDto,
}

impl ArticleDto {
    /// Build for `viewer`
    ///
    /// # Errors
    /// `Internal` when the author is not visible.
    pub fn build(
        view: &EffectiveView<'_>,
        article: &Article,
        viewer: Option<UserId>,
    ) -> ApiResult<Self> {
        let author = author(view, article.author_id)?;
        Ok(Self {
            slug: article.slug.clone(),
            title: article.title.clone(),
            description: article.description.clone(),
            body: article.body.clone(),
            tag_list: article.tag_list.clone(),
            created_at: article.created_at,
            updated_at: article.updated_at,
            favorited: viewer.is_some_and(|v| view.is_favorited(v, article.id)),
            favorites_count: view.favorites_count(article.id),
            author: ProfileDto::build(view, author, viewer),
        })
    }
}

/// One page of articles
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArticlesDto {
    /// Articles in the window
    pub articles: Vec<ArticleDto>,
    /// Matches before pagination
    pub articles_count: usize,
}

/// Comment as seen by one viewer
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    /// Identifier
    pub id: u64,
    /// Creation time
    pub created_at: Timestamp,
    /// Last change
    pub updated_at: Timestamp,
    /// Text
    pub body: String,
    /// Author profile
    pub author: ProfileDto,
}

impl CommentDto {
    /// Build for `viewer`
    ///
    /// # Errors
    /// `Internal` when the author is not visible.
    pub fn build(
        view: &EffectiveView<'_>,
        comment: &Comment,
        viewer: Option<UserId>,
    ) -> ApiResult<Self> {
        let author = author(view, comment.author_id)?;
        Ok(Self {
            id: comment.id.get(),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
            body: comment.body.clone(),
            author: ProfileDto::build(view, author, viewer),
        })
    }
}

fn author<'v>(view: &EffectiveView<'v>, id: UserId) -> ApiResult<&'v User> {
    view.user(id)
        .ok_or_else(|| ApiError::Internal(format!("author {id} is not visible")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rwd_model::{Credentials, NewArticle};

    #[test]
    fn wrapped_payload_is_extracted() {
        let body = br#"{"user": {"email": "a@b.c", "password": "pw"}}"#;
        let creds: Credentials = parse_wrapped(body, "user").unwrap();
        assert_eq!(creds.email.as_deref(), Some("a@b.c"));
        assert_eq!(creds.password.as_deref(), Some("pw"));
    }

    #[test]
    fn missing_wrapper_or_body_reads_as_empty() {
        let creds: Credentials = parse_wrapped(b"", "user").unwrap();
        assert!(creds.email.is_none());
        let creds: Credentials = parse_wrapped(br#"{"other": 1}"#, "user").unwrap();
        assert!(creds.password.is_none());
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = parse_wrapped::<Credentials>(b"{not json", "user").unwrap_err();
        assert!(matches!(err, ApiError::MalformedBody(_)));
        let err = parse_wrapped::<Credentials>(b"[1, 2]", "user").unwrap_err();
        assert!(matches!(err, ApiError::MalformedBody(_)));
        let err = parse_wrapped::<NewArticle>(br#"{"article": {"title": 5}}"#, "article")
            .unwrap_err();
        assert_eq!(err.status().as_u16(), 422);
    }

    #[test]
    fn listing_defaults_and_filters() {
        let (filter, page) = parse_listing(&HashMap::new()).unwrap();
        assert_eq!(filter, ArticleFilter::default());
        assert_eq!(page, Page::default());

        let query: HashMap<String, String> = [("tag", "rust"), ("limit", "5"), ("offset", "10")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let (filter, page) = parse_listing(&query).unwrap();
        assert_eq!(filter.tag.as_deref(), Some("rust"));
        assert_eq!(page, Page::new(10, 5));
    }

    #[test]
    fn non_numeric_paging_is_rejected() {
        let query: HashMap<String, String> =
            [("limit".to_string(), "ten".to_string())].into_iter().collect();
        assert_eq!(
            parse_listing(&query).unwrap_err(),
            ApiError::InvalidQuery { param: "limit" }
        );
    }
}
