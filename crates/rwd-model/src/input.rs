//! Request inputs and their validation
//!
//! Inputs deserialize with every field optional so that a missing field is a
//! validation message rather than a parse failure. `validate` either returns
//! the checked value or a [`ValidationError`]; nothing is half-accepted.

use crate::error::ValidationError;
use crate::records::normalize_tags;
use serde::Deserialize;

/// Maximum field sizes, counted in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLimits {
    /// User email
    pub user_email: usize,
    /// User name
    pub user_username: usize,
    /// Plaintext password
    pub user_password: usize,
    /// User bio
    pub user_bio: usize,
    /// User image URL
    pub user_image: usize,
    /// Article title
    pub article_title: usize,
    /// Article description
    pub article_description: usize,
    /// Article body
    pub article_body: usize,
    /// Number of tags on one article
    pub article_tag_count: usize,
    /// Length of a single tag
    pub article_tag_len: usize,
    /// Comment body
    pub comment_body: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            user_email: 100,
            user_username: 60,
            user_password: 60,
            user_bio: 400,
            user_image: 200,
            article_title: 100,
            article_description: 300,
            article_body: 10_000,
            article_tag_count: 10,
            article_tag_len: 20,
            comment_body: 3_000,
        }
    }
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

fn present(value: Option<&String>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

fn check_optional(
    errors: &mut Vec<String>,
    name: &str,
    value: Option<&String>,
    max: usize,
) {
    if let Some(value) = value {
        if char_len(value) > max {
            errors.push(format!("{name} is an optional string of length <= {max}"));
        }
    }
}

fn check_tags(errors: &mut Vec<String>, tags: Option<&Vec<String>>, limits: &FieldLimits) {
    if let Some(tags) = tags {
        if tags.len() > limits.article_tag_count
            || tags.iter().any(|t| char_len(t) > limits.article_tag_len)
        {
            errors.push(format!(
                "tagList is an optional list of less than {} strings of less than {} chars",
                limits.article_tag_count, limits.article_tag_len
            ));
        }
    }
}

fn finish<T>(errors: Vec<String>, value: T) -> Result<T, ValidationError> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(ValidationError { messages: errors })
    }
}

/// Registration payload (`POST /users`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    /// Email
    pub email: Option<String>,
    /// Username
    pub username: Option<String>,
    /// Plaintext password
    pub password: Option<String>,
}

/// Checked registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Email
    pub email: String,
    /// Username
    pub username: String,
    /// Plaintext password
    pub password: String,
}

impl NewUser {
    /// Require all fields and enforce length limits
    ///
    /// # Errors
    /// Missing, empty or over-length fields.
    pub fn validate(self, limits: &FieldLimits) -> Result<Registration, ValidationError> {
        let (Some(email), Some(username), Some(password)) = (self.email, self.username, self.password)
        else {
            return Err(ValidationError::new(
                "Email, username and password are required",
            ));
        };
        if email.is_empty() || username.is_empty() || password.is_empty() {
            return Err(ValidationError::new(
                "Email, username and password are required",
            ));
        }
        if char_len(&email) > limits.user_email
            || char_len(&username) > limits.user_username
            || char_len(&password) > limits.user_password
        {
            return Err(ValidationError::new(format!(
                "Email, username and password are expected as strings of length less than \
                 {}, {}, and {}, respectively",
                limits.user_email, limits.user_username, limits.user_password
            )));
        }
        Ok(Registration {
            email,
            username,
            password,
        })
    }
}

/// Login payload (`POST /users/login`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    /// Email
    pub email: Option<String>,
    /// Plaintext password
    pub password: Option<String>,
}

/// Checked login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    /// Email
    pub email: String,
    /// Plaintext password
    pub password: String,
}

impl Credentials {
    /// Require both fields
    ///
    /// # Errors
    /// Missing or empty email/password.
    pub fn validate(self) -> Result<Login, ValidationError> {
        match (self.email, self.password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Ok(Login { email, password })
            }
            _ => Err(ValidationError::new("Email and password are required")),
        }
    }
}

/// Profile update payload (`PUT /user`); absent fields stay unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserChanges {
    /// New email
    pub email: Option<String>,
    /// New username
    pub username: Option<String>,
    /// New plaintext password
    pub password: Option<String>,
    /// New bio
    pub bio: Option<String>,
    /// New image URL
    pub image: Option<String>,
}

impl UserChanges {
    /// Enforce limits on the fields that are present
    ///
    /// # Errors
    /// Over-length fields, or an empty email/username/password.
    pub fn validate(self, limits: &FieldLimits) -> Result<Self, ValidationError> {
        let mut errors = Vec::new();
        for (name, value) in [
            ("email", &self.email),
            ("username", &self.username),
            ("password", &self.password),
        ] {
            if value.as_ref().is_some_and(String::is_empty) {
                errors.push(format!("{name} cannot be empty"));
            }
        }
        check_optional(&mut errors, "email", self.email.as_ref(), limits.user_email);
        check_optional(&mut errors, "username", self.username.as_ref(), limits.user_username);
        check_optional(&mut errors, "password", self.password.as_ref(), limits.user_password);
        check_optional(&mut errors, "bio", self.bio.as_ref(), limits.user_bio);
        check_optional(&mut errors, "image", self.image.as_ref(), limits.user_image);
        finish(errors, self)
    }
}

/// Article creation payload (`POST /articles`)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    /// Title
    pub title: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Body
    pub body: Option<String>,
    /// Tags
    pub tag_list: Option<Vec<String>>,
}

/// Checked article creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDraft {
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Body
    pub body: String,
    /// Sorted, deduplicated tags
    pub tag_list: Vec<String>,
}

impl NewArticle {
    /// Require title, description and body; enforce limits
    ///
    /// # Errors
    /// Missing or over-length fields, oversize tag list.
    pub fn validate(self, limits: &FieldLimits) -> Result<ArticleDraft, ValidationError> {
        if !(present(self.title.as_ref())
            && present(self.description.as_ref())
            && present(self.body.as_ref()))
        {
            return Err(ValidationError::new(
                "Title, description and body are required",
            ));
        }
        let mut errors = Vec::new();
        check_optional(&mut errors, "title", self.title.as_ref(), limits.article_title);
        check_optional(
            &mut errors,
            "description",
            self.description.as_ref(),
            limits.article_description,
        );
        check_optional(&mut errors, "body", self.body.as_ref(), limits.article_body);
        check_tags(&mut errors, self.tag_list.as_ref(), limits);
        let draft = ArticleDraft {
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            body: self.body.unwrap_or_default(),
            tag_list: normalize_tags(self.tag_list.unwrap_or_default()),
        };
        finish(errors, draft)
    }
}

/// Article update payload (`PUT /articles/:slug`); absent fields stay unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleChanges {
    /// New title (also regenerates the slug)
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New body
    pub body: Option<String>,
    /// Replacement tag list
    pub tag_list: Option<Vec<String>>,
}

impl ArticleChanges {
    /// Enforce limits on the fields that are present; normalizes tags
    ///
    /// # Errors
    /// Empty title, over-length fields, oversize tag list.
    pub fn validate(self, limits: &FieldLimits) -> Result<Self, ValidationError> {
        let mut errors = Vec::new();
        if self.title.as_ref().is_some_and(String::is_empty) {
            errors.push("title cannot be empty".to_string());
        }
        check_optional(&mut errors, "title", self.title.as_ref(), limits.article_title);
        check_optional(
            &mut errors,
            "description",
            self.description.as_ref(),
            limits.article_description,
        );
        check_optional(&mut errors, "body", self.body.as_ref(), limits.article_body);
        check_tags(&mut errors, self.tag_list.as_ref(), limits);
        let changes = Self {
            tag_list: self.tag_list.map(normalize_tags),
            ..self
        };
        finish(errors, changes)
    }
}

/// Comment payload (`POST /articles/:slug/comments`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewComment {
    /// Text
    pub body: Option<String>,
}

/// Checked comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDraft {
    /// Text
    pub body: String,
}

impl NewComment {
    /// Require a non-empty body within limits
    ///
    /// # Errors
    /// Missing, empty or over-length body.
    pub fn validate(self, limits: &FieldLimits) -> Result<CommentDraft, ValidationError> {
        match self.body {
            Some(body) if !body.is_empty() => {
                if char_len(&body) > limits.comment_body {
                    Err(ValidationError::new(format!(
                        "Body is a string of less than {} chars",
                        limits.comment_body
                    )))
                } else {
                    Ok(CommentDraft { body })
                }
            }
            _ => Err(ValidationError::new("Body is required")),
        }
    }
}
