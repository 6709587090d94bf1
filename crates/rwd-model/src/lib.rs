//! RWD Model - records and inputs of the RealWorld contract
//!
//! Plain data shared by the store and the HTTP layer:
//! - Typed identifiers and the process-wide [`IdAllocator`]
//! - [`User`], [`Article`] and [`Comment`] records
//! - A monotonic [`Clock`] for write timestamps
//! - Slug generation and password digests
//! - Request inputs that validate themselves against [`FieldLimits`]
//!
//! # Example
//!
//! ```rust
//! use rwd_model::{slugify, FieldLimits, NewArticle};
//!
//! let input = NewArticle {
//!     title: Some("How to train your dragon".into()),
//!     description: Some("Ever wonder how?".into()),
//!     body: Some("You have to believe".into()),
//!     tag_list: Some(vec!["dragons".into(), "training".into()]),
//! };
//! let draft = input.validate(&FieldLimits::default()).unwrap();
//! assert_eq!(slugify(&draft.title), "how-to-train-your-dragon");
//! ```

#![warn(unreachable_pub)]

pub mod clock;
pub mod error;
pub mod ids;
pub mod input;
pub mod password;
pub mod records;
pub mod slug;

pub use clock::{Clock, ManualClock, MonotonicClock, Timestamp};
pub use error::ValidationError;
pub use ids::{ArticleId, CommentId, IdAllocator, UserId};
pub use input::{
    ArticleChanges, ArticleDraft, CommentDraft, Credentials, FieldLimits, Login, NewArticle,
    NewComment, NewUser, Registration, UserChanges,
};
pub use password::{hash_password, verify_password};
pub use records::{Article, Comment, User};
pub use slug::slugify;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
