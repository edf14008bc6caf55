//! Domain model module
//!
//! Posts, their comments, and the validated payloads used to create them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Store-assigned post identifier
pub type PostId = i64;

/// Store-assigned comment identifier
pub type CommentId = i64;

/// A persisted post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub contents: String,
}

/// A persisted comment, referencing its parent post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub text: String,
}

/// Post fields supplied by a client, before the store assigns an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub contents: String,
}

/// Comment fields supplied by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub post_id: PostId,
    pub text: String,
}

/// Required-field check failures, raised before the store is touched
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please provide title and contents for the post.")]
    MissingPostFields,
    #[error("Please provide text for the comment")]
    MissingCommentText,
}

impl NewPost {
    /// Extract `title` and `contents` from a JSON request body
    pub fn from_body(body: &Map<String, Value>) -> Result<Self, ValidationError> {
        match (required_text(body, "title"), required_text(body, "contents")) {
            (Some(title), Some(contents)) => Ok(Self { title, contents }),
            _ => Err(ValidationError::MissingPostFields),
        }
    }

    pub fn into_post(self, id: PostId) -> Post {
        Post {
            id,
            title: self.title,
            contents: self.contents,
        }
    }
}

impl NewComment {
    pub fn into_comment(self, id: CommentId) -> Comment {
        Comment {
            id,
            post_id: self.post_id,
            text: self.text,
        }
    }
}

/// Extract the comment `text` from a JSON request body.
///
/// Checked before the parent post is resolved, so it does not take an id.
pub fn comment_text(body: &Map<String, Value>) -> Result<String, ValidationError> {
    required_text(body, "text").ok_or(ValidationError::MissingCommentText)
}

/// A field counts as present only when it is a non-empty string
fn required_text(body: &Map<String, Value>, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}
