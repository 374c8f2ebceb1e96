use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{comment::CommentNode, user::Author};

/// Represents the 'posts' table in the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub text: String,
    pub created_at: DateTime<Utc>,

    /// Whether comments from other users get an automatic reply.
    pub reply_on_comments: bool,
    /// Delay before the automatic reply fires, in seconds.
    pub reply_time_secs: i64,

    pub is_blocked: bool,
}

impl Post {
    pub fn reply_time(&self) -> Duration {
        Duration::from_secs(self.reply_time_secs.max(0) as u64)
    }
}

/// A post row joined with its author's username.
#[derive(Debug, Clone, FromRow)]
pub struct PostWithAuthor {
    #[sqlx(flatten)]
    pub post: Post,
    pub author_username: String,
}

/// Post as rendered to clients, with its comment forest.
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    pub reply_on_comments: bool,
    pub reply_time_secs: i64,
    pub is_blocked: bool,
    pub comments: Vec<CommentNode>,
}

impl PostResponse {
    pub fn new(row: PostWithAuthor, comments: Vec<CommentNode>) -> Self {
        let PostWithAuthor { post, author_username } = row;
        Self {
            id: post.id,
            title: post.title,
            text: post.text,
            author: Author {
                id: post.author_id,
                username: author_username,
            },
            created_at: post.created_at,
            reply_on_comments: post.reply_on_comments,
            reply_time_secs: post.reply_time_secs,
            is_blocked: post.is_blocked,
            comments,
        }
    }
}

/// DTO for creating a new post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title length must be between 1 and 255 chars"
    ))]
    pub title: String,

    #[validate(length(
        min = 6,
        max = 255,
        message = "Text length must be between 6 and 255 chars"
    ))]
    pub text: String,

    #[validate(range(min = 0, max = 604800, message = "Reply time must be within a week"))]
    pub reply_time_secs: Option<i64>,

    pub reply_on_comments: Option<bool>,
}

/// DTO for editing a post. Absent fields are left untouched.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title length must be between 1 and 255 chars"
    ))]
    pub title: Option<String>,

    #[validate(length(
        min = 6,
        max = 255,
        message = "Text length must be between 6 and 255 chars"
    ))]
    pub text: Option<String>,

    #[validate(range(min = 0, max = 604800, message = "Reply time must be within a week"))]
    pub reply_time_secs: Option<i64>,
}
