use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::user::Author;

/// A row of the 'comments' table joined with its author's username.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub text: String,
    /// `None` for top-level comments.
    pub parent_id: Option<i64>,
    /// Moderation verdict taken at creation time. Edits never change it.
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the comment store.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    pub parent_id: Option<i64>,
    pub is_blocked: bool,
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(
        min = 6,
        max = 255,
        message = "Comment must be between 6 and 255 characters"
    ))]
    pub text: String,

    /// Optional: the ID of the comment being replied to.
    pub parent_id: Option<i64>,
}

/// DTO for editing a comment. Only the text may change.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(
        min = 6,
        max = 255,
        message = "Comment must be between 6 and 255 characters"
    ))]
    pub text: String,
}

/// A comment together with its nested replies, as rendered in a comment forest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentNode {
    pub id: i64,
    pub post_id: i64,
    pub author: Author,
    pub text: String,
    pub parent_id: Option<i64>,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub replies: Vec<CommentNode>,
}

impl From<&Comment> for CommentNode {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            author: Author {
                id: comment.author_id,
                username: comment.author_username.clone(),
            },
            text: comment.text.clone(),
            parent_id: comment.parent_id,
            is_blocked: comment.is_blocked,
            created_at: comment.created_at,
            replies: Vec::new(),
        }
    }
}

/// Query parameters for the daily breakdown.
#[derive(Debug, Deserialize)]
pub struct DateRangeParams {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub page: Option<i64>,
}

/// Per-day counters as returned by the grouped query. Days without comments are absent.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub created: i64,
    pub blocked: i64,
}

/// One row of the daily breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentAnalytics {
    pub date: NaiveDate,
    pub created_comments: i64,
    pub blocked_comments: i64,
}
