//! Comment store: the persistence seam for the comment pipeline.

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        comment::{Comment, DailyCount, NewComment},
        post::Post,
    },
};

/// Storage operations the comment pipeline depends on.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn find_post(&self, post_id: i64) -> Result<Option<Post>, AppError>;

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, AppError>;

    /// All comments of a post, newest first.
    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError>;

    /// All comments of several posts, newest first.
    async fn list_comments_for_posts(&self, post_ids: &[i64]) -> Result<Vec<Comment>, AppError>;

    async fn insert_comment(&self, new: NewComment) -> Result<Comment, AppError>;

    /// Replaces the text of a comment. `None` if it no longer exists.
    async fn update_comment_text(&self, id: i64, text: &str) -> Result<Option<Comment>, AppError>;

    /// Deletes a comment and, by cascade, all of its replies.
    async fn delete_comment(&self, id: i64) -> Result<bool, AppError>;

    /// Whether `author_id` already posted a direct reply to comment `parent_id`.
    async fn has_reply_from(&self, parent_id: i64, author_id: i64) -> Result<bool, AppError>;

    /// Created and blocked counts per UTC day within `[from, to]`, ascending.
    /// Days without comments are omitted.
    async fn daily_counts(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyCount>, AppError>;
}

const COMMENT_COLUMNS: &str = r#"
    c.id, c.post_id, c.author_id, u.username AS author_username,
    c.text, c.parent_id, c.is_blocked, c.created_at
"#;

/// Postgres-backed [`CommentStore`].
#[derive(Clone)]
pub struct PgCommentStore {
    pool: PgPool,
}

impl PgCommentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// The post or parent can vanish between lookup and insert; the foreign keys
/// catch that and it is reported as the missing row.
fn insert_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() {
            match db.constraint() {
                Some("comments_parent_id_fkey") => {
                    return AppError::NotFound("Parent comment not found".to_string());
                }
                Some("comments_post_id_fkey") => {
                    return AppError::NotFound("Post not found".to_string());
                }
                _ => {}
            }
        }
    }
    tracing::error!("Failed to insert comment: {:?}", err);
    AppError::from(err)
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn find_post(&self, post_id: i64) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, author_id, title, text, created_at,
                   reply_on_comments, reply_time_secs, is_blocked
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, AppError> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c JOIN users u ON c.author_id = u.id WHERE c.id = $1"
        );
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        self.list_comments_for_posts(&[post_id]).await
    }

    async fn list_comments_for_posts(&self, post_ids: &[i64]) -> Result<Vec<Comment>, AppError> {
        let sql = format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments c
            JOIN users u ON c.author_id = u.id
            WHERE c.post_id = ANY($1)
            ORDER BY c.created_at DESC, c.id DESC
            "#
        );
        let comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(post_ids.to_vec())
            .fetch_all(&self.pool)
            .await?;

        Ok(comments)
    }

    async fn insert_comment(&self, new: NewComment) -> Result<Comment, AppError> {
        let sql = format!(
            r#"
            WITH c AS (
                INSERT INTO comments (post_id, author_id, text, parent_id, is_blocked)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            )
            SELECT {COMMENT_COLUMNS} FROM c JOIN users u ON c.author_id = u.id
            "#
        );
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(new.post_id)
            .bind(new.author_id)
            .bind(&new.text)
            .bind(new.parent_id)
            .bind(new.is_blocked)
            .fetch_one(&self.pool)
            .await
            .map_err(insert_error)?;

        Ok(comment)
    }

    async fn update_comment_text(&self, id: i64, text: &str) -> Result<Option<Comment>, AppError> {
        let sql = format!(
            r#"
            WITH c AS (
                UPDATE comments SET text = $2 WHERE id = $1
                RETURNING *
            )
            SELECT {COMMENT_COLUMNS} FROM c JOIN users u ON c.author_id = u.id
            "#
        );
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .bind(text)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn has_reply_from(&self, parent_id: i64, author_id: i64) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM comments WHERE parent_id = $1 AND author_id = $2)",
        )
        .bind(parent_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn daily_counts(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyCount>, AppError> {
        let start = from.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
        let end = to
            .checked_add_days(Days::new(1))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|t| t.and_utc());
        let (Some(start), Some(end)) = (start, end) else {
            return Err(AppError::BadRequest("Date range out of bounds".to_string()));
        };

        let rows = sqlx::query_as::<_, DailyCount>(
            r#"
            SELECT
                (created_at AT TIME ZONE 'UTC')::DATE AS day,
                COUNT(*) AS created,
                COUNT(*) FILTER (WHERE is_blocked) AS blocked
            FROM comments
            WHERE created_at >= $1 AND created_at < $2
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("constraint violated")]
    struct Violation {
        foreign_key: bool,
        constraint: &'static str,
    }

    impl DatabaseError for Violation {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            Some(self.constraint)
        }

        fn kind(&self) -> ErrorKind {
            if self.foreign_key {
                ErrorKind::ForeignKeyViolation
            } else {
                ErrorKind::CheckViolation
            }
        }
    }

    fn violation(foreign_key: bool, constraint: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(Violation {
            foreign_key,
            constraint,
        }))
    }

    #[test]
    fn vanished_parent_is_not_found() {
        let err = insert_error(violation(true, "comments_parent_id_fkey"));
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Parent comment not found"));
    }

    #[test]
    fn vanished_post_is_not_found() {
        let err = insert_error(violation(true, "comments_post_id_fkey"));
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Post not found"));
    }

    #[test]
    fn other_database_errors_stay_internal() {
        let err = insert_error(violation(false, "comments_text_check"));
        assert!(matches!(err, AppError::InternalServerError(_)));
    }
}
