//! Comment operations shared by the HTTP handlers.

use validator::Validate;

use crate::{
    error::AppError,
    models::comment::{
        Comment, CommentNode, CreateCommentRequest, NewComment, UpdateCommentRequest,
    },
    services::{
        auto_reply,
        hierarchy::build_hierarchy,
        moderation::Moderator,
        queue::{Task, TaskQueue},
        store::CommentStore,
    },
    utils::{html::clean_html, jwt::Claims},
};

/// Creates a comment on `post_id` written by the caller.
///
/// * The post must exist, and a parent comment must belong to the same post.
/// * The text is sanitized, then classified before insert; the verdict is stored as `is_blocked`.
/// * When the post wants automatic replies, one delayed task is enqueued.
///   A scheduling failure is logged and does not undo the comment.
pub async fn create_comment(
    store: &dyn CommentStore,
    moderator: &Moderator,
    queue: &dyn TaskQueue,
    claims: &Claims,
    post_id: i64,
    mut payload: CreateCommentRequest,
) -> Result<Comment, AppError> {
    payload.text = clean_html(&payload.text);
    payload.validate()?;
    let author_id = claims.user_id()?;

    let post = store
        .find_post(post_id)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    if let Some(parent_id) = payload.parent_id {
        let parent = store
            .find_comment(parent_id)
            .await?
            .ok_or(AppError::NotFound("Parent comment not found".to_string()))?;

        if parent.post_id != post.id {
            return Err(AppError::BadRequest(
                "Parent comment belongs to a different post".to_string(),
            ));
        }
    }

    let is_blocked = moderator.classify_block(&payload.text).await;

    let comment = store
        .insert_comment(NewComment {
            post_id: post.id,
            author_id,
            text: payload.text,
            parent_id: payload.parent_id,
            is_blocked,
        })
        .await?;

    if auto_reply::should_schedule(&post, author_id) {
        let task = Task::AutoReply {
            comment_id: comment.id,
        };
        if let Err(e) = queue.schedule(task, post.reply_time()).await {
            tracing::error!(comment_id = comment.id, "Failed to schedule auto-reply: {:?}", e);
        }
    }

    Ok(comment)
}

/// Replaces the text of a comment. Only its author may do so.
/// The moderation verdict taken at creation is kept.
pub async fn edit_comment(
    store: &dyn CommentStore,
    claims: &Claims,
    comment_id: i64,
    mut payload: UpdateCommentRequest,
) -> Result<Comment, AppError> {
    let comment = store
        .find_comment(comment_id)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    if comment.author_id != claims.user_id()? {
        return Err(AppError::Forbidden(
            "You do not have permission to edit this comment".to_string(),
        ));
    }

    payload.text = clean_html(&payload.text);
    payload.validate()?;

    store
        .update_comment_text(comment_id, &payload.text)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))
}

/// Deletes a comment and its replies. Allowed for the author and for staff.
pub async fn delete_comment(
    store: &dyn CommentStore,
    claims: &Claims,
    comment_id: i64,
) -> Result<(), AppError> {
    let comment = store
        .find_comment(comment_id)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    if !(claims.is_staff() || comment.author_id == claims.user_id()?) {
        return Err(AppError::Forbidden(
            "You do not have permission to delete this comment".to_string(),
        ));
    }

    if !store.delete_comment(comment_id).await? {
        return Err(AppError::NotFound("Comment not found".to_string()));
    }

    Ok(())
}

/// The comment forest of a post. 404 when the post is missing or has no comments.
pub async fn comment_forest(
    store: &dyn CommentStore,
    post_id: i64,
) -> Result<Vec<CommentNode>, AppError> {
    if store.find_post(post_id).await?.is_none() {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    let comments = store.list_comments(post_id).await?;
    if comments.is_empty() {
        return Err(AppError::NotFound("Comments not found".to_string()));
    }

    Ok(build_hierarchy(&comments)?)
}
