//! Automatic replies on behalf of a post's author.

use crate::{
    error::AppError,
    models::{
        comment::{Comment, NewComment},
        post::Post,
    },
    services::{moderation::Moderator, store::CommentStore},
    utils::html::clean_html,
};

const TRACING_TARGET: &str = "social_service::auto_reply";

/// Longest text the comments table accepts.
const MAX_REPLY_CHARS: usize = 255;

/// A new comment gets an automatic reply when the post opted in and the
/// comment was written by someone other than the post's author.
pub fn should_schedule(post: &Post, comment_author_id: i64) -> bool {
    post.reply_on_comments && post.author_id != comment_author_id
}

/// Runs a scheduled auto-reply for `comment_id`.
///
/// Re-reads everything it needs and quietly does nothing when the comment is
/// gone, the post no longer wants replies, the author already answered, or no
/// reply could be generated. Returns the reply it created, if any.
pub async fn execute(
    store: &dyn CommentStore,
    moderator: &Moderator,
    comment_id: i64,
) -> Result<Option<Comment>, AppError> {
    let Some(comment) = store.find_comment(comment_id).await? else {
        tracing::debug!(target: TRACING_TARGET, comment_id, "Comment deleted, skipping reply");
        return Ok(None);
    };

    let Some(post) = store.find_post(comment.post_id).await? else {
        tracing::debug!(target: TRACING_TARGET, comment_id, "Post deleted, skipping reply");
        return Ok(None);
    };

    if !post.reply_on_comments {
        tracing::debug!(target: TRACING_TARGET, comment_id, "Auto-reply turned off, skipping");
        return Ok(None);
    }

    if store.has_reply_from(comment.id, post.author_id).await? {
        tracing::debug!(target: TRACING_TARGET, comment_id, "Author already replied, skipping");
        return Ok(None);
    }

    let Some(reply) = moderator.generate_reply(&post.text, &comment.text).await else {
        tracing::info!(target: TRACING_TARGET, comment_id, "No reply generated");
        return Ok(None);
    };

    let Some(text) = fit_reply(&reply) else {
        tracing::info!(target: TRACING_TARGET, comment_id, "Reply empty after sanitizing");
        return Ok(None);
    };

    let created = store
        .insert_comment(NewComment {
            post_id: post.id,
            author_id: post.author_id,
            text,
            parent_id: Some(comment.id),
            is_blocked: false,
        })
        .await?;

    tracing::info!(
        target: TRACING_TARGET,
        comment_id,
        reply_id = created.id,
        "Auto-reply posted"
    );

    Ok(Some(created))
}

/// Sanitizes `raw` into at most `MAX_REPLY_CHARS` characters.
///
/// The raw text is cut before sanitizing so no entity or tag is split. Escaping
/// can lengthen it, in which case the cut is shortened until it fits.
/// `None` when nothing visible is left.
fn fit_reply(raw: &str) -> Option<String> {
    let mut limit = MAX_REPLY_CHARS;
    loop {
        let cleaned = clean_html(&truncate_chars(raw, limit));
        let len = cleaned.chars().count();
        if len <= MAX_REPLY_CHARS {
            let cleaned = cleaned.trim();
            return (!cleaned.is_empty()).then(|| cleaned.to_string());
        }
        limit = (limit * MAX_REPLY_CHARS / len).min(limit - 1);
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].trim_end().to_string(),
        None => text.to_string(),
    }
}
