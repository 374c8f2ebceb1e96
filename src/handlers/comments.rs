use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    config::PAGE_SIZE,
    error::AppError,
    models::{
        comment::{CreateCommentRequest, DateRangeParams, UpdateCommentRequest},
        page::{Page, PageParams},
    },
    services::{analytics, comments, store::CommentStore},
    state::AppState,
    utils::jwt::Claims,
};

/// List the comment forest of a post, paginated by root comment.
pub async fn list_comments(
    State(store): State<Arc<dyn CommentStore>>,
    Path(post_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let forest = comments::comment_forest(store.as_ref(), post_id).await?;
    Ok(Json(Page::paginate(forest, params.page, PAGE_SIZE)?))
}

/// Create a new comment (or a reply, with `parent_id`).
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let comment = comments::create_comment(
        state.store.as_ref(),
        &state.moderator,
        state.queue.as_ref(),
        &claims,
        post_id,
        payload,
    )
    .await?;

    tracing::info!(
        comment_id = comment.id,
        post_id,
        is_blocked = comment.is_blocked,
        "Comment created"
    );

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Edit a comment's text. Requires: Login + Author.
pub async fn edit_comment(
    State(store): State<Arc<dyn CommentStore>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let comment = comments::edit_comment(store.as_ref(), &claims, id, payload).await?;
    Ok(Json(comment))
}

/// Delete a comment and its replies. Requires: Login + (Author OR Staff).
pub async fn delete_comment(
    State(store): State<Arc<dyn CommentStore>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    comments::delete_comment(store.as_ref(), &claims, id).await?;
    Ok(Json(json!({ "detail": "Comment has been successfully deleted" })))
}

/// Per-day created/blocked comment counts for an inclusive date range.
pub async fn daily_breakdown(
    State(store): State<Arc<dyn CommentStore>>,
    params: Result<Query<DateRangeParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params.map_err(|e| AppError::ValidationError(e.body_text()))?;

    let page =
        analytics::daily_breakdown(store.as_ref(), params.date_from, params.date_to, params.page)
            .await?;
    Ok(Json(page))
}
