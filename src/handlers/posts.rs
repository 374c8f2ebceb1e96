use std::{collections::HashMap, sync::Arc};

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::{DEFAULT_REPLY_TIME_SECS, PAGE_SIZE},
    error::AppError,
    models::{
        comment::Comment,
        page::{Page, PageParams},
        post::{CreatePostRequest, PostResponse, PostWithAuthor, UpdatePostRequest},
    },
    services::{hierarchy::build_hierarchy, moderation::Moderator, store::CommentStore},
    utils::{html::clean_html, jwt::Claims},
};

const POST_COLUMNS: &str = r#"
    p.id, p.author_id, p.title, p.text, p.created_at,
    p.reply_on_comments, p.reply_time_secs, p.is_blocked,
    u.username AS author_username
"#;

async fn fetch_post(pool: &PgPool, id: i64) -> Result<PostWithAuthor, AppError> {
    let sql = format!("SELECT {POST_COLUMNS} FROM posts p JOIN users u ON p.author_id = u.id WHERE p.id = $1");
    sqlx::query_as::<_, PostWithAuthor>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))
}

/// Loads a post and checks that the caller wrote it.
async fn fetch_own_post(pool: &PgPool, claims: &Claims, id: i64) -> Result<PostWithAuthor, AppError> {
    let post = fetch_post(pool, id).await?;
    if post.post.author_id != claims.user_id()? {
        return Err(AppError::Forbidden(
            "You do not have permission to edit this post".to_string(),
        ));
    }
    Ok(post)
}

async fn with_comments(
    store: &dyn CommentStore,
    row: PostWithAuthor,
) -> Result<PostResponse, AppError> {
    let comments = store.list_comments(row.post.id).await?;
    Ok(PostResponse::new(row, build_hierarchy(&comments)?))
}

/// List posts (Recent first), each with its comment forest.
pub async fn list_posts(
    State(pool): State<PgPool>,
    State(store): State<Arc<dyn CommentStore>>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let offset = params.offset(PAGE_SIZE)?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(&pool)
        .await?;

    let sql = format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM posts p
        JOIN users u ON p.author_id = u.id
        ORDER BY p.created_at DESC, p.id DESC
        LIMIT $1 OFFSET $2
        "#
    );
    let rows = sqlx::query_as::<_, PostWithAuthor>(&sql)
        .bind(PAGE_SIZE)
        .bind(offset)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list posts: {:?}", e);
            AppError::from(e)
        })?;

    // One query for the comments of the whole page, then one forest per post.
    let ids: Vec<i64> = rows.iter().map(|r| r.post.id).collect();
    let mut by_post: HashMap<i64, Vec<Comment>> = HashMap::new();
    for comment in store.list_comments_for_posts(&ids).await? {
        by_post.entry(comment.post_id).or_default().push(comment);
    }

    let items = rows
        .into_iter()
        .map(|row| {
            let comments = by_post.remove(&row.post.id).unwrap_or_default();
            Ok(PostResponse::new(row, build_hierarchy(&comments)?))
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(Json(Page { items, count }))
}

/// Create a new post. Title and text go through moderation first.
pub async fn create_post(
    State(pool): State<PgPool>,
    State(moderator): State<Moderator>,
    Extension(claims): Extension<Claims>,
    Json(mut payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.title = clean_html(&payload.title);
    payload.text = clean_html(&payload.text);
    payload.validate()?;
    let author_id = claims.user_id()?;

    let is_blocked = moderator
        .classify_block(&format!("{}\n{}", payload.title, payload.text))
        .await;

    let post_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO posts (author_id, title, text, reply_on_comments, reply_time_secs, is_blocked)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(author_id)
    .bind(&payload.title)
    .bind(&payload.text)
    .bind(payload.reply_on_comments.unwrap_or(false))
    .bind(payload.reply_time_secs.unwrap_or(DEFAULT_REPLY_TIME_SECS))
    .bind(is_blocked)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create post: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!(post_id, is_blocked, "Post created");

    let post = fetch_post(&pool, post_id).await?;
    Ok((StatusCode::CREATED, Json(PostResponse::new(post, Vec::new()))))
}

/// Get a single post by ID, with its comment forest.
pub async fn get_post(
    State(pool): State<PgPool>,
    State(store): State<Arc<dyn CommentStore>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = fetch_post(&pool, id).await?;
    Ok(Json(with_comments(store.as_ref(), post).await?))
}

/// Edit a post. Requires: Login + Author.
pub async fn update_post(
    State(pool): State<PgPool>,
    State(store): State<Arc<dyn CommentStore>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    fetch_own_post(&pool, &claims, id).await?;
    payload.title = payload.title.as_deref().map(clean_html);
    payload.text = payload.text.as_deref().map(clean_html);
    payload.validate()?;

    sqlx::query(
        r#"
        UPDATE posts SET
            title = COALESCE($2, title),
            text = COALESCE($3, text),
            reply_time_secs = COALESCE($4, reply_time_secs)
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(payload.title)
    .bind(payload.text)
    .bind(payload.reply_time_secs)
    .execute(&pool)
    .await?;

    let post = fetch_post(&pool, id).await?;
    Ok(Json(with_comments(store.as_ref(), post).await?))
}

/// Turn automatic replies on or off. Requires: Login + Author.
pub async fn toggle_auto_reply(
    State(pool): State<PgPool>,
    State(store): State<Arc<dyn CommentStore>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_own_post(&pool, &claims, id).await?;

    sqlx::query("UPDATE posts SET reply_on_comments = NOT reply_on_comments WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    let post = fetch_post(&pool, id).await?;
    tracing::info!(post_id = id, enabled = post.post.reply_on_comments, "Auto-reply toggled");
    Ok(Json(with_comments(store.as_ref(), post).await?))
}

/// Delete a post and, by cascade, its comments.
/// Requires: Login + (Author OR Staff).
pub async fn delete_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = fetch_post(&pool, id).await?;

    if !(claims.is_staff() || post.post.author_id == claims.user_id()?) {
        return Err(AppError::Forbidden(
            "You do not have permission to delete this post".to_string(),
        ));
    }

    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete post: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json(json!({ "detail": "Post deleted successfully" })))
}
