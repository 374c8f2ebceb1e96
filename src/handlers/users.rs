use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{UpdatePasswordRequest, User},
    utils::{
        jwt::Claims,
        password::{hash_password, verify_password},
    },
};

async fn fetch_user(pool: &PgPool, id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, password, role, created_at FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))
}

/// Get the current user.
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = fetch_user(&pool, claims.user_id()?).await?;
    Ok(Json(user))
}

/// Change the current user's password.
/// The old password must match and differ from the new one.
pub async fn update_password(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = fetch_user(&pool, claims.user_id()?).await?;

    if payload.new_password == payload.old_password {
        return Err(AppError::BadRequest(
            "New password must be different from current password".to_string(),
        ));
    }

    if !verify_password(&payload.old_password, &user.password)? {
        return Err(AppError::BadRequest("Current password is incorrect.".to_string()));
    }

    payload.validate()?;

    let hashed = hash_password(&payload.new_password)?;
    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(hashed)
        .bind(user.id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "detail": "Password has been successfully updated" })))
}
