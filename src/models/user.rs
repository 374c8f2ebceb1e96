// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// User role: 'user' or 'admin'. Admins are staff.
    pub role: String,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Public view of a user embedded in posts and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub username: String,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 3,
        max = 150,
        message = "Username length must be between 3 and 150 characters."
    ))]
    pub username: String,
    #[validate(
        length(
            min = 8,
            max = 128,
            message = "Password length must be between 8 and 128 characters."
        ),
        custom(function = validate_not_numeric)
    )]
    pub password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for changing the current user's password.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    #[validate(length(min = 1, max = 128))]
    pub old_password: String,
    #[validate(
        length(
            min = 8,
            max = 128,
            message = "Password length must be between 8 and 128 characters."
        ),
        custom(function = validate_not_numeric)
    )]
    pub new_password: String,
}

/// Rejects passwords made only of digits.
fn validate_not_numeric(password: &str) -> Result<(), ValidationError> {
    if password.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("password_numeric");
        err.message = Some("This password is entirely numeric.".into());
        return Err(err);
    }
    Ok(())
}

impl CreateUserRequest {
    /// Passwords equal to the username (ignoring ASCII case) are refused.
    pub fn password_matches_username(&self) -> bool {
        self.password.eq_ignore_ascii_case(&self.username)
    }
}
