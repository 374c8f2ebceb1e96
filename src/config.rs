// src/config.rs

use std::env;
use std::time::Duration;
use dotenvy::dotenv;

/// Number of root comments (or posts) per page.
pub const PAGE_SIZE: i64 = 10;

/// Number of days per page of the daily comment breakdown.
pub const BREAKDOWN_PAGE_SIZE: i64 = 10;

/// Default delay before an automatic reply fires (5 minutes).
pub const DEFAULT_REPLY_TIME_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,

    /// Without a key the oracle is disabled and every call fails open.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub oracle_timeout: Duration,

    pub worker_poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let oracle_timeout_secs = env::var("ORACLE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let worker_poll_interval_ms = env::var("WORKER_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1000);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            oracle_timeout: Duration::from_secs(oracle_timeout_secs),
            worker_poll_interval: Duration::from_millis(worker_poll_interval_ms),
        }
    }
}
