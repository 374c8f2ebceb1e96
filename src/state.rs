use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{
    config::Config,
    services::{
        gemini::GeminiClient,
        moderation::{DisabledGenerator, Moderator, TextGenerator},
        queue::{PgTaskQueue, TaskQueue},
        store::{CommentStore, PgCommentStore},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub store: Arc<dyn CommentStore>,
    pub moderator: Moderator,
    pub queue: Arc<dyn TaskQueue>,
}

impl AppState {
    /// Wires the Postgres store and queue plus the configured oracle.
    pub fn new(pool: PgPool, config: Config) -> Self {
        let generator: Arc<dyn TextGenerator> = match &config.gemini_api_key {
            Some(key) => Arc::new(GeminiClient::new(key.clone(), config.gemini_model.clone())),
            None => {
                tracing::warn!("GEMINI_API_KEY not set, moderation and auto-replies are disabled");
                Arc::new(DisabledGenerator)
            }
        };

        Self {
            store: Arc::new(PgCommentStore::new(pool.clone())),
            queue: Arc::new(PgTaskQueue::new(pool.clone())),
            moderator: Moderator::new(generator, config.oracle_timeout),
            pool,
            config,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn CommentStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Moderator {
    fn from_ref(state: &AppState) -> Self {
        state.moderator.clone()
    }
}
