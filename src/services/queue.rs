//! Durable delayed-task queue stored in the `scheduled_tasks` table.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, types::Json};

use crate::error::AppError;

const TRACING_TARGET: &str = "social_service::queue";

/// Deferred work. Payloads carry ids only, so a task always sees current data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    AutoReply { comment_id: i64 },
}

#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueues `task` to become runnable once `delay` has elapsed.
    async fn schedule(&self, task: Task, delay: Duration) -> Result<(), AppError>;

    /// Removes and returns the oldest due task, if any.
    async fn claim_due(&self) -> Result<Option<ClaimedTask>, AppError>;
}

/// A task taken off the queue.
#[derive(Debug)]
pub struct ClaimedTask {
    pub id: i64,
    pub task: Task,
}

#[derive(Clone)]
pub struct PgTaskQueue {
    pool: PgPool,
}

impl PgTaskQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskQueue for PgTaskQueue {
    async fn schedule(&self, task: Task, delay: Duration) -> Result<(), AppError> {
        let delay_ms = i64::try_from(delay.as_millis())
            .map_err(|_| AppError::BadRequest("Task delay is too large".to_string()))?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO scheduled_tasks (payload, run_at)
            VALUES ($1, NOW() + $2 * INTERVAL '1 millisecond')
            RETURNING id
            "#,
        )
        .bind(Json(&task))
        .bind(delay_ms)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(
            target: TRACING_TARGET,
            task_id = id,
            ?task,
            delay_ms,
            "Task scheduled"
        );

        Ok(())
    }

    /// Claiming deletes the row, so a task is handed out at most once even with
    /// several workers polling. Rows whose payload no longer parses are dropped.
    async fn claim_due(&self) -> Result<Option<ClaimedTask>, AppError> {
        let row: Option<(i64, serde_json::Value)> = sqlx::query_as(
            r#"
            DELETE FROM scheduled_tasks
            WHERE id = (
                SELECT id FROM scheduled_tasks
                WHERE run_at <= NOW()
                ORDER BY run_at, id
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING id, payload
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, payload)) = row else {
            return Ok(None);
        };

        match serde_json::from_value::<Task>(payload) {
            Ok(task) => Ok(Some(ClaimedTask { id, task })),
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    task_id = id,
                    error = %err,
                    "Dropping task with unreadable payload"
                );
                Ok(None)
            }
        }
    }
}
