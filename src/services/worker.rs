//! Background worker draining the delayed-task queue.

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::services::{
    auto_reply,
    moderation::Moderator,
    queue::{Task, TaskQueue},
    store::CommentStore,
};

const TRACING_TARGET: &str = "social_service::worker";

/// Runs one task. Failures are logged and dropped, never retried.
pub async fn run_task(store: &dyn CommentStore, moderator: &Moderator, task: Task) {
    match task {
        Task::AutoReply { comment_id } => {
            if let Err(err) = auto_reply::execute(store, moderator, comment_id).await {
                tracing::error!(
                    target: TRACING_TARGET,
                    comment_id,
                    error = %err,
                    "Auto-reply task failed"
                );
            }
        }
    }
}

pub struct TaskWorker {
    queue: Arc<dyn TaskQueue>,
    store: Arc<dyn CommentStore>,
    moderator: Moderator,
    poll_interval: Duration,
}

impl TaskWorker {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        store: Arc<dyn CommentStore>,
        moderator: Moderator,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            store,
            moderator,
            poll_interval,
        }
    }

    /// Polls for due tasks until `cancel` fires.
    ///
    /// Only the idle wait races cancellation. A claimed task is already gone
    /// from the queue, so it always runs to completion.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(target: TRACING_TARGET, "Starting task worker");

        while !cancel.is_cancelled() {
            self.drain(&cancel).await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        tracing::info!(target: TRACING_TARGET, "Task worker stopped");
    }

    /// Runs every task that is currently due, stopping between tasks once
    /// `cancel` fires.
    async fn drain(&self, cancel: &CancellationToken) {
        while !cancel.is_cancelled() {
            match self.queue.claim_due().await {
                Ok(Some(claimed)) => {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        task_id = claimed.id,
                        task = ?claimed.task,
                        "Running task"
                    );
                    run_task(self.store.as_ref(), &self.moderator, claimed.task).await;
                }
                Ok(None) => return,
                Err(err) => {
                    tracing::error!(
                        target: TRACING_TARGET,
                        error = %err,
                        "Failed to claim task"
                    );
                    return;
                }
            }
        }
    }
}
