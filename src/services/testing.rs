//! In-memory fakes for the comment pipeline's seams.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    config::DEFAULT_REPLY_TIME_SECS,
    error::AppError,
    models::{
        comment::{Comment, DailyCount, NewComment},
        post::Post,
    },
    services::{
        moderation::{AnswerFormat, Generation, Moderator, OracleError, TextGenerator},
        queue::{ClaimedTask, Task, TaskQueue},
        store::CommentStore,
    },
};

#[derive(Default)]
struct Tables {
    users: HashMap<i64, String>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    next_comment_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(id: i64, author_id: i64, reply_on_comments: bool) -> Post {
        Post {
            id,
            author_id,
            title: format!("Post {id}"),
            text: format!("Body of post number {id}"),
            created_at: Utc::now(),
            reply_on_comments,
            reply_time_secs: DEFAULT_REPLY_TIME_SECS,
            is_blocked: false,
        }
    }

    pub fn add_user(&self, id: i64, username: &str) {
        self.tables.lock().unwrap().users.insert(id, username.to_string());
    }

    pub fn add_post(&self, post: Post) {
        self.tables.lock().unwrap().posts.push(post);
    }

    pub fn seed_comment(&self, post_id: i64, author_id: i64, text: &str, parent_id: Option<i64>) -> Comment {
        self.seed_comment_at(post_id, author_id, text, parent_id, false, Utc::now())
    }

    pub fn seed_comment_at(
        &self,
        post_id: i64,
        author_id: i64,
        text: &str,
        parent_id: Option<i64>,
        is_blocked: bool,
        created_at: DateTime<Utc>,
    ) -> Comment {
        let mut tables = self.tables.lock().unwrap();
        tables.next_comment_id += 1;
        let comment = Comment {
            id: tables.next_comment_id,
            post_id,
            author_id,
            author_username: tables.users.get(&author_id).cloned().unwrap_or_default(),
            text: text.to_string(),
            parent_id,
            is_blocked,
            created_at,
        };
        tables.comments.push(comment.clone());
        comment
    }

    pub fn comment_count(&self) -> usize {
        self.tables.lock().unwrap().comments.len()
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.tables.lock().unwrap().comments.clone()
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn find_post(&self, post_id: i64) -> Result<Option<Post>, AppError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.posts.iter().find(|p| p.id == post_id).cloned())
    }

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>, AppError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        self.list_comments_for_posts(&[post_id]).await
    }

    async fn list_comments_for_posts(&self, post_ids: &[i64]) -> Result<Vec<Comment>, AppError> {
        let tables = self.tables.lock().unwrap();
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| post_ids.contains(&c.post_id))
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(comments)
    }

    async fn insert_comment(&self, new: NewComment) -> Result<Comment, AppError> {
        if let Some(parent_id) = new.parent_id {
            if self.find_comment(parent_id).await?.is_none() {
                return Err(AppError::NotFound("Parent comment not found".to_string()));
            }
        }
        Ok(self.seed_comment_at(
            new.post_id,
            new.author_id,
            &new.text,
            new.parent_id,
            new.is_blocked,
            Utc::now(),
        ))
    }

    async fn update_comment_text(&self, id: i64, text: &str) -> Result<Option<Comment>, AppError> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables.comments.iter_mut().find(|c| c.id == id).map(|c| {
            c.text = text.to_string();
            c.clone()
        }))
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.comments.iter().any(|c| c.id == id) {
            return Ok(false);
        }
        // Cascade through replies.
        let mut doomed = vec![id];
        let mut i = 0;
        while i < doomed.len() {
            let parent = doomed[i];
            doomed.extend(
                tables
                    .comments
                    .iter()
                    .filter(|c| c.parent_id == Some(parent))
                    .map(|c| c.id),
            );
            i += 1;
        }
        tables.comments.retain(|c| !doomed.contains(&c.id));
        Ok(true)
    }

    async fn has_reply_from(&self, parent_id: i64, author_id: i64) -> Result<bool, AppError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .comments
            .iter()
            .any(|c| c.parent_id == Some(parent_id) && c.author_id == author_id))
    }

    async fn daily_counts(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyCount>, AppError> {
        let tables = self.tables.lock().unwrap();
        let mut by_day: HashMap<NaiveDate, DailyCount> = HashMap::new();
        for comment in &tables.comments {
            let day = comment.created_at.date_naive();
            if day < from || day > to {
                continue;
            }
            let entry = by_day.entry(day).or_insert(DailyCount {
                day,
                created: 0,
                blocked: 0,
            });
            entry.created += 1;
            if comment.is_blocked {
                entry.blocked += 1;
            }
        }
        let mut rows: Vec<DailyCount> = by_day.into_values().collect();
        rows.sort_by_key(|r| r.day);
        Ok(rows)
    }
}

/// Records every scheduled task instead of persisting it. Claims hand tasks
/// out in scheduling order and ignore their delay.
#[derive(Default)]
pub struct RecordingQueue {
    pub scheduled: Mutex<Vec<(Task, Duration)>>,
}

#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn schedule(&self, task: Task, delay: Duration) -> Result<(), AppError> {
        self.scheduled.lock().unwrap().push((task, delay));
        Ok(())
    }

    async fn claim_due(&self) -> Result<Option<ClaimedTask>, AppError> {
        let mut scheduled = self.scheduled.lock().unwrap();
        if scheduled.is_empty() {
            return Ok(None);
        }
        let (task, _) = scheduled.remove(0);
        Ok(Some(ClaimedTask { id: 0, task }))
    }
}

/// Answers classification with `verdict` and reply generation with `reply`.
struct FixedGenerator {
    verdict: &'static str,
    reply: &'static str,
    delay: Duration,
}

#[async_trait]
impl TextGenerator for FixedGenerator {
    async fn generate(&self, _prompt: &str, format: AnswerFormat) -> Result<Generation, OracleError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(Generation::Text(match format {
            AnswerFormat::Boolean => self.verdict.to_string(),
            AnswerFormat::Text => self.reply.to_string(),
        }))
    }
}

struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str, _format: AnswerFormat) -> Result<Generation, OracleError> {
        Err(OracleError::Request("unreachable".to_string()))
    }
}

fn moderator(generator: Arc<dyn TextGenerator>) -> Moderator {
    Moderator::new(generator, Duration::from_secs(1))
}

/// Never blocks and always replies with `reply`.
pub fn moderator_replying(reply: &'static str) -> Moderator {
    moderator_replying_after(reply, Duration::ZERO)
}

/// Like [`moderator_replying`], but every call takes `delay`.
pub fn moderator_replying_after(reply: &'static str, delay: Duration) -> Moderator {
    moderator(Arc::new(FixedGenerator {
        verdict: "false",
        reply,
        delay,
    }))
}

/// Blocks everything.
pub fn moderator_blocking() -> Moderator {
    moderator(Arc::new(FixedGenerator {
        verdict: "true",
        reply: "",
        delay: Duration::ZERO,
    }))
}

/// Every oracle call fails.
pub fn moderator_failing() -> Moderator {
    moderator(Arc::new(FailingGenerator))
}
