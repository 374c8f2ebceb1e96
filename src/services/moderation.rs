//! Moderation oracle: content classification and reply generation backed by a
//! text-generation provider. Every provider failure is absorbed here.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

const TRACING_TARGET: &str = "social_service::moderation";

const BLOCK_INSTRUCTION: &str = "Answer ONLY True if there are any violations in the text, \
the presence of foul language, mentioning of bad words, etc, or False if not: \
Please analyze the following text for violations:\n";

const REPLY_INSTRUCTION: &str = "You are the author of the post and not an AI, make a RESPONSE \
to the USER who commented on your post. Determine your tone based on the style of the comment \
and its text.\nPost text:\n";

/// Shape of the answer requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerFormat {
    /// Free text.
    Text,
    /// A JSON boolean, `true` or `false`.
    Boolean,
}

/// What the provider produced for a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Text(String),
    /// The provider's own safety filter refused to answer.
    SafetyBlocked,
}

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle is not configured")]
    Disabled,
    #[error("oracle request failed: {0}")]
    Request(String),
    #[error("oracle returned status {0}")]
    Status(u16),
    #[error("oracle response had no usable candidate")]
    MissingCandidate,
}

/// A text-generation backend (e.g. Gemini).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, format: AnswerFormat) -> Result<Generation, OracleError>;
}

/// Generator used when no provider is configured. Every call fails, so the
/// moderator falls back to its safe defaults.
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn generate(&self, _prompt: &str, _format: AnswerFormat) -> Result<Generation, OracleError> {
        Err(OracleError::Disabled)
    }
}

/// Fail-open adapter over a [`TextGenerator`].
#[derive(Clone)]
pub struct Moderator {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl Moderator {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Decides whether `text` should be blocked.
    ///
    /// Returns `false` on any failure or timeout. A safety refusal from the
    /// provider counts as a violation.
    pub async fn classify_block(&self, text: &str) -> bool {
        let prompt = format!("{BLOCK_INSTRUCTION}{text}");
        match self.call(&prompt, AnswerFormat::Boolean).await {
            Some(Generation::SafetyBlocked) => true,
            Some(Generation::Text(answer)) => answer.trim().eq_ignore_ascii_case("true"),
            None => false,
        }
    }

    /// Writes a reply to `comment_text` in the voice of the post's author.
    ///
    /// Whitespace runs are collapsed to single spaces. Returns `None` on any
    /// failure, on a safety refusal and on an empty answer.
    pub async fn generate_reply(&self, post_text: &str, comment_text: &str) -> Option<String> {
        let prompt = format!("{REPLY_INSTRUCTION}{post_text}\nUser comment:\n{comment_text}");
        match self.call(&prompt, AnswerFormat::Text).await? {
            Generation::Text(answer) => {
                let reply = collapse_whitespace(&answer);
                (!reply.is_empty()).then_some(reply)
            }
            Generation::SafetyBlocked => {
                tracing::warn!(target: TRACING_TARGET, "Reply generation refused by safety filter");
                None
            }
        }
    }

    async fn call(&self, prompt: &str, format: AnswerFormat) -> Option<Generation> {
        match tokio::time::timeout(self.timeout, self.generator.generate(prompt, format)).await {
            Ok(Ok(generation)) => Some(generation),
            Ok(Err(OracleError::Disabled)) => {
                tracing::debug!(target: TRACING_TARGET, "Oracle disabled, using default");
                None
            }
            Ok(Err(err)) => {
                tracing::warn!(target: TRACING_TARGET, error = %err, "Oracle call failed");
                None
            }
            Err(_) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Oracle call timed out"
                );
                None
            }
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Replays a fixed outcome and records the prompts it saw.
    struct Scripted {
        outcome: fn() -> Result<Generation, OracleError>,
        delay: Duration,
        prompts: Mutex<Vec<(String, AnswerFormat)>>,
    }

    impl Scripted {
        fn new(outcome: fn() -> Result<Generation, OracleError>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                delay: Duration::ZERO,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, prompt: &str, format: AnswerFormat) -> Result<Generation, OracleError> {
            self.prompts.lock().unwrap().push((prompt.to_string(), format));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            (self.outcome)()
        }
    }

    fn moderator(generator: Arc<Scripted>) -> Moderator {
        Moderator::new(generator, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn true_answer_blocks_regardless_of_case_and_padding() {
        let generator = Scripted::new(|| Ok(Generation::Text("  TRUE \n".into())));
        assert!(moderator(generator.clone()).classify_block("some rude words").await);

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].0.ends_with("some rude words"));
        assert_eq!(prompts[0].1, AnswerFormat::Boolean);
    }

    #[tokio::test]
    async fn false_or_garbage_answer_does_not_block() {
        let no = Scripted::new(|| Ok(Generation::Text("false".into())));
        assert!(!moderator(no).classify_block("a kind comment").await);

        let garbage = Scripted::new(|| Ok(Generation::Text("maybe?".into())));
        assert!(!moderator(garbage).classify_block("a kind comment").await);
    }

    #[tokio::test]
    async fn safety_refusal_blocks() {
        let generator = Scripted::new(|| Ok(Generation::SafetyBlocked));
        assert!(moderator(generator).classify_block("something awful").await);
    }

    #[tokio::test]
    async fn failures_fail_open() {
        let failing = Scripted::new(|| Err(OracleError::Request("connection reset".into())));
        assert!(!moderator(failing).classify_block("anything at all").await);

        let empty = Scripted::new(|| Err(OracleError::MissingCandidate));
        assert!(!moderator(empty).classify_block("anything at all").await);

        let disabled = Moderator::new(Arc::new(DisabledGenerator), Duration::from_secs(1));
        assert!(!disabled.classify_block("anything at all").await);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_oracle_times_out_to_not_blocked() {
        let generator = Arc::new(Scripted {
            outcome: || Ok(Generation::Text("true".into())),
            delay: Duration::from_secs(60),
            prompts: Mutex::new(Vec::new()),
        });
        let moderator = Moderator::new(generator, Duration::from_secs(2));
        assert!(!moderator.classify_block("slow to judge").await);
    }

    #[tokio::test]
    async fn reply_whitespace_is_normalized() {
        let generator = Scripted::new(|| Ok(Generation::Text("  Thanks\n\nfor   reading!\t".into())));
        let reply = moderator(generator.clone())
            .generate_reply("My post text", "Great post!")
            .await;
        assert_eq!(reply.as_deref(), Some("Thanks for reading!"));

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].0.contains("My post text\nUser comment:\nGreat post!"));
        assert_eq!(prompts[0].1, AnswerFormat::Text);
    }

    #[tokio::test]
    async fn reply_is_none_on_failure_refusal_or_blank() {
        let failing = Scripted::new(|| Err(OracleError::Status(429)));
        assert_eq!(moderator(failing).generate_reply("post", "comment").await, None);

        let refused = Scripted::new(|| Ok(Generation::SafetyBlocked));
        assert_eq!(moderator(refused).generate_reply("post", "comment").await, None);

        let blank = Scripted::new(|| Ok(Generation::Text(" \n ".into())));
        assert_eq!(moderator(blank).generate_reply("post", "comment").await, None);
    }
}
