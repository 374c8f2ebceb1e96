//! Google Gemini `generateContent` client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::moderation::{AnswerFormat, Generation, OracleError, TextGenerator};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", API_BASE, self.model)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

impl GenerateRequest {
    fn new(prompt: &str, format: AnswerFormat) -> Self {
        let generation_config = match format {
            AnswerFormat::Boolean => Some(json!({
                "responseMimeType": "application/json",
                "responseSchema": { "type": "BOOLEAN" },
            })),
            AnswerFormat::Text => None,
        };
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config,
        }
    }
}

/// Reads the first candidate. A `SAFETY` finish reason wins over any text.
fn interpret(response: GenerateResponse) -> Result<Generation, OracleError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(OracleError::MissingCandidate)?;

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Ok(Generation::SafetyBlocked);
    }

    candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .map(|part| Generation::Text(part.text.trim().to_string()))
        .ok_or(OracleError::MissingCandidate)
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, format: AnswerFormat) -> Result<Generation, OracleError> {
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateRequest::new(prompt, format))
            .send()
            .await
            .map_err(|e| OracleError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Status(status.as_u16()));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Request(e.to_string()))?;

        interpret(body)
    }
}
