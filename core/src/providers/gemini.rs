//! Google Gemini `generateContent` session.
//!
//! System messages are lifted into `systemInstruction`; `assistant` turns are
//! sent with the `model` role. The API key travels in the `x-goog-api-key`
//! header rather than the query string so it never shows up in logged URLs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{cancellable, drain_sse, send};
use crate::config::RoleConfig;
use crate::debate::roles::{Message, MessageRole};
use crate::session::{ChunkSink, GenerationSession, SessionError};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct GeminiSession {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl GeminiSession {
    pub fn new(api_key: impl Into<String>, role: &RoleConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: role.effective_base_url().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: role.effective_model().to_string(),
            temperature: role.temperature,
            max_tokens: role.max_tokens,
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn url(&self, stream: bool) -> String {
        if stream {
            format!(
                "{}/models/{}:streamGenerateContent?alt=sse",
                self.base_url, self.model
            )
        } else {
            format!("{}/models/{}:generateContent", self.base_url, self.model)
        }
    }

    fn request(&self, messages: &[Message], url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&self.body(messages))
    }

    fn body<'a>(&self, messages: &'a [Message]) -> GenerateRequest<'a> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();

        let contents = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| Content {
                role: match m.role {
                    MessageRole::Assistant => "model",
                    _ => "user",
                },
                parts: vec![Part { text: &m.content }],
            })
            .collect();

        GenerateRequest {
            contents,
            system_instruction: (!system.is_empty()).then(|| SystemInstruction {
                parts: vec![OwnedPart {
                    text: system.join("\n\n"),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        }
    }
}

#[async_trait]
impl GenerationSession for GeminiSession {
    fn describe(&self) -> String {
        format!("gemini/{}", self.model)
    }

    fn max_output_tokens(&self) -> Option<u32> {
        Some(self.max_tokens)
    }

    async fn complete(
        &self,
        messages: &[Message],
        cancel: &CancellationToken,
    ) -> Result<String, SessionError> {
        let url = self.url(false);
        debug!(model = %self.model, message_count = messages.len(), "gemini generate");

        cancellable(cancel, async {
            let response = send(self.request(messages, &url), &url).await?;
            let parsed: GenerateResponse = response
                .json()
                .await
                .map_err(|e| SessionError::Malformed(e.to_string()))?;
            parsed
                .text()
                .ok_or_else(|| SessionError::Malformed("no candidates in response".to_string()))
        })
        .await
    }

    async fn stream(
        &self,
        messages: &[Message],
        cancel: &CancellationToken,
        on_chunk: ChunkSink<'_>,
    ) -> Result<String, SessionError> {
        let url = self.url(true);
        debug!(model = %self.model, message_count = messages.len(), "gemini stream");

        let response = cancellable(cancel, send(self.request(messages, &url), &url)).await?;
        drain_sse(response, cancel, on_chunk, |data| {
            serde_json::from_str::<GenerateResponse>(data)
                .ok()
                .map(|r| r.text().unwrap_or_default())
        })
        .await
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<OwnedPart>,
}

#[derive(Debug, Serialize)]
struct OwnedPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        Some(
            candidate
                .content
                .as_ref()
                .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
                .unwrap_or_default(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}
