//! OpenAI-compatible chat-completions session (DeepSeek, DashScope).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{cancellable, drain_sse, send};
use crate::config::{Provider, RoleConfig};
use crate::debate::roles::Message;
use crate::session::{ChunkSink, GenerationSession, SessionError};

/// Session against a `/chat/completions` endpoint with bearer auth.
#[derive(Debug, Clone)]
pub struct OpenAiCompatSession {
    client: reqwest::Client,
    provider: Provider,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl OpenAiCompatSession {
    pub fn new(provider: Provider, api_key: impl Into<String>, role: &RoleConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider,
            base_url: role.effective_base_url().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: role.effective_model().to_string(),
            temperature: role.temperature,
            max_tokens: role.max_tokens,
        }
    }

    /// Share a connection pool across sessions.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request(&self, messages: &[Message], stream: bool) -> reqwest::RequestBuilder {
        let body = ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream,
        };
        self.client
            .post(self.url())
            .bearer_auth(&self.api_key)
            .json(&body)
    }
}

#[async_trait]
impl GenerationSession for OpenAiCompatSession {
    fn describe(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }

    fn max_output_tokens(&self) -> Option<u32> {
        Some(self.max_tokens)
    }

    async fn complete(
        &self,
        messages: &[Message],
        cancel: &CancellationToken,
    ) -> Result<String, SessionError> {
        let url = self.url();
        debug!(url = %url, message_count = messages.len(), "chat completion");

        cancellable(cancel, async {
            let response = send(self.request(messages, false), &url).await?;
            let parsed: ChatResponse = response
                .json()
                .await
                .map_err(|e| SessionError::Malformed(e.to_string()))?;
            parsed
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content.unwrap_or_default())
                .ok_or_else(|| SessionError::Malformed("no choices in response".to_string()))
        })
        .await
    }

    async fn stream(
        &self,
        messages: &[Message],
        cancel: &CancellationToken,
        on_chunk: ChunkSink<'_>,
    ) -> Result<String, SessionError> {
        let url = self.url();
        debug!(url = %url, message_count = messages.len(), "streaming chat completion");

        let response = cancellable(cancel, send(self.request(messages, true), &url)).await?;
        drain_sse(response, cancel, on_chunk, |data| {
            let chunk: StreamChunk = serde_json::from_str(data).ok()?;
            Some(
                chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.delta.content)
                    .unwrap_or_default(),
            )
        })
        .await
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::roles::Role;
    use mockito::Matcher;

    fn session(base_url: String) -> OpenAiCompatSession {
        let mut role = RoleConfig::defaults_for(Role::Pro);
        role.base_url = Some(base_url);
        OpenAiCompatSession::new(Provider::DeepSeek, "sk-test", &role)
    }

    fn messages() -> Vec<Message> {
        vec![Message::system("be terse"), Message::user("topic")]
    }

    #[tokio::test]
    async fn complete_returns_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "deepseek-chat",
                "stream": false,
                "max_tokens": 4096,
                "messages": [{"role": "system", "content": "be terse"}, {"role": "user", "content": "topic"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Hello"}}]}"#)
            .create_async()
            .await;

        let text = session(format!("{}/v1", server.url()))
            .complete(&messages(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "Hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_choices_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = session(server.url())
            .complete(&messages(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Malformed(_)));
    }

    #[tokio::test]
    async fn unauthorized_status_is_classified() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("invalid key")
            .create_async()
            .await;

        let err = session(server.url())
            .complete(&messages(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Unauthorized { status: 401, ref body } if body == "invalid key"
        ));
    }

    #[tokio::test]
    async fn stream_forwards_deltas_and_stops_at_done() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            ": keep-alive\n\n",
            "data: not json\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        );
        let _mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(serde_json::json!({"stream": true})))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let mut chunks = Vec::new();
        let mut on_chunk = |c: &str| chunks.push(c.to_string());
        let full = session(server.url())
            .stream(&messages(), &CancellationToken::new(), &mut on_chunk)
            .await
            .unwrap();
        assert_eq!(full, "Hello");
        assert_eq!(chunks, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        // Unroutable address: the request must never be awaited.
        let err = session("http://127.0.0.1:9".to_string())
            .complete(&messages(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Cancelled));
    }

    #[test]
    fn describe_names_provider_and_model() {
        let s = session("http://localhost".to_string());
        assert_eq!(s.describe(), "deepseek/deepseek-chat");
        assert_eq!(s.max_output_tokens(), Some(4096));
    }
}
