//! HTTP-backed generation sessions.
//!
//! | Provider  | Session                | Protocol                          |
//! |-----------|------------------------|-----------------------------------|
//! | deepseek  | `OpenAiCompatSession`  | `/chat/completions`, bearer auth  |
//! | dashscope | `OpenAiCompatSession`  | `/chat/completions`, bearer auth  |
//! | gemini    | `GeminiSession`        | `:generateContent`, key header    |
//!
//! Every await on the network is raced against the run's cancellation token.

pub mod factory;
pub mod gemini;
pub mod openai_compat;
pub mod sse;

use std::future::Future;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::session::{ChunkSink, SessionError};

pub use factory::ProviderSessionFactory;
pub use gemini::GeminiSession;
pub use openai_compat::OpenAiCompatSession;
pub use sse::SseDecoder;

/// Terminator sent by OpenAI-compatible streams.
const DONE_SENTINEL: &str = "[DONE]";

/// Run `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, SessionError>
where
    F: Future<Output = Result<T, SessionError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SessionError::Cancelled),
        out = fut => out,
    }
}

/// Send a request and map transport failures and non-success statuses.
pub(crate) async fn send(
    request: reqwest::RequestBuilder,
    url: &str,
) -> Result<reqwest::Response, SessionError> {
    let response = request.send().await.map_err(|e| {
        error!(error = %e, url = %url, "request to generation backend failed");
        SessionError::Request(e.to_string())
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        error!(status = %status, url = %url, "generation backend returned error status");
        return Err(SessionError::from_status(status.as_u16(), body));
    }
    Ok(response)
}

/// Consume an SSE body, forwarding the text `extract` pulls out of each event.
///
/// Events `extract` cannot interpret are skipped. Returns the concatenation of
/// every forwarded chunk.
pub(crate) async fn drain_sse<E>(
    response: reqwest::Response,
    cancel: &CancellationToken,
    on_chunk: ChunkSink<'_>,
    extract: E,
) -> Result<String, SessionError>
where
    E: Fn(&str) -> Option<String>,
{
    let mut body = Box::pin(response.bytes_stream());
    let mut decoder = SseDecoder::new();
    let mut full = String::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            next = body.next() => next,
        };
        let (events, ended) = match next {
            Some(Ok(bytes)) => (decoder.push(&bytes), false),
            Some(Err(e)) => return Err(SessionError::Stream(e.to_string())),
            None => (decoder.finish(), true),
        };

        for data in events {
            if data.trim() == DONE_SENTINEL {
                return Ok(full);
            }
            match extract(&data) {
                Some(text) if !text.is_empty() => {
                    on_chunk(&text);
                    full.push_str(&text);
                }
                Some(_) => {}
                None => debug!(event_len = data.len(), "skipping unparseable stream event"),
            }
        }

        if ended {
            return Ok(full);
        }
    }
}
