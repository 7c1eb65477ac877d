//! Generation session contract.
//!
//! A session turns one role's message list into text, either in one piece or
//! as a stream of chunks. The orchestrator depends only on these traits; the
//! provider implementations live in [`crate::providers`].

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::debate::errors::ErrorClass;
use crate::debate::roles::{Message, Role};

/// Terminal error reported by a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The provider needs an API key that was not supplied.
    #[error("missing API key for {provider} (set {hint})")]
    MissingCredential { provider: String, hint: String },

    /// The role's backend configuration cannot be used.
    #[error("invalid backend configuration: {0}")]
    Configuration(String),

    /// Request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Request(String),

    /// Backend rejected the credentials.
    #[error("authentication failed (status {status}): {body}")]
    Unauthorized { status: u16, body: String },

    /// Any other non-success status.
    #[error("API error (status {status}): {body}")]
    Status { status: u16, body: String },

    /// Body did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Connection broke after streaming started.
    #[error("stream error: {0}")]
    Stream(String),

    /// The run token fired.
    #[error("cancelled")]
    Cancelled,
}

impl SessionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MissingCredential { .. } | Self::Configuration(_) => ErrorClass::Configuration,
            Self::Cancelled => ErrorClass::Cancellation,
            Self::Request(_)
            | Self::Unauthorized { .. }
            | Self::Status { .. }
            | Self::Malformed(_)
            | Self::Stream(_) => ErrorClass::Transport,
        }
    }

    /// Map a non-success HTTP status and body to the matching variant.
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 401 || status == 403 {
            Self::Unauthorized { status, body }
        } else {
            Self::Status { status, body }
        }
    }
}

/// Per-chunk callback handed to [`GenerationSession::stream`].
pub type ChunkSink<'a> = &'a mut (dyn FnMut(&str) + Send);

/// One backend conversation for one role.
///
/// Implementations must stop producing output promptly once `cancel` fires and
/// report [`SessionError::Cancelled`]. Chunks already delivered are never
/// retracted.
#[async_trait]
pub trait GenerationSession: Send + Sync {
    /// Backend label for logs (e.g. `"deepseek/deepseek-chat"`).
    fn describe(&self) -> String;

    /// Configured output cap, used to bound the section parser buffer.
    fn max_output_tokens(&self) -> Option<u32> {
        None
    }

    /// Blocking form: the complete output text.
    async fn complete(
        &self,
        messages: &[Message],
        cancel: &CancellationToken,
    ) -> Result<String, SessionError>;

    /// Streaming form: `on_chunk` is called in arrival order; the concatenated
    /// text is returned when the stream ends.
    async fn stream(
        &self,
        messages: &[Message],
        cancel: &CancellationToken,
        on_chunk: ChunkSink<'_>,
    ) -> Result<String, SessionError>;
}

/// Resolves the session for a role. Construction failures (missing key,
/// unknown backend) are configuration errors raised before any network call.
pub trait SessionFactory: Send + Sync {
    fn create(&self, role: Role) -> Result<Arc<dyn GenerationSession>, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_statuses_classify_as_unauthorized() {
        assert!(matches!(
            SessionError::from_status(401, String::new()),
            SessionError::Unauthorized { status: 401, .. }
        ));
        assert!(matches!(
            SessionError::from_status(429, String::new()),
            SessionError::Status { status: 429, .. }
        ));
    }

    #[test]
    fn classes() {
        assert_eq!(SessionError::Cancelled.class(), ErrorClass::Cancellation);
        assert_eq!(
            SessionError::Configuration("x".into()).class(),
            ErrorClass::Configuration
        );
        assert_eq!(SessionError::Stream("eof".into()).class(), ErrorClass::Transport);
    }
}
