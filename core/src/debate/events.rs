//! Progress events raised while a debate runs, and the sinks that receive them.
//!
//! Sinks are called synchronously from the task producing the data, so two
//! Phase-1 tasks may call the same sink concurrently. Implementations must be
//! cheap and must not block.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use super::roles::Role;
use super::state::RunPhase;

/// Channel capacity for [`BroadcastSink`].
const CHANNEL_CAPACITY: usize = 256;

/// Everything a presentation layer can observe during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebateEvent {
    /// The role's headline became available. At most once per role.
    Headline { role: Role, text: String },

    /// A raw chunk of the role's output (raw-chunk mode only).
    Chunk { role: Role, text: String },

    /// The role's work ended, successfully or not.
    RoleDone { role: Role },

    /// Both parallel roles finished; the Judge is about to start.
    PhaseTransition { from: RunPhase, to: RunPhase },
}

impl DebateEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Headline { .. } => "headline",
            Self::Chunk { .. } => "chunk",
            Self::RoleDone { .. } => "role_done",
            Self::PhaseTransition { .. } => "phase_transition",
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Headline { role, .. } | Self::Chunk { role, .. } | Self::RoleDone { role } => {
                Some(*role)
            }
            Self::PhaseTransition { .. } => None,
        }
    }
}

/// Receiver of [`DebateEvent`]s.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &DebateEvent);
}

/// Shared sink handle.
pub type SharedSink = Arc<dyn EventSink>;

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &DebateEvent) {}
}

/// Forwards events into a broadcast channel for asynchronous subscribers.
///
/// Sending never blocks. A slow subscriber lags and loses the oldest events;
/// having no subscriber at all is not an error.
pub struct BroadcastSink {
    sender: broadcast::Sender<DebateEvent>,
}

impl BroadcastSink {
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DebateEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: &DebateEvent) {
        let event_type = event.event_type();
        match self.sender.send(event.clone()) {
            Ok(receivers) => debug!(event_type, receivers, "debate event published"),
            Err(_) => debug!(event_type, "debate event published (no receivers)"),
        }
    }
}

/// Fan one event out to every sink in order.
pub(crate) fn emit_all(sinks: &[SharedSink], event: DebateEvent) {
    for sink in sinks {
        sink.emit(&event);
    }
}
