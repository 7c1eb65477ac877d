//! Run state machine and its per-run transition log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of one debate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Run created, nothing launched.
    Init,
    /// Pro and Con sessions are in flight.
    ParallelRunning,
    /// Both parallel tasks have terminated.
    ParallelJoined,
    /// Judge session is in flight.
    SequentialRunning,
    /// Result assembled.
    Done,
    /// Unrecoverable error or cancellation.
    Aborted,
}

impl RunPhase {
    /// Whether this is a terminal phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Valid transitions from this phase.
    pub fn valid_transitions(self) -> &'static [RunPhase] {
        match self {
            Self::Init => &[Self::ParallelRunning],
            Self::ParallelRunning => &[Self::ParallelJoined, Self::Aborted],
            Self::ParallelJoined => &[Self::SequentialRunning, Self::Aborted],
            Self::SequentialRunning => &[Self::Done, Self::Aborted],
            Self::Done | Self::Aborted => &[],
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::ParallelRunning => write!(f, "parallel_running"),
            Self::ParallelJoined => write!(f, "parallel_joined"),
            Self::SequentialRunning => write!(f, "sequential_running"),
            Self::Done => write!(f, "done"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// A phase transition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTransition {
    pub from: RunPhase,
    pub to: RunPhase,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Error for invalid state transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid run transition {from} -> {to}")]
pub struct TransitionError {
    pub from: RunPhase,
    pub to: RunPhase,
}

/// Tracks the phase of one run and every transition taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub phase: RunPhase,
    pub transitions: Vec<RunTransition>,
    pub started_at: DateTime<Utc>,
}

impl RunState {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            phase: RunPhase::Init,
            transitions: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Move to `to`, recording the reason.
    pub fn transition(&mut self, to: RunPhase, reason: &str) -> Result<(), TransitionError> {
        if !self.phase.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.phase,
                to,
            });
        }
        tracing::debug!(run_id = %self.run_id, from = %self.phase, to = %to, reason, "run transition");
        self.transitions.push(RunTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.phase = to;
        Ok(())
    }

    /// Abort from any non-terminal phase past `Init`. Returns the phase that was
    /// interrupted.
    pub fn abort(&mut self, reason: &str) -> Result<RunPhase, TransitionError> {
        let interrupted = self.phase;
        self.transition(RunPhase::Aborted, reason)?;
        Ok(interrupted)
    }

    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}
