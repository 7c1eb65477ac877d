//! Debate error taxonomy.
//!
//! Every failure a run can surface is classified so callers never have to
//! string-match:
//!
//! | Class           | Raised by                          | Fatal to the run |
//! |-----------------|------------------------------------|------------------|
//! | Configuration   | session construction (no key, ...) | yes              |
//! | Transport       | a session mid-request / mid-stream | yes              |
//! | Cancellation    | the shared run token               | yes              |
//! | Persistence     | the report writer                  | no               |
//! | Internal        | panicked task, state machine bug   | yes              |

use thiserror::Error;

use super::roles::Role;
use super::state::{RunPhase, TransitionError};
use crate::session::SessionError;

/// Coarse classification shared by all error types in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Configuration,
    Transport,
    Cancellation,
    Persistence,
    Internal,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Transport => write!(f, "transport"),
            Self::Cancellation => write!(f, "cancellation"),
            Self::Persistence => write!(f, "persistence"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Terminal error of one debate run. Mutually exclusive with a result.
#[derive(Debug, Error)]
pub enum DebateError {
    /// The role's session could not be built (missing key, bad provider).
    #[error("{role}: configuration error: {source}")]
    Configuration {
        role: Role,
        #[source]
        source: SessionError,
    },

    /// The role's session failed while generating.
    #[error("{role}: {source}")]
    Session {
        role: Role,
        #[source]
        source: SessionError,
    },

    /// The run token fired.
    #[error("debate cancelled during {phase}")]
    Cancelled { phase: RunPhase },

    /// A role task panicked or was aborted by the runtime.
    #[error("{role} task failed: {message}")]
    TaskFailed { role: Role, message: String },

    /// Orchestrator attempted an invalid phase transition.
    #[error("internal state error: {0}")]
    State(#[from] TransitionError),
}

impl DebateError {
    /// Wrap a session error with the role that produced it.
    pub fn from_session(role: Role, phase: RunPhase, source: SessionError) -> Self {
        match source.class() {
            ErrorClass::Configuration => Self::Configuration { role, source },
            ErrorClass::Cancellation => Self::Cancelled { phase },
            _ => Self::Session { role, source },
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Configuration { .. } => ErrorClass::Configuration,
            Self::Session { source, .. } => source.class(),
            Self::Cancelled { .. } => ErrorClass::Cancellation,
            Self::TaskFailed { .. } | Self::State(_) => ErrorClass::Internal,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.class() == ErrorClass::Cancellation
    }

    /// Role the error is attributed to, if any.
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Configuration { role, .. }
            | Self::Session { role, .. }
            | Self::TaskFailed { role, .. } => Some(*role),
            Self::Cancelled { .. } | Self::State(_) => None,
        }
    }
}
