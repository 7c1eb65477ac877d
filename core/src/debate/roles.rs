//! Debate participants and the chat messages handed to their sessions.

use serde::{Deserialize, Serialize};

/// One of the three fixed participants in a debate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Affirmative side, runs in the parallel phase.
    Pro,
    /// Negative side, runs in the parallel phase.
    Con,
    /// Adjudicator, runs alone after both sides have finished.
    Judge,
}

impl Role {
    /// All roles in canonical order (Pro, Con, Judge).
    pub const ALL: [Role; 3] = [Role::Pro, Role::Con, Role::Judge];

    /// Roles that run concurrently in the first phase, in error-precedence order.
    pub const PARALLEL: [Role; 2] = [Role::Pro, Role::Con];

    /// Human-facing title used in reports and terminal headers.
    pub fn title(self) -> &'static str {
        match self {
            Self::Pro => "Affirmative",
            Self::Con => "Negative",
            Self::Judge => "Adjudicator",
        }
    }

    pub fn is_parallel(self) -> bool {
        !matches!(self, Self::Judge)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pro => write!(f, "pro"),
            Self::Con => write!(f, "con"),
            Self::Judge => write!(f, "judge"),
        }
    }
}

/// Speaker tag of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single chat message. Built once by the prompt builder and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}
