//! Debate orchestration core.
//!
//! | Module         | Contents                                            |
//! |----------------|-----------------------------------------------------|
//! | `roles`        | `Role`, chat `Message`                              |
//! | `parser`       | `SectionStreamParser` (headline / full-body split)  |
//! | `state`        | run phase state machine                             |
//! | `events`       | `DebateEvent`, `EventSink`, `BroadcastSink`         |
//! | `result`       | `DebateResult`, `RoleOutput`                        |
//! | `errors`       | `DebateError`, `ErrorClass`                         |
//! | `orchestrator` | `PhaseOrchestrator`                                 |

pub mod errors;
pub mod events;
pub mod orchestrator;
pub mod parser;
pub mod result;
pub mod roles;
pub mod state;

pub use errors::{DebateError, ErrorClass};
pub use events::{BroadcastSink, DebateEvent, EventSink, NoopSink, SharedSink};
pub use orchestrator::PhaseOrchestrator;
pub use parser::{ParserState, SectionLayout, SectionStreamParser, Sections};
pub use result::{DebateResult, RoleOutput};
pub use roles::{Message, MessageRole, Role};
pub use state::{RunPhase, RunState, RunTransition, TransitionError};
