//! Dialecta core library
//!
//! Runs a fixed three-role debate over streaming text-generation backends:
//! Pro and Con argue the same material concurrently, then a Judge weighs both
//! full arguments and delivers a verdict.
//!
//! # Modules
//!
//! | Module      | Contents                                                |
//! |-------------|---------------------------------------------------------|
//! | `debate`    | parser, run state machine, events, orchestrator         |
//! | `session`   | `GenerationSession` / `SessionFactory` contracts        |
//! | `providers` | DeepSeek / DashScope / Gemini sessions, SSE decoding    |
//! | `prompts`   | `PromptBuilder` and the built-in prompts                |
//! | `report`    | `ReportWriter` and the Markdown report file writer      |
//! | `config`    | per-role backend config, TOML loading, credentials      |
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use dialecta_core::{
//!     Credentials, DialectaConfig, PhaseOrchestrator, ProviderSessionFactory,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), dialecta_core::DebateError> {
//! let config = DialectaConfig::default();
//! let credentials = Credentials::from_lookup(|name| std::env::var(name).ok());
//! let factory = ProviderSessionFactory::new(config, credentials);
//!
//! let result = PhaseOrchestrator::new(Arc::new(factory))
//!     .execute("Should we rewrite the service in Rust?", &CancellationToken::new())
//!     .await?;
//! println!("{}", result.judge.headline);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod debate;
pub mod prompts;
pub mod providers;
pub mod report;
pub mod session;

pub use config::{ConfigError, Credentials, DialectaConfig, OutputMode, Provider, RoleConfig, RoleOverride};
pub use debate::{
    BroadcastSink, DebateError, DebateEvent, DebateResult, ErrorClass, EventSink, Message,
    MessageRole, NoopSink, PhaseOrchestrator, Role, RoleOutput, RunPhase, SectionLayout,
    SectionStreamParser, SharedSink,
};
pub use prompts::{DefaultPrompts, PromptBuilder};
pub use providers::ProviderSessionFactory;
pub use report::{MarkdownReportWriter, ReportError, ReportWriter};
pub use session::{ChunkSink, GenerationSession, SessionError, SessionFactory};
