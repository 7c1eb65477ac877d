//! Two-phase debate pipeline.
//!
//! ```text
//! Phase 1: Parallel (fan-out)
//!   JoinSet::spawn(Pro)  ┐
//!   JoinSet::spawn(Con)  ┘ → hard join, both outcomes collected
//!
//! Phase 2: Sequential (fan-in)
//!   Judge(material, pro.full_body, con.full_body) → verdict
//! ```
//!
//! ## Failure policy
//!
//! A Phase-1 failure never cancels the sibling; both tasks run to completion
//! and the error is surfaced after the join. If the run token fired, the
//! cancellation is reported instead of whatever transport errors it caused.
//! Otherwise Pro's error is checked before Con's. A Judge failure aborts the
//! run directly. Report persistence failures are logged and ignored.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::errors::DebateError;
use super::events::{emit_all, DebateEvent, SharedSink};
use super::parser::{SectionLayout, SectionStreamParser};
use super::result::{DebateResult, RoleOutput};
use super::roles::{Message, Role};
use super::state::{RunPhase, RunState};
use crate::config::OutputMode;
use crate::prompts::{DefaultPrompts, PromptBuilder};
use crate::report::ReportWriter;
use crate::session::{SessionError, SessionFactory};

type RoleOutcome = Result<RoleOutput, DebateError>;

// ── PhaseOrchestrator ─────────────────────────────────────────────────────────

/// Runs one debate: Pro and Con in parallel, then the Judge.
pub struct PhaseOrchestrator {
    sessions: Arc<dyn SessionFactory>,
    prompts: Arc<dyn PromptBuilder>,
    sinks: Vec<SharedSink>,
    output: OutputMode,
    report: Option<Arc<dyn ReportWriter>>,
}

impl PhaseOrchestrator {
    /// Orchestrator with the default prompts, streaming headlines, no sinks
    /// and no report writer.
    pub fn new(sessions: Arc<dyn SessionFactory>) -> Self {
        Self {
            sessions,
            prompts: Arc::new(DefaultPrompts),
            sinks: Vec::new(),
            output: OutputMode::default(),
            report: None,
        }
    }

    pub fn with_prompts(mut self, prompts: Arc<dyn PromptBuilder>) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_output_mode(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_report_writer(mut self, writer: Arc<dyn ReportWriter>) -> Self {
        self.report = Some(writer);
        self
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output
    }

    /// Run the full debate over `material`.
    ///
    /// Returns either the complete result or exactly one error, never both.
    pub async fn execute(
        &self,
        material: &str,
        cancel: &CancellationToken,
    ) -> Result<DebateResult, DebateError> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("debate", run_id = %run_id);
        self.run(run_id, material, cancel).instrument(span).await
    }

    async fn run(
        &self,
        run_id: String,
        material: &str,
        cancel: &CancellationToken,
    ) -> Result<DebateResult, DebateError> {
        let mut state = RunState::new(run_id);
        let mut result = DebateResult::new(material);
        let runner = RoleRunner {
            sessions: Arc::clone(&self.sessions),
            sinks: Arc::new(self.sinks.clone()),
            output: self.output,
            cancel: cancel.clone(),
        };

        info!(mode = ?self.output, material_len = material.len(), "debate started");

        // ── Phase 1: Pro and Con ──────────────────────────────────────────
        state.transition(RunPhase::ParallelRunning, "launching pro and con")?;
        let [(_, pro), (_, con)] = self.run_parallel(&runner, material).await;

        if cancel.is_cancelled() {
            let phase = state.abort("cancelled during parallel phase")?;
            warn!("debate cancelled before the judge phase");
            return Err(DebateError::Cancelled { phase });
        }
        let (pro, con) = match (pro, con) {
            (Ok(pro), Ok(con)) => (pro, con),
            (Err(e), _) | (_, Err(e)) => {
                state.abort(&e.to_string())?;
                warn!(error = %e, "parallel phase failed");
                return Err(e);
            }
        };
        result.record(Role::Pro, pro);
        result.record(Role::Con, con);
        state.transition(RunPhase::ParallelJoined, "pro and con finished")?;

        // ── Gate ──────────────────────────────────────────────────────────
        emit_all(
            &runner.sinks,
            DebateEvent::PhaseTransition {
                from: RunPhase::ParallelJoined,
                to: RunPhase::SequentialRunning,
            },
        );
        if cancel.is_cancelled() {
            let phase = state.abort("cancelled before judge")?;
            return Err(DebateError::Cancelled { phase });
        }

        // ── Phase 2: Judge ────────────────────────────────────────────────
        state.transition(RunPhase::SequentialRunning, "launching judge")?;
        let messages = self
            .prompts
            .synthesis(material, &result.pro.full_body, &result.con.full_body);
        let layout = self.prompts.layout(Role::Judge);
        // Held in a JoinSet so dropping `execute` aborts the Judge.
        let mut judge_task: JoinSet<RoleOutcome> = JoinSet::new();
        judge_task.spawn(
            runner
                .clone()
                .run_guarded(Role::Judge, messages, layout, RunPhase::SequentialRunning)
                .in_current_span(),
        );
        let judge = match judge_task.join_next().await {
            Some(Ok(outcome)) => outcome,
            Some(Err(e)) => Err(DebateError::TaskFailed {
                role: Role::Judge,
                message: e.to_string(),
            }),
            None => Err(DebateError::TaskFailed {
                role: Role::Judge,
                message: "task produced no outcome".to_string(),
            }),
        };

        let judge = match judge {
            _ if cancel.is_cancelled() => {
                let phase = state.abort("cancelled during judge phase")?;
                warn!("debate cancelled during the judge phase");
                return Err(DebateError::Cancelled { phase });
            }
            Ok(judge) => judge,
            Err(e) => {
                state.abort(&e.to_string())?;
                warn!(error = %e, "judge phase failed");
                return Err(e);
            }
        };
        result.record(Role::Judge, judge);
        state.transition(RunPhase::Done, "judge finished")?;

        // ── Completion ────────────────────────────────────────────────────
        if let Some(writer) = &self.report {
            match writer.persist(&result) {
                Ok(location) => result.report_path = Some(location),
                Err(e) => warn!(error = %e, class = %e.class(), "failed to save report"),
            }
        }

        info!(
            elapsed_ms = state.elapsed_ms(),
            report = result.report_path.as_deref().unwrap_or("-"),
            "debate finished"
        );
        Ok(result)
    }

    /// Spawn Pro and Con and wait for both. Outcomes are returned in
    /// `Role::PARALLEL` order regardless of completion order.
    async fn run_parallel(&self, runner: &RoleRunner, material: &str) -> [(Role, RoleOutcome); 2] {
        let mut join_set: JoinSet<(Role, RoleOutcome)> = JoinSet::new();

        for role in Role::PARALLEL {
            let messages = self.prompts.opening(role, material);
            let layout = self.prompts.layout(role);
            let runner = runner.clone();
            join_set.spawn(
                async move {
                    let outcome = runner
                        .run_guarded(role, messages, layout, RunPhase::ParallelRunning)
                        .await;
                    (role, outcome)
                }
                .in_current_span(),
            );
        }

        let mut pro: Option<RoleOutcome> = None;
        let mut con: Option<RoleOutcome> = None;
        let mut join_failure: Option<String> = None;

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((role, outcome)) => {
                    debug!(role = %role, ok = outcome.is_ok(), "parallel role joined");
                    match role {
                        Role::Pro => pro = Some(outcome),
                        Role::Con => con = Some(outcome),
                        Role::Judge => {}
                    }
                }
                Err(e) => {
                    warn!(error = %e, "parallel role task did not complete");
                    join_failure = Some(e.to_string());
                }
            }
        }

        let missing = |role: Role| -> RoleOutcome {
            Err(DebateError::TaskFailed {
                role,
                message: join_failure
                    .clone()
                    .unwrap_or_else(|| "task produced no outcome".to_string()),
            })
        };
        [
            (Role::Pro, pro.unwrap_or_else(|| missing(Role::Pro))),
            (Role::Con, con.unwrap_or_else(|| missing(Role::Con))),
        ]
    }
}

// ── RoleRunner ────────────────────────────────────────────────────────────────

/// Everything one role task needs, cloned into the task.
#[derive(Clone)]
struct RoleRunner {
    sessions: Arc<dyn SessionFactory>,
    sinks: Arc<Vec<SharedSink>>,
    output: OutputMode,
    cancel: CancellationToken,
}

impl RoleRunner {
    /// Run the role, converting panics into `TaskFailed`. Always emits
    /// `RoleDone` when the role's work ends.
    async fn run_guarded(
        self,
        role: Role,
        messages: Vec<Message>,
        layout: SectionLayout,
        phase: RunPhase,
    ) -> RoleOutcome {
        let span = info_span!("role", role = %role);
        let outcome = AssertUnwindSafe(self.run(role, &messages, layout).instrument(span))
            .catch_unwind()
            .await;
        emit_all(&self.sinks, DebateEvent::RoleDone { role });

        match outcome {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(DebateError::from_session(role, phase, e)),
            Err(panic) => Err(DebateError::TaskFailed {
                role,
                message: panic_message(panic.as_ref()),
            }),
        }
    }

    async fn run(
        &self,
        role: Role,
        messages: &[Message],
        layout: SectionLayout,
    ) -> Result<RoleOutput, SessionError> {
        let session = self.sessions.create(role)?;
        if self.cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }

        let mut parser = match session.max_output_tokens() {
            Some(cap) => SectionStreamParser::bounded(layout, cap),
            None => SectionStreamParser::new(layout),
        };
        let start = Instant::now();
        info!(backend = %session.describe(), mode = ?self.output, "role started");

        match self.output {
            OutputMode::Batch => {
                let text = session.complete(messages, &self.cancel).await?;
                if let Some(headline) = parser.feed(&text) {
                    self.headline(role, headline);
                }
            }
            OutputMode::Headlines => {
                let mut on_chunk = |chunk: &str| {
                    if let Some(headline) = parser.feed(chunk) {
                        self.headline(role, headline);
                    }
                };
                session.stream(messages, &self.cancel, &mut on_chunk).await?;
            }
            OutputMode::RawChunks => {
                let mut on_chunk = |chunk: &str| {
                    parser.feed(chunk);
                    emit_all(
                        &self.sinks,
                        DebateEvent::Chunk {
                            role,
                            text: chunk.to_string(),
                        },
                    );
                };
                session.stream(messages, &self.cancel, &mut on_chunk).await?;
            }
        }

        let headline_found = parser.headline_found();
        let output = RoleOutput::from(parser.into_sections());
        info!(
            headline_found,
            body_len = output.full_body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "role finished"
        );
        Ok(output)
    }

    fn headline(&self, role: Role, text: &str) {
        emit_all(
            &self.sinks,
            DebateEvent::Headline {
                role,
                text: text.to_string(),
            },
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
