//! Terminal rendering of debate events.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Mutex;

use dialecta_core::{DebateEvent, DebateResult, EventSink, OutputMode, Role};

const RULE: &str = "────────────────────────────────────────────────────────────";

/// Writes events as they arrive. Pro and Con call in concurrently, so every
/// write happens under one lock and each event is written whole.
pub struct TerminalSink {
    inner: Mutex<Inner>,
}

struct Inner {
    out: Box<dyn Write + Send>,
    /// Role of the last raw chunk written, for section headers.
    chunk_role: Option<Role>,
    headlined: HashSet<Role>,
}

impl TerminalSink {
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                out,
                chunk_role: None,
                headlined: HashSet::new(),
            }),
        }
    }
}

impl EventSink for TerminalSink {
    fn emit(&self, event: &DebateEvent) {
        // A panic in another emitter must not silence the rest of the run.
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        // Terminal output is best effort; a closed pipe must not fail the run.
        let _ = inner.render(event);
    }
}

impl Inner {
    fn render(&mut self, event: &DebateEvent) -> std::io::Result<()> {
        match event {
            DebateEvent::Headline { role, text } => {
                self.headlined.insert(*role);
                writeln!(self.out, "[{}] {}", heading(*role), text)?;
            }
            DebateEvent::Chunk { role, text } => {
                if self.chunk_role != Some(*role) {
                    self.chunk_role = Some(*role);
                    writeln!(self.out, "\n{RULE}\n[{}]", heading(*role))?;
                }
                write!(self.out, "{text}")?;
            }
            DebateEvent::RoleDone { role } => {
                if self.chunk_role.is_none() && !self.headlined.contains(role) {
                    writeln!(self.out, "[{}] finished (no headline)", heading(*role))?;
                }
            }
            DebateEvent::PhaseTransition { .. } => {
                self.chunk_role = None;
                writeln!(self.out, "\n{RULE}\nBoth sides are in. The adjudicator is deliberating...\n{RULE}")?;
            }
        }
        self.out.flush()
    }
}

fn heading(role: Role) -> String {
    format!("{} / {}", role.title(), role)
}

/// Final rendering once the run has succeeded. Streaming modes already showed
/// the headlines (or every chunk) live, so only what is still missing is
/// printed: all three full bodies for batch runs, the verdict body for
/// headline runs, nothing for raw runs. The report location always follows.
pub fn print_summary<W: Write>(
    out: &mut W,
    result: &DebateResult,
    mode: OutputMode,
) -> std::io::Result<()> {
    if !mode.is_streaming() {
        for role in Role::ALL {
            writeln!(out, "\n{RULE}\n[{}]\n{RULE}\n", heading(role))?;
            writeln!(out, "{}", result.output(role).full_body)?;
        }
    } else if mode == OutputMode::Headlines {
        writeln!(out, "\n{RULE}\n[{}]\n{RULE}\n", heading(Role::Judge))?;
        writeln!(out, "{}", result.judge.full_body)?;
    }

    match &result.report_path {
        Some(path) => writeln!(out, "\nFull report saved to {path}")?,
        None => writeln!(out, "\nNo report written")?,
    }
    Ok(())
}
