//! Report persistence.
//!
//! A failed write never fails a run: the orchestrator logs the error and returns
//! the result without a report location.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::info;

use crate::debate::errors::ErrorClass;
use crate::debate::result::DebateResult;

/// Collisions within the same second get a numeric suffix, up to this many.
const MAX_NAME_ATTEMPTS: u32 = 100;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to create report directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no free report file name in {0}")]
    NameExhausted(PathBuf),
}

impl ReportError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Persistence
    }
}

/// Stores a human-readable rendering of a finished run.
pub trait ReportWriter: Send + Sync {
    /// Persist `result`; returns the location written.
    fn persist(&self, result: &DebateResult) -> Result<String, ReportError>;
}

/// Writes `debate_YYYYMMDD_HHMMSS.md` files into a directory.
#[derive(Debug, Clone)]
pub struct MarkdownReportWriter {
    dir: PathBuf,
}

impl MarkdownReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn create_file(&self, stamp: &str) -> Result<(PathBuf, std::fs::File), ReportError> {
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let name = if attempt == 1 {
                format!("debate_{stamp}.md")
            } else {
                format!("debate_{stamp}_{attempt}.md")
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(ReportError::Write { path, source }),
            }
        }
        Err(ReportError::NameExhausted(self.dir.clone()))
    }
}

impl ReportWriter for MarkdownReportWriter {
    fn persist(&self, result: &DebateResult) -> Result<String, ReportError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| ReportError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let now = Local::now();
        let (path, mut file) = self.create_file(&now.format("%Y%m%d_%H%M%S").to_string())?;
        file.write_all(render_markdown(result, &now).as_bytes())
            .map_err(|source| ReportError::Write {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), "debate report written");
        Ok(path.display().to_string())
    }
}

/// Markdown rendering of a finished run.
pub fn render_markdown(result: &DebateResult, generated_at: &DateTime<Local>) -> String {
    format!(
        "# Debate Report\n\
         > Generated by Dialecta at {stamp}\n\n\
         ## 📄 Material\n{material}\n\n\
         ---\n\n\
         ## 💡 Pro One-Liner\n{pro_head}\n\n\
         ## 🟢 Affirmative Argument (Full)\n{pro_body}\n\n\
         ---\n\n\
         ## 💡 Con One-Liner\n{con_head}\n\n\
         ## 🔴 Negative Argument (Full)\n{con_body}\n\n\
         ---\n\n\
         ## 💡 Verdict\n{judge_head}\n\n\
         ## ⚖️ Full Adjudication\n{judge_body}\n",
        stamp = generated_at.to_rfc2822(),
        material = result.material.trim(),
        pro_head = result.pro.headline,
        pro_body = result.pro.full_body,
        con_head = result.con.headline,
        con_body = result.con.full_body,
        judge_head = result.judge.headline,
        judge_body = result.judge.full_body,
    )
}
