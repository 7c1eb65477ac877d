//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use dialecta_core::{OutputMode, Provider, Role, RoleOverride};

/// Multi-persona debate: affirmative and negative argue in parallel, then an
/// adjudicator delivers the verdict.
///
/// API keys are read from DEEPSEEK_API_KEY, DASHSCOPE_API_KEY and
/// GEMINI_API_KEY (or GOOGLE_API_KEY).
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "dialecta", author, version, about, long_about = None)]
pub struct Args {
    /// Material to debate: a file path, `-` for stdin, or literal text
    #[arg(value_name = "INPUT")]
    pub input: Option<String>,

    /// Enter the material interactively (finish with two empty lines)
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// TOML config file layered under these flags
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Provider for the affirmative side (deepseek, dashscope, gemini)
    #[arg(long)]
    pub pro_provider: Option<Provider>,

    /// Model for the affirmative side
    #[arg(long)]
    pub pro_model: Option<String>,

    /// Provider for the negative side (deepseek, dashscope, gemini)
    #[arg(long)]
    pub con_provider: Option<Provider>,

    /// Model for the negative side
    #[arg(long)]
    pub con_model: Option<String>,

    /// Provider for the adjudicator (deepseek, dashscope, gemini)
    #[arg(long)]
    pub judge_provider: Option<Provider>,

    /// Model for the adjudicator
    #[arg(long)]
    pub judge_model: Option<String>,

    /// Use blocking requests instead of streaming
    #[arg(long, default_value_t = false)]
    pub no_stream: bool,

    /// Print every streamed chunk instead of headlines only
    #[arg(long, default_value_t = false, conflicts_with = "no_stream")]
    pub raw: bool,

    /// Directory for the Markdown report
    #[arg(long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,

    /// Do not write a report
    #[arg(long, default_value_t = false, conflicts_with = "report_dir")]
    pub no_report: bool,

    /// Print the result as JSON instead of the terminal rendering
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl Args {
    /// Per-role overrides expressed by the flags.
    pub fn overrides(&self, role: Role) -> RoleOverride {
        let (provider, model) = match role {
            Role::Pro => (self.pro_provider, &self.pro_model),
            Role::Con => (self.con_provider, &self.con_model),
            Role::Judge => (self.judge_provider, &self.judge_model),
        };
        RoleOverride {
            provider,
            model: model.clone().filter(|m| !m.trim().is_empty()),
            ..RoleOverride::default()
        }
    }

    /// Output mode forced by the flags, if any.
    pub fn output_mode(&self) -> Option<OutputMode> {
        if self.no_stream {
            Some(OutputMode::Batch)
        } else if self.raw {
            Some(OutputMode::RawChunks)
        } else {
            None
        }
    }

    /// Whether there is nothing to read material from.
    pub fn needs_help(&self) -> bool {
        self.input.is_none() && !self.interactive
    }
}
