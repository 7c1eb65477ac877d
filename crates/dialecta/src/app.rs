//! Wiring from parsed arguments to a finished debate.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use dialecta_core::{
    Credentials, DebateResult, DialectaConfig, MarkdownReportWriter, PhaseOrchestrator,
    ProviderSessionFactory, Role, SharedSink,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::args::Args;

/// File config (or defaults) with the command-line flags layered on top.
pub fn resolve_config(args: &Args) -> Result<DialectaConfig> {
    let mut config = match &args.config {
        Some(path) => DialectaConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DialectaConfig::default(),
    };

    for role in Role::ALL {
        config.apply(role, &args.overrides(role));
    }
    if let Some(mode) = args.output_mode() {
        config.output = mode;
    }
    if args.no_report {
        config.report_dir = None;
    } else if let Some(dir) = &args.report_dir {
        config.report_dir = Some(dir.clone());
    }

    config.validate()?;
    Ok(config)
}

/// Fail before any request is made when a configured provider has no key.
pub fn check_credentials(config: &DialectaConfig, credentials: &Credentials) -> Result<()> {
    let missing = credentials.missing_for(config);
    if missing.is_empty() {
        return Ok(());
    }
    let names: Vec<String> = missing
        .iter()
        .map(|p| format!("{} ({})", p, p.key_env_vars().join(" or ")))
        .collect();
    bail!("missing API key for {}", names.join(", "));
}

/// Build the orchestrator from `config` and run it over `material`.
pub async fn run_debate(
    config: DialectaConfig,
    credentials: Credentials,
    material: &str,
    sink: Option<SharedSink>,
    cancel: &CancellationToken,
) -> Result<DebateResult> {
    for role in Role::ALL {
        let rc = config.role(role);
        info!(%role, provider = %rc.provider, model = rc.effective_model(), "role configured");
    }

    let output = config.output;
    let report_dir = config.report_dir.clone();
    let factory = ProviderSessionFactory::new(config, credentials);

    let mut orchestrator = PhaseOrchestrator::new(Arc::new(factory)).with_output_mode(output);
    if let Some(sink) = sink {
        orchestrator = orchestrator.with_sink(sink);
    }
    if let Some(dir) = report_dir {
        orchestrator = orchestrator.with_report_writer(Arc::new(MarkdownReportWriter::new(dir)));
    }

    let result = orchestrator.execute(material, cancel).await?;
    Ok(result)
}
