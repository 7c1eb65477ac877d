use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use dialecta_core::{ConfigError, Credentials, DebateError, SharedSink};
use dialecta::app::{check_credentials, resolve_config, run_debate};
use dialecta::args::Args;
use dialecta::input::{read_material, validate_material, MaterialSource};
use dialecta::terminal::{print_summary, TerminalSink};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.needs_help() {
        let _ = Args::command().print_help();
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error [{}]: {e:#}", error_class(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = resolve_config(&args)?;
    let credentials = Credentials::from_lookup(|name| std::env::var(name).ok());
    check_credentials(&config, &credentials)?;

    let Some(source) = MaterialSource::resolve(args.input.as_deref(), args.interactive)? else {
        anyhow::bail!("no input given");
    };
    let material = {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut prompt = std::io::stderr();
        read_material(&source, &mut input, &mut prompt)?
    };
    validate_material(&material)?;

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let sink = if args.json {
        None
    } else {
        let terminal: SharedSink = Arc::new(TerminalSink::stdout());
        Some(terminal)
    };

    let mode = config.output;
    let result = run_debate(config, credentials, &material, sink, &cancel).await?;

    let mut out = std::io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &result)?;
        writeln!(out)?;
    } else {
        print_summary(&mut out, &result, mode)?;
    }
    Ok(())
}

/// Cancel the run on Ctrl-C (and SIGTERM on unix).
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = term.recv() => {}
                    }
                }
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        info!("interrupt received, cancelling debate");
        eprintln!("\nInterrupted, stopping...");
        cancel.cancel();
    });
}

fn error_class(e: &anyhow::Error) -> String {
    e.chain()
        .find_map(|cause| {
            cause
                .downcast_ref::<DebateError>()
                .map(|d| d.class().to_string())
                .or_else(|| cause.downcast_ref::<ConfigError>().map(|c| c.class().to_string()))
        })
        .unwrap_or_else(|| "error".to_string())
}
