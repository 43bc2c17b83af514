//! arm CLI
//!
//! Parses arguments, sets up logging, and runs the requested verb on a
//! blocking worker while the main task watches for Ctrl-C.

mod cli;
mod commands;
mod context;
mod error;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use arm_core::CancelToken;
use cli::Cli;
use context::Context;
use error::{CliError, Result};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e @ CliError::Partial { .. }) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{}: {}", format!("error[{}]", e.kind()).red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Crates whose spans and events `--verbose` turns up to debug.
const VERBOSE_TARGETS: &[&str] = &[
    "arm",
    "arm_core",
    "arm_registry",
    "arm_compiler",
    "arm_fs",
    "arm_meta",
];

fn default_directives(verbose: bool) -> String {
    if verbose {
        VERBOSE_TARGETS
            .iter()
            .map(|target| format!("{target}=debug"))
            .collect::<Vec<_>>()
            .join(",")
    } else {
        "warn".to_string()
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` shows debug output and the
/// default shows warnings only.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
    tracing::debug!("Verbose mode enabled");
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let cancel = CancelToken::new();
    let ctx = Context {
        manifest: cli.manifest,
        cache_dir: cli.cache_dir,
        cancel: cancel.clone(),
    };
    let command = cli.command;

    let mut task = tokio::task::spawn_blocking(move || commands::dispatch(command, &ctx));
    tokio::select! {
        joined = &mut task => joined.map_err(|e| CliError::user(format!("command aborted: {e}")))?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("{} cancelling after the current step...", "!".yellow().bold());
            cancel.cancel();
            task.await.map_err(|e| CliError::user(format!("command aborted: {e}")))?
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_covers_every_workspace_library() {
        let directives = default_directives(true);
        for target in ["arm_core", "arm_registry", "arm_compiler", "arm_fs", "arm_meta"] {
            assert!(directives.contains(&format!("{target}=debug")), "{target} missing");
        }
        assert!(EnvFilter::try_new(&directives).is_ok());
        assert_eq!(default_directives(false), "warn");
    }
}
