//! ocelint CLI
//!
//! Inspects Python sources with the configured plugins and reports
//! the findings grouped along a chosen axis.

mod cli;
mod discover;
mod output;

use std::process::ExitCode;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ocelint_core::{Config, Session};

use crate::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut config = Config::discover();
    apply_cli_overrides(&mut config, &cli);

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.verbosity.clone()))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli, config) {
        Ok(has_findings) => {
            if has_findings {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(2)
        }
    }
}

fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if cli.no_fail_exit {
        config.fail_exit = false;
    }
    if cli.no_core {
        config.load_core = false;
    }
    config
        .blacklist
        .plugins
        .extend(cli.ignore_plugins.iter().cloned());
    config
        .blacklist
        .codes
        .extend(cli.ignore_codes.iter().cloned());
}

fn run(cli: Cli, config: Config) -> Result<bool> {
    let fail_exit = config.fail_exit;
    let mut session = Session::new(config);
    session.start().into_diagnostic()?;

    if cli.show_plugins {
        for plugin in session.plugins() {
            let status = if plugin.is_inactive() { " (inactive)" } else { "" };
            println!("{plugin}{status}");
        }
        return Ok(false);
    }

    let files = discover::discover_files(&cli.paths)?;
    if files.is_empty() {
        warn!("no Python files matched the given paths");
        return Ok(false);
    }
    info!(files = files.len(), "inspecting");

    let grouped = session.bulk_inspection(&files, cli.group).into_diagnostic()?;
    output::output_results(&grouped, cli.format, files.len());

    let total: usize = grouped.values().map(Vec::len).sum();
    Ok(fail_exit && total > 0)
}
