// src/main.rs

mod cli;

use anyhow::{Context, Result};
use art_apex_check::{CheckOptions, RunOutcome, run};
use clap::Parser;
use cli::Cli;
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    // Logs go to stderr so --list and --tree output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not failures
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match check(cli.into()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn check(options: CheckOptions) -> Result<bool> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let outcome = run(&options, &mut out)
        .with_context(|| format!("Checking {}", options.apex.display()))?;

    if let RunOutcome::Checked(report) = &outcome {
        let failed = report.results.iter().filter(|r| !r.passed()).count();
        if failed > 0 {
            error!(
                "{} of {} checkers failed ({} bitness)",
                failed,
                report.results.len(),
                report.bitness
            );
        }
    }
    Ok(outcome.passed())
}
