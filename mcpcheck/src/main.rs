//! The `mcpcheck` command.

use clap::Parser;
use mcpcheck::{Cli, render_summary};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.logging.filter())),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match mcpcheck::run(&cli) {
        Ok(report) => {
            print!("{}", render_summary(&report));
            if report.success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            ExitCode::FAILURE
        }
    }
}
