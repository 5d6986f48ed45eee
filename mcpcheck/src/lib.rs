//! # mcpcheck
//!
//! A conformance harness for Model Context Protocol servers that speak
//! newline-delimited JSON-RPC over their standard streams.
//!
//! The harness launches the server, drives it through the `initialize`
//! handshake, the prompt listing and prompt retrieval with and without
//! arguments, and turns each reply into a pass/fail verdict.
//!
//! | Crate | Role |
//! |-------|------|
//! | [`mcpcheck_core`] | wire types and content normalization |
//! | [`mcpcheck_transport`] | process control, framing, request/response exchange |
//! | [`mcpcheck_testing`] | scenarios, runner, report, mock server |
//!
//! This crate adds the command line, the optional build step and the
//! printed summary.

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod error;
pub mod prebuild;
pub mod report;

pub use mcpcheck_core;
pub use mcpcheck_testing;
pub use mcpcheck_transport;

pub use cli::{Cli, Suite};
pub use error::CliError;
pub use prebuild::{BuildError, BuildStep};
pub use report::render_summary;

use mcpcheck_testing::{ScenarioReport, run_scenario};
use tracing::info;

/// Run the harness as configured: build if asked, then launch the server
/// and run the selected suite against it.
///
/// # Errors
///
/// Fails on a build failure, a launch failure, or if the runtime cannot be
/// created. Failing steps are reported, not returned as errors.
pub fn run(cli: &Cli) -> Result<ScenarioReport, CliError> {
    if let Some(step) = cli.build_step() {
        step.run()?;
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let scenario = cli.suite.scenario();
    info!(suite = ?cli.suite, server = %cli.server.display(), "starting conformance run");
    let report = runtime.block_on(run_scenario(
        cli.server_builder(),
        &scenario,
        cli.run_options(),
    ))?;
    Ok(report)
}
