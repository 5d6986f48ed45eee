//! Errors that end a harness run.

use crate::prebuild::BuildError;
use mcpcheck_transport::TransportError;
use miette::Diagnostic;
use thiserror::Error;

/// Anything that stops the harness before it can produce a report.
///
/// A failing step is not an error; it is part of the report.
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    /// The pre-run build failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Build(#[from] BuildError),

    /// The server could not be launched.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Launch(#[from] TransportError),

    /// The async runtime could not be created.
    #[error("failed to start runtime: {0}")]
    #[diagnostic(code(mcpcheck::runtime))]
    Runtime(#[source] std::io::Error),
}
