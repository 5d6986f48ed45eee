//! Scenario runner and test support for mcpcheck.
//!
//! This crate turns raw replies into verdicts. It provides:
//!
//! - Scenario descriptors: ordered, named steps with explicit gates
//! - A runner with partial-failure semantics and a scoped server lifetime
//! - The aggregate report and its pass/total tally
//! - Built-in fixtures: client identity, expected prompts, three scenarios
//! - A mock prompt server with selectable misbehaviour, for tests
//!
//! # Example
//!
//! ```no_run
//! use mcpcheck_testing::{fixtures, run_scenario, RunOptions};
//! use mcpcheck_transport::ServerProcess;
//!
//! # async fn example() -> Result<(), mcpcheck_transport::TransportError> {
//! let report = run_scenario(
//!     ServerProcess::builder("./gemara-mcp-server"),
//!     &fixtures::full_scenario(),
//!     RunOptions::default(),
//! )
//! .await?;
//!
//! println!("{report}");
//! assert!(report.success());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_name_repetitions)]

pub mod assertions;
pub mod error;
pub mod fixtures;
pub mod mock;
pub mod report;
pub mod runner;
pub mod scenario;

pub use assertions::{missing_names, require_messages, require_prompts, require_result};
pub use error::StepFailure;
pub use report::{ScenarioReport, StepResult};
pub use runner::{RunOptions, ScenarioRunner, ScenarioState, run_scenario, with_server};
pub use scenario::{Gate, PromptArguments, StepAction, TestScenario, TestStep};
