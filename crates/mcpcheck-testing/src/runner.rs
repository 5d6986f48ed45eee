//! Executes scenarios against a server.
//!
//! [`ScenarioRunner`] walks a [`TestScenario`] step by step over an
//! [`Exchange`]. A failing step is recorded and the runner moves on; only a
//! step marked fatal ends the scenario early. Steps whose [`Gate`] is closed
//! are skipped without a trace in the report.
//!
//! [`run_scenario`] wraps this in a scoped server lifetime: the server is
//! spawned, the scenario runs, and the server is stopped exactly once no
//! matter how the run ended.

use crate::assertions::{missing_names, require_messages, require_prompts, require_result};
use crate::error::StepFailure;
use crate::report::{ScenarioReport, StepResult};
use crate::scenario::{Gate, PromptArguments, StepAction, TestScenario, TestStep};
use futures::FutureExt;
use mcpcheck_core::capability::{InitializeParams, InitializeResult, ServerInfo};
use mcpcheck_core::types::preview;
use mcpcheck_transport::{
    DEFAULT_READ_TIMEOUT, Exchange, ServerProcess, ServerProcessBuilder, Transport, TransportError,
};
use serde_json::json;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Characters of each message's content shown in the log.
const CONTENT_PREVIEW: usize = 150;

/// What earlier steps observed and later steps may depend on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioState {
    /// Identity the server reported during `initialize`.
    pub server_info: Option<ServerInfo>,
    /// Names from the most recent successful listing. `None` until a
    /// listing has succeeded.
    pub prompt_names: Option<Vec<String>>,
}

impl ScenarioState {
    /// Whether a prompt listing has succeeded.
    #[must_use]
    pub const fn listing_passed(&self) -> bool {
        self.prompt_names.is_some()
    }

    /// Whether `name` appeared in the listing.
    #[must_use]
    pub fn is_listed(&self, name: &str) -> bool {
        self.prompt_names
            .as_ref()
            .is_some_and(|names| names.iter().any(|n| n == name))
    }

    /// Evaluate a gate against this state.
    #[must_use]
    pub fn admits(&self, gate: &Gate) -> bool {
        match gate {
            Gate::Always => true,
            Gate::ListingSucceeded => self.listing_passed(),
            Gate::PromptListed(name) => self.is_listed(name),
        }
    }
}

/// Runs scenarios over an exchange engine.
#[derive(Debug)]
pub struct ScenarioRunner<T> {
    exchange: Exchange<T>,
    state: ScenarioState,
}

impl<T: Transport> ScenarioRunner<T> {
    /// Create a runner.
    pub fn new(exchange: Exchange<T>) -> Self {
        Self {
            exchange,
            state: ScenarioState::default(),
        }
    }

    /// What the steps run so far observed.
    #[must_use]
    pub const fn state(&self) -> &ScenarioState {
        &self.state
    }

    /// Run every step of `scenario` in order and report the outcome.
    pub async fn run(&mut self, scenario: &TestScenario) -> ScenarioReport {
        info!(scenario = %scenario.name, steps = scenario.steps.len(), "running scenario");
        let mut report = ScenarioReport::new(scenario.name.clone());

        for (index, step) in scenario.steps.iter().enumerate() {
            if !self.state.admits(&step.gate) {
                info!(step = %step.name, gate = %step.gate, "skipping gated step");
                continue;
            }

            let result = self.run_step(index, step).await;
            let abort = !result.passed && step.fatal;
            report.steps.push(result);
            if abort {
                let reason = format!("{} failed; remaining steps abandoned", step.name);
                error!("{reason}");
                report.aborted = Some(reason);
                break;
            }
        }

        info!(
            scenario = %report.scenario,
            passed = report.passed(),
            failed = report.failures().count(),
            "scenario finished"
        );
        report
    }

    async fn run_step(&mut self, index: usize, step: &TestStep) -> StepResult {
        info!("Test {}: {}", index + 1, step.name);
        let started = Instant::now();
        let outcome = self.execute(&step.action).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(()) => {
                info!("PASS: {}", step.name);
                StepResult::pass(index, step.name.clone(), elapsed)
            }
            Err(failure) => {
                if let Some(error) = failure.transport() {
                    debug!(kind = %error.kind(), "transport failure");
                }
                warn!("FAIL: {} ({failure})", step.name);
                StepResult::fail(index, step.name.clone(), failure.to_string(), elapsed)
            }
        }
    }

    async fn execute(&mut self, action: &StepAction) -> Result<(), StepFailure> {
        match action {
            StepAction::Initialize(params) => self.initialize(params).await,
            StepAction::Notify { method, params } => {
                self.exchange.notify(method.clone(), params.clone()).await?;
                Ok(())
            }
            StepAction::ListPrompts => self.list_prompts().await,
            StepAction::ExpectPrompts(expected) => self.expect_prompts(expected),
            StepAction::GetPrompt { name, arguments } => {
                self.get_prompt(name, arguments.as_ref()).await
            }
        }
    }

    async fn initialize(&mut self, params: &InitializeParams) -> Result<(), StepFailure> {
        let params = serde_json::to_value(params).map_err(TransportError::from)?;
        let response = self.exchange.exchange("initialize", Some(params)).await?;
        let result = require_result(&response)?;
        if result.as_object().is_none_or(serde_json::Map::is_empty) {
            return Err(StepFailure::assertion(
                "initialize returned an empty result",
            ));
        }

        // Only echoed for diagnostics; an odd shape is not a failure.
        let server_info = serde_json::from_value::<InitializeResult>(result.clone())
            .ok()
            .and_then(|r| r.server_info);
        match &server_info {
            Some(info) => info!("Server: {info}"),
            None => warn!("initialize result has no serverInfo"),
        }
        self.state.server_info = server_info;
        Ok(())
    }

    async fn list_prompts(&mut self) -> Result<(), StepFailure> {
        let response = self.exchange.exchange("prompts/list", None).await?;
        let listing = require_prompts(require_result(&response)?)?;

        info!("Found {} prompts", listing.prompts.len());
        for prompt in &listing.prompts {
            info!(
                "  - {}: {}",
                prompt.name,
                preview(prompt.description.as_deref().unwrap_or(""), 100)
            );
        }
        let duplicates = listing.duplicate_names();
        if !duplicates.is_empty() {
            warn!(names = ?duplicates, "prompt names are not unique");
        }

        self.state.prompt_names = Some(listing.names());
        Ok(())
    }

    fn expect_prompts(&self, expected: &[String]) -> Result<(), StepFailure> {
        let listed = self.state.prompt_names.as_deref().unwrap_or_default();
        let missing = missing_names(expected, listed);
        if missing.is_empty() {
            info!("All {} expected prompts found", expected.len());
            Ok(())
        } else {
            Err(StepFailure::assertion(format!(
                "missing prompts: {}",
                missing.join(", ")
            )))
        }
    }

    async fn get_prompt(
        &mut self,
        name: &str,
        arguments: Option<&PromptArguments>,
    ) -> Result<(), StepFailure> {
        let mut params = json!({ "name": name });
        if let Some(arguments) = arguments {
            params["arguments"] = json!(arguments);
        }

        let response = self.exchange.exchange("prompts/get", Some(params)).await?;
        let payload = require_messages(require_result(&response)?)?;

        info!(
            "Retrieved prompt '{name}' with {} messages",
            payload.messages.len()
        );
        for message in &payload.messages {
            info!(
                "  [{}] {}",
                message.role,
                preview(&message.content.to_text(), CONTENT_PREVIEW)
            );
        }
        Ok(())
    }
}

/// Options for [`run_scenario`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Bound on each receive. `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// Pause between spawning the server and the first step.
    pub startup_delay: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            startup_delay: Duration::from_millis(500),
        }
    }
}

impl RunOptions {
    /// Set the receive bound.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the startup delay.
    #[must_use]
    pub const fn startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }
}

/// Spawn a server, hand it to `body`, and stop it afterwards.
///
/// `stop` runs exactly once whether `body` returns or panics; a panic is
/// resumed after the server is gone. Fails only if the server cannot be
/// launched, in which case `body` never runs.
pub async fn with_server<F, R>(builder: ServerProcessBuilder, body: F) -> Result<R, TransportError>
where
    F: AsyncFnOnce(&mut ServerProcess) -> R,
{
    let mut server = builder.spawn().await?;
    let outcome = AssertUnwindSafe(body(&mut server)).catch_unwind().await;
    server.stop().await;
    match outcome {
        Ok(value) => Ok(value),
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// Launch the server described by `builder`, run `scenario` against it and
/// stop it.
///
/// A launch failure is returned as an error; everything that goes wrong
/// after launch is part of the report.
pub async fn run_scenario(
    builder: ServerProcessBuilder,
    scenario: &TestScenario,
    options: RunOptions,
) -> Result<ScenarioReport, TransportError> {
    info!(server = %builder.program().display(), "starting server");
    with_server(builder, async |server: &mut ServerProcess| {
        if !options.startup_delay.is_zero() {
            tokio::time::sleep(options.startup_delay).await;
        }

        let exchange = Exchange::new(&mut *server).with_read_timeout(options.read_timeout);
        let mut runner = ScenarioRunner::new(exchange);
        let mut report = runner.run(scenario).await;
        drop(runner);

        if !report.success() {
            report.stderr_tail = server.stderr_tail();
        }
        report
    })
    .await
}
