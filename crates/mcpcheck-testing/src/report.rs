//! Step results and the aggregate report.

use std::fmt;
use std::time::Duration;

/// Result of a single executed step. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    /// Position of the step in the scenario.
    pub index: usize,
    /// Step name.
    pub name: String,
    /// Whether the step passed.
    pub passed: bool,
    /// Why the step failed.
    pub error: Option<String>,
    /// Time spent in the step.
    pub duration: Duration,
}

impl StepResult {
    /// A passing result.
    pub fn pass(index: usize, name: impl Into<String>, duration: Duration) -> Self {
        Self {
            index,
            name: name.into(),
            passed: true,
            error: None,
            duration,
        }
    }

    /// A failing result.
    pub fn fail(
        index: usize,
        name: impl Into<String>,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            index,
            name: name.into(),
            passed: false,
            error: Some(error.into()),
            duration,
        }
    }
}

/// Outcome of running one scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioReport {
    /// Scenario name.
    pub scenario: String,
    /// Results of the steps that ran, in order.
    pub steps: Vec<StepResult>,
    /// Set when a fatal step failed and the remaining steps were abandoned.
    pub aborted: Option<String>,
    /// Last lines of the server's stderr, for diagnosing failures.
    pub stderr_tail: Vec<String>,
}

impl ScenarioReport {
    /// Create an empty report.
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            ..Self::default()
        }
    }

    /// Number of steps that passed.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.steps.iter().filter(|s| s.passed).count()
    }

    /// Number of steps that ran.
    #[must_use]
    pub fn total(&self) -> usize {
        self.steps.len()
    }

    /// Steps that failed.
    pub fn failures(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|s| !s.passed)
    }

    /// Whether the run succeeded: something ran, everything that ran
    /// passed, and nothing was abandoned.
    #[must_use]
    pub fn success(&self) -> bool {
        self.total() > 0 && self.passed() == self.total() && self.aborted.is_none()
    }

    /// Look up a step result by name.
    #[must_use]
    pub fn step(&self, name: &str) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.name == name)
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            if step.passed {
                writeln!(f, "PASS: {}", step.name)?;
            } else {
                match &step.error {
                    Some(error) => writeln!(f, "FAIL: {} ({error})", step.name)?,
                    None => writeln!(f, "FAIL: {}", step.name)?,
                }
            }
        }
        if let Some(reason) = &self.aborted {
            writeln!(f, "ABORTED: {reason}")?;
        }
        write!(f, "Total: {}/{} tests passed", self.passed(), self.total())
    }
}
