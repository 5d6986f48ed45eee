//! Scenario definitions.
//!
//! A [`TestScenario`] is an ordered list of [`TestStep`]s. Each step names an
//! [`StepAction`] to perform and a [`Gate`] deciding, from what earlier steps
//! observed, whether the step runs at all. There is no branching beyond that:
//! steps run in the order they were added.

use mcpcheck_core::capability::InitializeParams;
use std::collections::BTreeMap;
use std::fmt;

/// String arguments passed to `prompts/get`.
pub type PromptArguments = BTreeMap<String, String>;

/// What a step does.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    /// Send `initialize`; passes iff the reply has a non-empty result.
    Initialize(InitializeParams),
    /// Send a one-way notification; passes iff the write succeeds.
    Notify {
        /// Notification method.
        method: String,
        /// Notification parameters.
        params: Option<serde_json::Value>,
    },
    /// Send `prompts/list`; passes iff `result.prompts` is present.
    ListPrompts,
    /// Check that every named prompt appeared in the last listing.
    ExpectPrompts(Vec<String>),
    /// Send `prompts/get`; passes iff the result carries `messages`.
    GetPrompt {
        /// Prompt name.
        name: String,
        /// Prompt arguments, if any.
        arguments: Option<PromptArguments>,
    },
}

impl StepAction {
    /// The protocol method this action sends, if any.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Initialize(_) => Some("initialize"),
            Self::Notify { method, .. } => Some(method),
            Self::ListPrompts => Some("prompts/list"),
            Self::ExpectPrompts(_) => None,
            Self::GetPrompt { .. } => Some("prompts/get"),
        }
    }
}

/// Condition over earlier results deciding whether a step runs.
///
/// A step whose gate is closed is left out of the report entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Always run.
    Always,
    /// Run only if a prompt listing succeeded earlier.
    ListingSucceeded,
    /// Run only if the named prompt appeared in an earlier listing.
    PromptListed(String),
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("always"),
            Self::ListingSucceeded => f.write_str("prompt listing succeeded"),
            Self::PromptListed(name) => write!(f, "prompt '{name}' listed"),
        }
    }
}

/// One named step of a scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct TestStep {
    /// Name shown in the report.
    pub name: String,
    /// What the step does.
    pub action: StepAction,
    /// When the step runs.
    pub gate: Gate,
    /// Whether a failure of this step abandons the rest of the scenario.
    pub fatal: bool,
}

impl TestStep {
    /// Create an ungated, non-fatal step.
    pub fn new(name: impl Into<String>, action: StepAction) -> Self {
        Self {
            name: name.into(),
            action,
            gate: Gate::Always,
            fatal: false,
        }
    }

    /// Set the gate.
    #[must_use]
    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }

    /// Make a failure of this step end the scenario.
    #[must_use]
    pub const fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }
}

/// A named, ordered sequence of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct TestScenario {
    /// Scenario name.
    pub name: String,
    /// Scenario description.
    pub description: Option<String>,
    /// Steps to execute, in order.
    pub steps: Vec<TestStep>,
}

impl TestScenario {
    /// Create an empty scenario.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps: Vec::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a step.
    #[must_use]
    pub fn step(mut self, step: TestStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Append the `initialize` handshake. Its failure ends the scenario.
    #[must_use]
    pub fn initialize(self, name: impl Into<String>, params: InitializeParams) -> Self {
        let step = TestStep::new(name, StepAction::Initialize(params));
        self.step(step.fatal())
    }

    /// Append the `notifications/initialized` notification.
    #[must_use]
    pub fn initialized(self, name: impl Into<String>) -> Self {
        self.step(TestStep::new(
            name,
            StepAction::Notify {
                method: "notifications/initialized".to_string(),
                params: None,
            },
        ))
    }

    /// Append a `prompts/list` step.
    #[must_use]
    pub fn list_prompts(self, name: impl Into<String>) -> Self {
        self.step(TestStep::new(name, StepAction::ListPrompts))
    }

    /// Append a check that the listing contains every expected prompt.
    /// Runs only if a listing succeeded.
    #[must_use]
    pub fn expect_prompts<I, S>(self, name: impl Into<String>, expected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let expected = expected.into_iter().map(Into::into).collect();
        self.step(
            TestStep::new(name, StepAction::ExpectPrompts(expected)).gated(Gate::ListingSucceeded),
        )
    }

    /// Append a `prompts/get` step without arguments.
    #[must_use]
    pub fn get_prompt(self, name: impl Into<String>, prompt: impl Into<String>) -> Self {
        self.step(TestStep::new(
            name,
            StepAction::GetPrompt {
                name: prompt.into(),
                arguments: None,
            },
        ))
    }

    /// Append a `prompts/get` step with arguments. Runs only if the prompt
    /// appeared in an earlier listing.
    #[must_use]
    pub fn get_prompt_with(
        self,
        name: impl Into<String>,
        prompt: impl Into<String>,
        arguments: PromptArguments,
    ) -> Self {
        let prompt = prompt.into();
        self.step(
            TestStep::new(
                name,
                StepAction::GetPrompt {
                    name: prompt.clone(),
                    arguments: Some(arguments),
                },
            )
            .gated(Gate::PromptListed(prompt)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpcheck_core::capability::ClientInfo;

    #[test]
    fn test_scenario_builder() {
        let params = InitializeParams::new(ClientInfo::new("c", "1"));
        let scenario = TestScenario::new("prompts")
            .description("prompt catalog checks")
            .initialize("Initialize", params)
            .initialized("Initialized")
            .list_prompts("List Prompts")
            .expect_prompts("Key Prompts", ["a", "b"])
            .get_prompt("Get Prompt", "a")
            .get_prompt_with("Dynamic", "b", PromptArguments::new());

        assert_eq!(scenario.steps.len(), 6);
        assert!(scenario.steps[0].fatal);
        assert!(!scenario.steps[1].fatal);
        assert_eq!(scenario.steps[3].gate, Gate::ListingSucceeded);
        assert_eq!(scenario.steps[4].gate, Gate::Always);
        assert_eq!(scenario.steps[5].gate, Gate::PromptListed("b".to_string()));
        assert_eq!(
            scenario.steps[1].action.method(),
            Some("notifications/initialized")
        );
        assert_eq!(scenario.steps[3].action.method(), None);
    }

    #[test]
    fn test_gate_display() {
        assert_eq!(
            Gate::PromptListed("x".to_string()).to_string(),
            "prompt 'x' listed"
        );
    }
}
