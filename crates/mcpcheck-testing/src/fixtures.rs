//! Built-in client identity, expectations and scenarios.

use crate::scenario::{PromptArguments, TestScenario};
use mcpcheck_core::capability::{ClientInfo, InitializeParams};

/// The prompt every conforming server exposes without arguments.
pub const SYSTEM_PROMPT: &str = "gemara-system-prompt";

/// The prompt exercised with scope arguments.
pub const POLICY_PROMPT: &str = "create_layer3_policy_with_layer1_mappings";

/// Prompts a conforming server must list.
pub const EXPECTED_PROMPTS: [&str; 3] = [
    SYSTEM_PROMPT,
    POLICY_PROMPT,
    "gemara_layer1_to_layer3_policy",
];

/// Scopes the policy prompt is rendered with, each in its own step.
pub const SCOPES: [&str; 2] = ["API Security", "Container Security"];

/// The identity the harness presents during `initialize`.
#[must_use]
pub fn test_client_info() -> ClientInfo {
    ClientInfo::new("test-client", "1.0.0")
}

/// `initialize` parameters: protocol 2024-11-05, no capabilities.
#[must_use]
pub fn initialize_params() -> InitializeParams {
    InitializeParams::new(test_client_info())
}

/// Arguments for the policy prompt with the given scope.
#[must_use]
pub fn scope_arguments(scope: &str) -> PromptArguments {
    PromptArguments::from([
        ("scope".to_string(), scope.to_string()),
        ("organization_context".to_string(), "Test organization".to_string()),
        ("risk_appetite".to_string(), "Moderate".to_string()),
    ])
}

/// Handshake, listing and one prompt retrieval.
#[must_use]
pub fn smoke_scenario() -> TestScenario {
    TestScenario::new("smoke")
        .description("handshake and a single prompt retrieval")
        .initialize("Initialize", initialize_params())
        .initialized("Initialized Notification")
        .list_prompts("List Prompts")
        .get_prompt("Get Gemara System Prompt", SYSTEM_PROMPT)
}

/// Prompt catalog and parameterized rendering.
#[must_use]
pub fn prompts_scenario() -> TestScenario {
    with_scoped_prompts(
        TestScenario::new("prompts")
            .description("prompt catalog and parameterized rendering")
            .initialize("Initialize", initialize_params())
            .list_prompts("List Prompts")
            .expect_prompts("Key Prompts Exist", EXPECTED_PROMPTS),
    )
}

/// Every step, in protocol order.
#[must_use]
pub fn full_scenario() -> TestScenario {
    with_scoped_prompts(
        TestScenario::new("full")
            .description(
                "handshake, catalog, and prompt retrieval with and without arguments",
            )
            .initialize("Initialize", initialize_params())
            .initialized("Initialized Notification")
            .list_prompts("List Prompts")
            .expect_prompts("Key Prompts Exist", EXPECTED_PROMPTS)
            .get_prompt("Get Gemara System Prompt", SYSTEM_PROMPT),
    )
}

fn with_scoped_prompts(scenario: TestScenario) -> TestScenario {
    SCOPES.iter().fold(scenario, |scenario, scope| {
        scenario.get_prompt_with(
            format!("Dynamic Scope ({scope})"),
            POLICY_PROMPT,
            scope_arguments(scope),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{Gate, StepAction};

    #[test]
    fn test_initialize_params_wire_shape() {
        let value = serde_json::to_value(initialize_params()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0.0"}
            })
        );
    }

    #[test]
    fn test_full_scenario_layout() {
        let scenario = full_scenario();
        let names: Vec<&str> = scenario.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Initialize",
                "Initialized Notification",
                "List Prompts",
                "Key Prompts Exist",
                "Get Gemara System Prompt",
                "Dynamic Scope (API Security)",
                "Dynamic Scope (Container Security)",
            ]
        );
        assert!(scenario.steps[0].fatal);
        assert!(scenario.steps[1..].iter().all(|s| !s.fatal));
        for step in &scenario.steps[5..] {
            assert_eq!(step.gate, Gate::PromptListed(POLICY_PROMPT.to_string()));
        }
    }

    #[test]
    fn test_scope_arguments() {
        let args = scope_arguments("API Security");
        assert_eq!(args["scope"], "API Security");
        assert_eq!(args["organization_context"], "Test organization");
        assert_eq!(args["risk_appetite"], "Moderate");

        let StepAction::GetPrompt { arguments, .. } = &prompts_scenario().steps[3].action else {
            panic!("expected a prompt retrieval");
        };
        assert_eq!(arguments.as_ref(), Some(&args));
    }

    #[test]
    fn test_smoke_scenario_has_no_gated_steps() {
        let smoke = smoke_scenario();
        assert!(smoke.steps.iter().all(|s| s.gate == Gate::Always));
    }
}
