//! Shape checks applied to server replies.
//!
//! Each helper returns a [`StepFailure`] describing the first problem found
//! rather than panicking, so the runner can record it and move on.

use crate::error::StepFailure;
use mcpcheck_core::protocol::{Outcome, Response};
use mcpcheck_core::types::{GetPromptResult, ListPromptsResult};
use serde_json::Value;

/// Extract the `result` of a reply.
///
/// An `error` member fails with the server's error; a reply with neither
/// member fails as an assertion.
pub fn require_result(response: &Response) -> Result<&Value, StepFailure> {
    match response.outcome() {
        Outcome::Success(result) => Ok(result),
        Outcome::Failure(error) => Err(StepFailure::Server(error.clone())),
        Outcome::Empty => Err(StepFailure::assertion(
            "response carries neither result nor error",
        )),
    }
}

/// Names in `expected` that are absent from `actual`.
///
/// Ordered as in `expected`; a name repeated in `expected` is reported once.
/// Extra names in `actual` are ignored.
#[must_use]
pub fn missing_names<E, A>(expected: &[E], actual: &[A]) -> Vec<String>
where
    E: AsRef<str>,
    A: AsRef<str>,
{
    let mut missing: Vec<String> = Vec::new();
    for name in expected.iter().map(AsRef::as_ref) {
        let listed = actual.iter().any(|a| a.as_ref() == name);
        if !listed && !missing.iter().any(|m| m == name) {
            missing.push(name.to_string());
        }
    }
    missing
}

/// Decode a `prompts/list` result. Requires a `prompts` array, which may be
/// empty.
pub fn require_prompts(result: &Value) -> Result<ListPromptsResult, StepFailure> {
    match result.get("prompts") {
        Some(Value::Array(_)) => {}
        Some(other) => {
            return Err(StepFailure::assertion(format!(
                "result.prompts is not an array: {other}"
            )));
        }
        None => return Err(StepFailure::assertion("result has no prompts")),
    }
    serde_json::from_value(result.clone())
        .map_err(|e| StepFailure::assertion(format!("invalid prompt listing: {e}")))
}

/// Decode a `prompts/get` result. Requires a `messages` array, which may be
/// empty, whose elements each carry a string `role`.
pub fn require_messages(result: &Value) -> Result<GetPromptResult, StepFailure> {
    let messages = match result.get("messages") {
        Some(Value::Array(messages)) => messages,
        Some(other) => {
            return Err(StepFailure::assertion(format!(
                "result.messages is not an array: {other}"
            )));
        }
        None => return Err(StepFailure::assertion("result has no messages")),
    };
    if let Some(index) = messages
        .iter()
        .position(|m| !m.get("role").is_some_and(Value::is_string))
    {
        return Err(StepFailure::assertion(format!(
            "message {index} has no role"
        )));
    }
    serde_json::from_value(result.clone())
        .map_err(|e| StepFailure::assertion(format!("invalid prompt payload: {e}")))
}
