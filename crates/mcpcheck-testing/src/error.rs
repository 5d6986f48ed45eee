//! Why a step failed.

use mcpcheck_core::JsonRpcError;
use mcpcheck_transport::TransportError;
use thiserror::Error;

/// Characters of an offending raw frame kept in a step's error text.
const RAW_FRAME_PREVIEW: usize = 200;

/// The reason a single step failed.
///
/// None of these end a scenario on their own; only a failure in a step marked
/// fatal does.
#[derive(Debug, Error)]
pub enum StepFailure {
    /// The exchange itself failed: no reply, undecodable reply, id mismatch,
    /// timeout or a broken pipe.
    #[error("{}", describe_transport(.0))]
    Transport(#[from] TransportError),

    /// The server answered with an error object. Displays the server's
    /// message verbatim.
    #[error("{}", .0.message)]
    Server(JsonRpcError),

    /// The reply decoded but did not have the expected shape or content.
    #[error("{0}")]
    Assertion(String),
}

impl StepFailure {
    /// Build an assertion failure.
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion(message.into())
    }

    /// The transport error behind this failure, if any.
    #[must_use]
    pub const fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

fn describe_transport(error: &TransportError) -> String {
    match error.raw_frame() {
        Some(raw) => format!(
            "{error}; raw frame: {}",
            mcpcheck_core::types::preview(raw, RAW_FRAME_PREVIEW)
        ),
        None => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_is_verbatim() {
        let failure = StepFailure::Server(JsonRpcError::invalid_params("prompt not found: nope"));
        assert_eq!(failure.to_string(), "prompt not found: nope");
        assert!(failure.transport().is_none());
    }

    #[test]
    fn test_malformed_frame_is_quoted() {
        let source = serde_json::from_str::<serde_json::Value>("oops").unwrap_err();
        let failure = StepFailure::from(TransportError::MalformedJson {
            raw: "oops".to_string(),
            source,
        });
        let text = failure.to_string();
        assert!(text.starts_with("malformed json"));
        assert!(text.ends_with("raw frame: oops"));
    }
}
