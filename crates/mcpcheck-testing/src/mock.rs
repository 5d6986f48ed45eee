//! A small stdio prompt server for exercising the harness.
//!
//! [`MockPromptServer`] answers `initialize`, `prompts/list` and `prompts/get`
//! with the expected prompt catalog and ignores notifications. Its
//! [`MockMode`] makes it misbehave in one specific way so the harness's
//! failure handling can be tested against a real child process.
//!
//! The `mock-prompt-server` binary runs it over stdin/stdout, reading the
//! mode from [`MODE_ENV`].

use crate::fixtures::{POLICY_PROMPT, SYSTEM_PROMPT};
use mcpcheck_core::JsonRpcError;
use mcpcheck_core::capability::PROTOCOL_VERSION;
use mcpcheck_core::error::codes;
use mcpcheck_core::protocol::{Request, RequestId, Response};
use mcpcheck_core::types::{
    ContentBlock, GetPromptResult, ListPromptsResult, Prompt, PromptArgument, PromptContent,
    PromptMessage,
};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Environment variable selecting the mock's [`MockMode`].
pub const MODE_ENV: &str = "MOCK_SERVER_MODE";

/// Name the mock reports in `serverInfo`.
pub const SERVER_NAME: &str = "mock-prompt-server";

/// How the mock behaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MockMode {
    /// Answer everything correctly.
    #[default]
    Normal,
    /// List only the system prompt.
    Minimal,
    /// Read requests but never answer.
    Silent,
    /// Answer every request with a line that is not JSON.
    Garbage,
    /// Answer with the request id plus one.
    WrongId,
    /// Exit without reading anything.
    Exit,
    /// Answer `prompts/get` with an error object.
    Error,
    /// Ignore SIGTERM and keep running after stdin closes.
    IgnoreTerm,
}

impl MockMode {
    /// Read the mode from [`MODE_ENV`], defaulting to `Normal`.
    ///
    /// # Errors
    ///
    /// Returns the unrecognised value.
    pub fn from_env() -> Result<Self, UnknownMode> {
        match std::env::var(MODE_ENV) {
            Ok(value) => value.parse(),
            Err(_) => Ok(Self::Normal),
        }
    }

    /// The mode's name as accepted by [`MODE_ENV`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Minimal => "minimal",
            Self::Silent => "silent",
            Self::Garbage => "garbage",
            Self::WrongId => "wrong-id",
            Self::Exit => "exit",
            Self::Error => "error",
            Self::IgnoreTerm => "ignore-term",
        }
    }
}

impl fmt::Display for MockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unrecognised [`MODE_ENV`] value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mock server mode '{0}'")]
pub struct UnknownMode(pub String);

impl FromStr for MockMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "normal" => Ok(Self::Normal),
            "minimal" => Ok(Self::Minimal),
            "silent" => Ok(Self::Silent),
            "garbage" => Ok(Self::Garbage),
            "wrong-id" => Ok(Self::WrongId),
            "exit" => Ok(Self::Exit),
            "error" => Ok(Self::Error),
            "ignore-term" => Ok(Self::IgnoreTerm),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// The mock server's request handling.
#[derive(Debug, Clone)]
pub struct MockPromptServer {
    mode: MockMode,
    prompts: Vec<Prompt>,
}

impl MockPromptServer {
    /// Create a server in the given mode.
    #[must_use]
    pub fn new(mode: MockMode) -> Self {
        let mut prompts = vec![
            Prompt::new(SYSTEM_PROMPT).description("System prompt for Gemara policy authoring"),
            Prompt::new(POLICY_PROMPT)
                .description("Create a Layer 3 policy mapped to Layer 1 guidance")
                .argument(PromptArgument::required("scope", "Policy scope"))
                .argument(PromptArgument::optional(
                    "organization_context",
                    "Context about the organization",
                ))
                .argument(PromptArgument::optional("risk_appetite", "Risk appetite")),
            Prompt::new("gemara_layer1_to_layer3_policy")
                .description("Turn Layer 1 guidance into a Layer 3 policy")
                .argument(PromptArgument::optional(
                    "guidance",
                    "Layer 1 guidance identifier",
                )),
        ];
        if mode == MockMode::Minimal {
            prompts.truncate(1);
        }
        Self { mode, prompts }
    }

    /// The configured mode.
    #[must_use]
    pub const fn mode(&self) -> MockMode {
        self.mode
    }

    /// The prompts this server lists.
    #[must_use]
    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    /// Answer a request.
    #[must_use]
    pub fn handle(&self, request: &Request) -> Response {
        let id = request.id.clone();
        let outcome = match request.method() {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"prompts": {"listChanged": false}},
                "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")}
            })),
            "prompts/list" => to_value(&ListPromptsResult {
                prompts: self.prompts.clone(),
                next_cursor: None,
            }),
            "prompts/get" => self.get_prompt(request.params.as_ref()),
            other => Err(JsonRpcError::method_not_found(format!(
                "Method not found: {other}"
            ))),
        };
        match outcome {
            Ok(result) => Response::success(id, result),
            Err(error) => Response::error(Some(id), error),
        }
    }

    /// Turn one input line into the line to write back, if any.
    #[must_use]
    pub fn handle_frame(&self, line: &str) -> Option<String> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                let response = Response::error(None, JsonRpcError::parse_error(e.to_string()));
                return serde_json::to_string(&response).ok();
            }
        };
        // Notifications carry no id and are never answered.
        value.get("id")?;

        let response = match serde_json::from_value::<Request>(value) {
            Ok(request) => self.handle(&request),
            Err(e) => Response::error(
                None,
                JsonRpcError::new(codes::INVALID_REQUEST, e.to_string()),
            ),
        };

        match self.mode {
            MockMode::Silent => None,
            MockMode::Garbage => Some("this is not json".to_string()),
            MockMode::WrongId => {
                let mut response = response;
                response.id = match response.id {
                    Some(RequestId::Number(n)) => Some(RequestId::Number(n + 1)),
                    _ => Some(RequestId::Number(0)),
                };
                serde_json::to_string(&response).ok()
            }
            _ => serde_json::to_string(&response).ok(),
        }
    }

    /// Serve line frames from `reader` until it ends.
    ///
    /// In [`MockMode::Exit`] this returns immediately; in
    /// [`MockMode::IgnoreTerm`] it never returns.
    ///
    /// # Errors
    ///
    /// Returns I/O errors from reading or writing.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        if self.mode == MockMode::Exit {
            return Ok(());
        }

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(reply) = self.handle_frame(&line) {
                writer.write_all(reply.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        if self.mode == MockMode::IgnoreTerm {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    fn get_prompt(&self, params: Option<&Value>) -> Result<Value, JsonRpcError> {
        let name = params
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| JsonRpcError::invalid_params("missing prompt name"))?;
        let arguments = params.and_then(|p| p.get("arguments"));
        let argument = |key: &str| arguments.and_then(|a| a.get(key)).and_then(Value::as_str);

        if self.mode == MockMode::Error {
            return Err(JsonRpcError::internal_error(format!(
                "failed to render prompt '{name}'"
            )));
        }
        let Some(prompt) = self.prompts.iter().find(|p| p.name == name) else {
            return Err(JsonRpcError::invalid_params(format!(
                "prompt not found: {name}"
            )));
        };

        // One content shape per prompt so the harness sees all three.
        let messages = match prompt.name.as_str() {
            SYSTEM_PROMPT => vec![PromptMessage::new(
                "user",
                ContentBlock::text("You are an expert in the Gemara GRC layer model."),
            )],
            POLICY_PROMPT => {
                let scope = argument("scope").ok_or_else(|| {
                    JsonRpcError::invalid_params("missing required argument: scope")
                })?;
                let context = argument("organization_context").unwrap_or("unspecified");
                let risk = argument("risk_appetite").unwrap_or("unspecified");
                vec![
                    PromptMessage::new(
                        "user",
                        PromptContent::Blocks(vec![
                            ContentBlock::text(format!("Create a Layer 3 policy for {scope}.")),
                            ContentBlock::text(format!(
                                "Organization: {context}. Risk appetite: {risk}."
                            )),
                        ]),
                    ),
                    PromptMessage::new("assistant", "Which Layer 1 guidance should it map to?"),
                ]
            }
            _ => vec![PromptMessage::new(
                "user",
                format!(
                    "Convert guidance {} into a Layer 3 policy.",
                    argument("guidance").unwrap_or("of your choice")
                ),
            )],
        };

        to_value(&GetPromptResult {
            name: None,
            description: prompt.description.clone(),
            messages,
        })
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}
