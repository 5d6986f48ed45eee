//! Prompt types for MCP servers.
//!
//! Prompts are named, described, parameterizable templates a server exposes
//! through `prompts/list` and renders through `prompts/get`.

use super::content::PromptContent;
use serde::{Deserialize, Serialize};

/// A prompt definition exposed by an MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    /// Name of the prompt, unique within a listing.
    pub name: String,
    /// Human-readable description of what the prompt does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Arguments that the prompt accepts, in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<PromptArgument>>,
}

impl Prompt {
    /// Create a new prompt with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            arguments: None,
        }
    }

    /// Set the prompt description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add an argument to the prompt.
    #[must_use]
    pub fn argument(mut self, arg: PromptArgument) -> Self {
        self.arguments.get_or_insert_with(Vec::new).push(arg);
        self
    }

    /// Names of the declared arguments, in order.
    #[must_use]
    pub fn argument_names(&self) -> Vec<&str> {
        self.arguments
            .iter()
            .flatten()
            .map(|arg| arg.name.as_str())
            .collect()
    }
}

/// An argument that a prompt accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    /// Name of the argument.
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether this argument is required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl PromptArgument {
    /// Create a required argument.
    #[must_use]
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: Some(true),
        }
    }

    /// Create an optional argument.
    #[must_use]
    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: Some(false),
        }
    }
}

/// The result of `prompts/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPromptsResult {
    /// The listed prompts.
    pub prompts: Vec<Prompt>,
    /// Pagination cursor for the next page, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl ListPromptsResult {
    /// Names of the listed prompts, in listing order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.prompts.iter().map(|p| p.name.clone()).collect()
    }

    /// Names that occur more than once in the listing.
    #[must_use]
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        let mut duplicates = Vec::new();
        for prompt in &self.prompts {
            if !seen.insert(prompt.name.as_str()) && !duplicates.contains(&prompt.name.as_str()) {
                duplicates.push(prompt.name.as_str());
            }
        }
        duplicates
    }
}

/// A message in a rendered prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// The role of the message sender (`user`, `assistant`, ...).
    pub role: String,
    /// The message content, in whichever shape the server chose.
    #[serde(default)]
    pub content: PromptContent,
}

impl PromptMessage {
    /// Create a message with the given role and content.
    pub fn new(role: impl Into<String>, content: impl Into<PromptContent>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// The result of `prompts/get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPromptResult {
    /// Name of the rendered prompt, if the server echoes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional description of the rendered prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The prompt messages, in order.
    pub messages: Vec<PromptMessage>,
}
