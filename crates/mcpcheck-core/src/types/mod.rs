//! MCP prompt types consumed by the harness.
//!
//! - [`prompt`]: prompt descriptors (`prompts/list`) and payloads (`prompts/get`)
//! - [`content`]: the content carried by prompt messages and its normalization

pub mod content;
pub mod prompt;

pub use content::{ContentBlock, PromptContent, normalize_content, preview};
pub use prompt::{GetPromptResult, ListPromptsResult, Prompt, PromptArgument, PromptMessage};
