//! # mcpcheck-core
//!
//! Core types for the mcpcheck conformance harness.
//!
//! This crate holds everything that describes what travels over the wire,
//! independent of how it travels:
//!
//! - **Protocol types**: JSON-RPC 2.0 request/response/notification envelopes
//! - **Handshake types**: `initialize` parameters and the identity structures
//! - **Prompt types**: prompt descriptors, prompt payloads and their content
//! - **Error object**: the JSON-RPC error member of a failed response
//!
//! It has no runtime dependency; the transport and scenario crates build on it.
//!
//! # Protocol Version
//!
//! The harness speaks MCP protocol version **2024-11-05** when it initializes
//! a server.
//!
//! # Example
//!
//! ```rust
//! use mcpcheck_core::protocol::{Request, Response};
//! use mcpcheck_core::types::PromptContent;
//!
//! let request = Request::new("prompts/list", 1u64);
//! assert_eq!(request.method(), "prompts/list");
//!
//! let json = r#"{"jsonrpc":"2.0","id":1,"result":{"prompts":[]}}"#;
//! let response: Response = serde_json::from_str(json).unwrap();
//! assert!(response.is_success());
//!
//! let content = PromptContent::from(serde_json::json!({"type": "text", "text": "hi"}));
//! assert_eq!(content.to_text(), "hi");
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_name_repetitions)]

pub mod capability;
pub mod error;
pub mod protocol;
pub mod types;

pub use capability::{ClientInfo, InitializeParams, InitializeResult, PROTOCOL_VERSION, ServerInfo};
pub use error::JsonRpcError;
pub use protocol::{JSONRPC_VERSION, Notification, Outcome, Request, RequestId, Response};
pub use types::{
    ContentBlock, GetPromptResult, ListPromptsResult, Prompt, PromptArgument, PromptContent,
    PromptMessage, normalize_content,
};
