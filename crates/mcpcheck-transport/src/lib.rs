//! Child-process transport and exchange engine for mcpcheck.
//!
//! This crate moves JSON-RPC frames between the harness and the server under
//! test. It is split in three layers:
//!
//! | Layer | Type | Role |
//! |-------|------|------|
//! | Process controller | [`process::ServerProcess`] | start, own the stdio pipes, stop |
//! | Framing | [`stdio::LineChannel`] | newline-delimited frames over any byte stream |
//! | Exchange engine | [`exchange::Exchange`] | ids, encoding, decoding, correlation, read timeout |
//!
//! # Example
//!
//! ```no_run
//! use mcpcheck_transport::{Exchange, ServerProcess};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), mcpcheck_transport::TransportError> {
//!     let mut server = ServerProcess::builder("./gemara-mcp-server").spawn().await?;
//!     let mut exchange = Exchange::new(&mut server);
//!
//!     let reply = exchange.exchange("prompts/list", None).await?;
//!     println!("{:?}", reply.result);
//!
//!     server.stop().await;
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod exchange;
pub mod process;
pub mod stdio;
pub mod traits;

pub use error::{TransportError, TransportErrorKind};
pub use exchange::{DEFAULT_READ_TIMEOUT, Exchange, normalize_content};
pub use process::{DEFAULT_SHUTDOWN_TIMEOUT, ServerProcess, ServerProcessBuilder};
pub use stdio::{LineChannel, MAX_MESSAGE_SIZE};
pub use traits::Transport;
