//! Transport error types.

use mcpcheck_core::protocol::RequestId;
use miette::Diagnostic;
use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a [`TransportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The server process could not be started.
    Launch,
    /// The server closed its end of the channel.
    ConnectionClosed,
    /// A frame could not be decoded.
    InvalidMessage,
    /// A decoded frame violated the request/response contract.
    ProtocolViolation,
    /// The server did not answer in time.
    Timeout,
    /// Any other I/O failure.
    Io,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Launch => "launch",
            Self::ConnectionClosed => "connection closed",
            Self::InvalidMessage => "invalid message",
            Self::ProtocolViolation => "protocol violation",
            Self::Timeout => "timeout",
            Self::Io => "io",
        };
        f.write_str(s)
    }
}

/// Errors that can occur while talking to the server under test.
#[derive(Error, Diagnostic, Debug)]
pub enum TransportError {
    /// The server executable could not be started.
    #[error("failed to launch server '{program}': {source}")]
    #[diagnostic(
        code(mcpcheck::transport::launch),
        help("check that the server path exists and is executable, or pass --build")
    )]
    Launch {
        /// The program that was being launched.
        program: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The output stream ended before a frame was available.
    #[error("no response from server")]
    #[diagnostic(
        code(mcpcheck::transport::no_response),
        help("the server closed its stdout; its stderr usually says why")
    )]
    NoResponse,

    /// A frame was read but is not a JSON-RPC response.
    #[error("malformed json in server response: {source}")]
    #[diagnostic(code(mcpcheck::transport::malformed_json))]
    MalformedJson {
        /// The offending frame, lossily decoded as UTF-8.
        raw: String,
        /// The decoding error.
        #[source]
        source: serde_json::Error,
    },

    /// The reply does not carry the id of the request it follows.
    #[error("response id {} does not match request id {expected}", display_id(.actual.as_ref()))]
    #[diagnostic(
        code(mcpcheck::transport::id_mismatch),
        help("the server answered out of order or dropped a reply")
    )]
    IdMismatch {
        /// The id of the outstanding request.
        expected: RequestId,
        /// The id carried by the reply.
        actual: Option<RequestId>,
    },

    /// An operation did not complete within its bound.
    #[error("{operation} timed out after {duration:?}")]
    #[diagnostic(code(mcpcheck::transport::timeout))]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// How long the operation waited.
        duration: Duration,
    },

    /// A frame exceeded the size limit.
    #[error("message too large: {size} bytes (max: {max})")]
    #[diagnostic(code(mcpcheck::transport::message_too_large))]
    MessageTooLarge {
        /// Bytes read before giving up.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// The channel was already closed by the harness.
    #[error("not connected")]
    #[diagnostic(code(mcpcheck::transport::not_connected))]
    NotConnected,

    /// I/O error on one of the server's streams.
    #[error("I/O error: {0}")]
    #[diagnostic(code(mcpcheck::transport::io))]
    Io(#[from] std::io::Error),

    /// An outgoing message could not be serialized.
    #[error("JSON error: {0}")]
    #[diagnostic(code(mcpcheck::transport::json))]
    Json(#[from] serde_json::Error),
}

fn display_id(id: Option<&RequestId>) -> String {
    id.map_or_else(|| "null".to_string(), ToString::to_string)
}

impl TransportError {
    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Get the transport error kind.
    #[must_use]
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            Self::Launch { .. } => TransportErrorKind::Launch,
            Self::NoResponse | Self::NotConnected => TransportErrorKind::ConnectionClosed,
            Self::MalformedJson { .. } | Self::MessageTooLarge { .. } | Self::Json(_) => {
                TransportErrorKind::InvalidMessage
            }
            Self::IdMismatch { .. } => TransportErrorKind::ProtocolViolation,
            Self::Timeout { .. } => TransportErrorKind::Timeout,
            Self::Io(e) => match e.kind() {
                std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::UnexpectedEof => TransportErrorKind::ConnectionClosed,
                std::io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
                _ => TransportErrorKind::Io,
            },
        }
    }

    /// The raw frame attached to a decoding failure, for diagnostics.
    #[must_use]
    pub fn raw_frame(&self) -> Option<&str> {
        match self {
            Self::MalformedJson { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            TransportError::NoResponse.kind(),
            TransportErrorKind::ConnectionClosed
        );
        assert_eq!(
            TransportError::timeout("receive", Duration::from_secs(1)).kind(),
            TransportErrorKind::Timeout
        );
        assert_eq!(
            TransportError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)).kind(),
            TransportErrorKind::ConnectionClosed
        );
        assert_eq!(
            TransportError::IdMismatch {
                expected: RequestId::Number(1),
                actual: None,
            }
            .kind(),
            TransportErrorKind::ProtocolViolation
        );
    }

    #[test]
    fn test_id_mismatch_message() {
        let err = TransportError::IdMismatch {
            expected: RequestId::Number(2),
            actual: Some(RequestId::Number(3)),
        };
        assert_eq!(err.to_string(), "response id 3 does not match request id 2");

        let err = TransportError::IdMismatch {
            expected: RequestId::Number(2),
            actual: None,
        };
        assert_eq!(
            err.to_string(),
            "response id null does not match request id 2"
        );
    }

    #[test]
    fn test_malformed_json_keeps_raw_frame() {
        let source = serde_json::from_str::<serde_json::Value>("nope").unwrap_err();
        let err = TransportError::MalformedJson {
            raw: "nope".to_string(),
            source,
        };
        assert_eq!(err.raw_frame(), Some("nope"));
        assert!(err.to_string().starts_with("malformed json"));
    }
}
