//! JSON-RPC 2.0 envelopes exchanged with the server under test.
//!
//! Every frame on the wire is one of:
//!
//! - **Request**: a method call expecting a response, carrying an `id`
//! - **Response**: a reply echoing the request's `id` with a `result` or `error`
//! - **Notification**: a one-way message without an `id`
//!
//! The harness only ever produces requests and notifications and only ever
//! consumes responses, so [`Response`] is deliberately lenient about what it
//! accepts: a missing or `null` id decodes, and correlation is left to the
//! exchange engine.

use crate::error::JsonRpcError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// The JSON-RPC version string. Always "2.0".
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC request ID.
///
/// The harness issues numeric ids; string ids are accepted when decoding
/// replies so that a misbehaving server can be reported precisely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(u64),
    /// String request ID.
    String(String),
}

impl RequestId {
    /// Get the numeric value, if this is a numeric id.
    #[must_use]
    pub const fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(_) => None,
        }
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self::Number(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self::String(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::String(id.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "\"{s}\""),
        }
    }
}

/// A JSON-RPC 2.0 request message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// The JSON-RPC version. Always "2.0".
    pub jsonrpc: Cow<'static, str>,
    /// The request ID for correlation.
    pub id: RequestId,
    /// The method to invoke.
    pub method: Cow<'static, str>,
    /// The method parameters, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Request {
    /// Create a new request with no parameters.
    #[must_use]
    pub fn new(method: impl Into<Cow<'static, str>>, id: impl Into<RequestId>) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            id: id.into(),
            method: method.into(),
            params: None,
        }
    }

    /// Set the parameters for this request. `None` leaves the member out.
    #[must_use]
    pub fn params(mut self, params: impl Into<Option<serde_json::Value>>) -> Self {
        self.params = params.into();
        self
    }

    /// Get the method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

/// A JSON-RPC 2.0 notification message.
///
/// Notifications carry no id and are never answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// The JSON-RPC version. Always "2.0".
    pub jsonrpc: Cow<'static, str>,
    /// The notification method.
    pub method: Cow<'static, str>,
    /// The notification parameters, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Notification {
    /// Create a new notification with no parameters.
    #[must_use]
    pub fn new(method: impl Into<Cow<'static, str>>) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            method: method.into(),
            params: None,
        }
    }

    /// Set the parameters for this notification. `None` leaves the member out.
    #[must_use]
    pub fn params(mut self, params: impl Into<Option<serde_json::Value>>) -> Self {
        self.params = params.into();
        self
    }

    /// Get the method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

/// A JSON-RPC 2.0 response message.
///
/// A well-formed response has exactly one of `result` or `error`. A JSON
/// `null` result decodes as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// The JSON-RPC version. Always "2.0".
    pub jsonrpc: Cow<'static, str>,
    /// The id of the request being answered. `None` when the server sent
    /// `null` or omitted it, which it does for unparseable requests.
    #[serde(default)]
    pub id: Option<RequestId>,
    /// The result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// The error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// Classification of a decoded response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome<'a> {
    /// The server answered with a result.
    Success(&'a serde_json::Value),
    /// The server answered with an error object.
    Failure(&'a JsonRpcError),
    /// The server answered with neither.
    Empty,
}

impl Response {
    /// Create a successful response.
    #[must_use]
    pub fn success(id: impl Into<RequestId>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            id: Some(id.into()),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response. `id` is `None` when the request could not
    /// be parsed far enough to recover it.
    #[must_use]
    pub fn error(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Check if this response indicates success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_some() && self.error.is_none()
    }

    /// Classify the response. An error member wins over a result member.
    #[must_use]
    pub fn outcome(&self) -> Outcome<'_> {
        match (&self.error, &self.result) {
            (Some(error), _) => Outcome::Failure(error),
            (None, Some(result)) => Outcome::Success(result),
            (None, None) => Outcome::Empty,
        }
    }

    /// Check whether this response answers the request with the given id.
    #[must_use]
    pub fn answers(&self, id: &RequestId) -> bool {
        self.id.as_ref() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_serializes_on_one_line() {
        let request = Request::new("prompts/get", 7u64).params(json!({
            "name": "gemara-system-prompt",
            "arguments": {"scope": "multi\nline"}
        }));
        let line = serde_json::to_string(&request).unwrap();
        assert!(!line.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 7);
        assert_eq!(value["method"], "prompts/get");
        assert_eq!(value["params"]["arguments"]["scope"], "multi\nline");
    }

    #[test]
    fn test_request_without_params_omits_member() {
        let line = serde_json::to_string(&Request::new("prompts/list", 3u64)).unwrap();
        assert_eq!(line, r#"{"jsonrpc":"2.0","id":3,"method":"prompts/list"}"#);
    }

    #[test]
    fn test_notification_has_no_id() {
        let value = serde_json::to_value(Notification::new("notifications/initialized")).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["method"], "notifications/initialized");
    }

    #[test]
    fn test_response_outcomes() {
        let ok: Response =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":{"a":1}}"#).unwrap();
        assert_eq!(ok.outcome(), Outcome::Success(&json!({"a": 1})));
        assert!(ok.answers(&RequestId::Number(1)));

        let failed: Response = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32601,"message":"nope"}}"#,
        )
        .unwrap();
        match failed.outcome() {
            Outcome::Failure(error) => assert_eq!(error.message, "nope"),
            other => panic!("expected failure, got {other:?}"),
        }

        let empty: Response =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":3,"result":null}"#).unwrap();
        assert_eq!(empty.outcome(), Outcome::Empty);
    }

    #[test]
    fn test_error_wins_over_result() {
        let both: Response = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"result":{},"error":{"code":1,"message":"x"}}"#,
        )
        .unwrap();
        assert!(matches!(both.outcome(), Outcome::Failure(_)));
        assert!(!both.is_success());
    }

    #[test]
    fn test_null_id_decodes() {
        let response: Response = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"parse error"}}"#,
        )
        .unwrap();
        assert_eq!(response.id, None);
        assert!(!response.answers(&RequestId::Number(1)));
    }

    #[test]
    fn test_string_id_never_matches_numeric() {
        let response: Response =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"1","result":{}}"#).unwrap();
        assert_eq!(response.id, Some(RequestId::from("1")));
        assert!(!response.answers(&RequestId::Number(1)));
    }

    #[test]
    fn test_missing_jsonrpc_is_rejected() {
        assert!(
            serde_json::from_str::<Response>(r#"{"id":1,"result":{}}"#).is_err()
        );
    }

    #[test]
    fn test_request_id_display() {
        assert_eq!(RequestId::Number(4).to_string(), "4");
        assert_eq!(RequestId::from("abc").to_string(), "\"abc\"");
        assert_eq!(RequestId::Number(4).as_number(), Some(4));
    }
}
