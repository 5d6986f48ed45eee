//! Handshake types for the `initialize` exchange.
//!
//! The harness sends [`InitializeParams`] and only loosely inspects what comes
//! back: [`InitializeResult`] decodes every member as optional so that a
//! server's identity can be echoed for diagnostics even when the rest of its
//! reply is unusual.

use serde::{Deserialize, Serialize};

/// The MCP protocol version requested by the harness.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Identity of the client sent during initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    pub version: String,
}

impl ClientInfo {
    /// Create client info.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Identity of the server, as echoed in the `initialize` result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    #[serde(default)]
    pub name: String,
    /// Server version.
    #[serde(default)]
    pub version: String,
}

impl std::fmt::Display for ServerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = if self.name.is_empty() { "unknown" } else { &self.name };
        let version = if self.version.is_empty() {
            "unknown"
        } else {
            &self.version
        };
        write!(f, "{name} v{version}")
    }
}

/// Parameters of the `initialize` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by the client.
    pub protocol_version: String,
    /// Client capabilities. The harness advertises none.
    pub capabilities: serde_json::Value,
    /// Client identity.
    pub client_info: ClientInfo,
}

impl InitializeParams {
    /// Create parameters for the given client at [`PROTOCOL_VERSION`] with
    /// empty capabilities.
    #[must_use]
    pub fn new(client_info: ClientInfo) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: serde_json::Value::Object(serde_json::Map::new()),
            client_info,
        }
    }
}

/// The `initialize` result, decoded leniently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Protocol version chosen by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    /// Server capabilities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<serde_json::Value>,
    /// Server identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_info: Option<ServerInfo>,
    /// Usage instructions offered by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_initialize_params_wire_shape() {
        let params = InitializeParams::new(ClientInfo::new("test-client", "1.0.0"));
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0.0"}
            })
        );
    }

    #[test]
    fn test_initialize_result_is_lenient() {
        let result: InitializeResult = serde_json::from_value(json!({
            "protocolVersion": "2024-11-05",
            "serverInfo": {"name": "gemara-mcp-server"},
            "somethingElse": true
        }))
        .unwrap();
        let info = result.server_info.unwrap();
        assert_eq!(info.to_string(), "gemara-mcp-server vunknown");
        assert!(result.capabilities.is_none());
    }
}
