//! JSON-RPC 2.0 protocol types for MCP.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{McpError, Result};

/// JSON-RPC version string.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol version offered during the handshake.
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

/// Name this client identifies itself with.
pub const CLIENT_NAME: &str = "mcptool";

// ─────────────────────────────────────────────────────────────────────────────
// JSON-RPC Base Types
// ─────────────────────────────────────────────────────────────────────────────

/// A JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Request ID for correlating responses.
    pub id: u64,
    /// Method name to call.
    pub method: String,
    /// Method parameters (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request.
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC notification (no id, no response expected).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Method name.
    pub method: String,
    /// Method parameters (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Create a new notification.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC response.
///
/// The id is kept as a raw value: servers answer parse errors with `null`,
/// and replies to server-initiated requests echo whatever id the server used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Request ID this response is for.
    #[serde(default)]
    pub id: Value,
    /// Result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Build a success response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response.
    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Check if this is an error response.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Whether this response answers the request with the given id.
    pub fn answers(&self, id: u64) -> bool {
        match &self.id {
            Value::Number(n) => n.as_u64() == Some(id),
            Value::String(s) => s.parse::<u64>().ok() == Some(id),
            _ => false,
        }
    }

    /// Get the result, or return an error if this is an error response.
    pub fn into_result(self) -> std::result::Result<Value, JsonRpcError> {
        if let Some(error) = self.error {
            Err(error)
        } else {
            Ok(self.result.unwrap_or(Value::Null))
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    #[serde(default)]
    pub message: String,
    /// Optional additional data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// Standard JSON-RPC error codes
impl JsonRpcError {
    /// Parse error - Invalid JSON.
    pub const PARSE_ERROR: i64 = -32700;
    /// Invalid Request - Not a valid Request object.
    pub const INVALID_REQUEST: i64 = -32600;
    /// Method not found.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Invalid params.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Internal error.
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Create an error object.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<JsonRpcError> for McpError {
    fn from(err: JsonRpcError) -> Self {
        McpError::rpc(err.code, err.message, err.data)
    }
}

/// A request initiated by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerRequest {
    /// Request id chosen by the server.
    pub id: Value,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Any message a server may send.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// Response to one of our requests.
    Response(JsonRpcResponse),
    /// Server-initiated request that expects a reply.
    Request(ServerRequest),
    /// Server-initiated notification.
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    /// Classify a raw JSON-RPC frame.
    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    /// Classify an already-parsed JSON-RPC message.
    pub fn from_value(value: Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(McpError::protocol("expected a JSON-RPC object"));
        };

        let has_method = object.contains_key("method");
        let has_id = object.get("id").is_some_and(|id| !id.is_null());

        let message = match (has_method, has_id) {
            (true, true) => Self::Request(serde_json::from_value(value)?),
            (true, false) => Self::Notification(serde_json::from_value(value)?),
            (false, _) => Self::Response(serde_json::from_value(value)?),
        };
        Ok(message)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MCP Protocol Types
// ─────────────────────────────────────────────────────────────────────────────

/// Client capabilities sent during initialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientCapabilities {
    /// Experimental capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<Value>,
}

/// Client info sent during initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: CLIENT_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version.
    pub protocol_version: String,
    /// Client capabilities.
    pub capabilities: ClientCapabilities,
    /// Client info.
    pub client_info: ClientInfo,
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: ClientInfo::default(),
        }
    }
}

/// Server capabilities returned during initialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Tools capability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    /// Resources capability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Value>,
    /// Prompts capability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<Value>,
    /// Logging capability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<Value>,
}

/// Server info returned during initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    #[serde(default)]
    pub version: String,
}

/// Result of the initialize request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Protocol version.
    pub protocol_version: String,
    /// Server capabilities.
    #[serde(default)]
    pub capabilities: ServerCapabilities,
    /// Server info.
    pub server_info: ServerInfo,
    /// Free-form usage hints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// One parameter in a tool's input schema.
///
/// Built leniently from whatever the server sent: a boolean or otherwise
/// unexpected subschema becomes an untyped parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropertySchema {
    /// JSON Schema type tag; a string, or a list of strings for unions.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<Value>,
    /// Parameter description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Remaining schema keywords, untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PropertySchema {
    /// Read a subschema without ever failing.
    pub fn from_value(value: &Value) -> Self {
        let Value::Object(fields) = value else {
            return Self::default();
        };
        let mut extra = fields.clone();
        let type_tag = extra.remove("type");
        let description = match extra.remove("description") {
            Some(Value::String(text)) => Some(text),
            Some(other) => {
                extra.insert("description".to_string(), other);
                None
            }
            None => None,
        };
        Self {
            type_tag,
            description,
            extra,
        }
    }

    /// Printable type name ("string", "number | null", "any").
    pub fn type_name(&self) -> String {
        match &self.type_tag {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(items)) if items.iter().any(Value::is_string) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" | "),
            _ => "any".to_string(),
        }
    }
}

/// Input schema advertised for a tool.
///
/// The schema is advisory. It is kept exactly as received and serializes
/// back unchanged; `schema_type`, `properties` and `required` are a
/// best-effort view that never rejects a shape it does not model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct InputSchema {
    /// Schema type when it is a single string, normally "object".
    pub schema_type: Option<String>,
    /// Parameters by name.
    pub properties: BTreeMap<String, PropertySchema>,
    /// Names of required parameters.
    pub required: Vec<String>,
    raw: Value,
}

impl InputSchema {
    /// Whether `name` is a required parameter.
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// The schema as the server sent it.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl From<Value> for InputSchema {
    fn from(raw: Value) -> Self {
        let schema_type = raw.get("type").and_then(Value::as_str).map(str::to_string);
        let properties = raw
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, sub)| (name.clone(), PropertySchema::from_value(sub)))
                    .collect()
            })
            .unwrap_or_default();
        let required = raw
            .get("required")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            schema_type,
            properties,
            required,
            raw,
        }
    }
}

impl From<InputSchema> for Value {
    fn from(schema: InputSchema) -> Self {
        schema.raw
    }
}

/// A tool definition from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    /// Tool name (unique identifier).
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Schema for the tool's input parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<InputSchema>,
}

/// Parameters for the tools/list request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListToolsParams {
    /// Pagination cursor from a previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Result of the tools/list request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    /// List of available tools.
    #[serde(default)]
    pub tools: Vec<ToolInfo>,
    /// Cursor for the next page, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Parameters for the tools/call request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments to pass to the tool.
    pub arguments: Map<String, Value>,
}

/// Result of the tools/call request, kept as the server sent it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Content blocks returned by the tool, e.g. `{"type": "text", "text": ...}`.
    #[serde(default)]
    pub content: Vec<Value>,
    /// Whether the tool call resulted in an error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
    /// Structured output, when the tool declares one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    /// Any other top-level fields (`_meta`, extensions), untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CallToolResult {
    /// Text of the first content block, if it has any.
    pub fn first_text(&self) -> Option<&str> {
        self.content
            .first()
            .and_then(|block| block.get("text"))
            .and_then(Value::as_str)
    }

    /// All text blocks joined with newlines.
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .content
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }

    /// Check if the tool call was an error.
    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }
}
