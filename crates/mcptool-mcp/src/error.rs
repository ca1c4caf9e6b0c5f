//! Error types for MCP operations.
//!
//! Two layers live here:
//!
//! - [`McpError`] is the raw failure signal produced by transports and the
//!   JSON-RPC layer. It never leaves the crate's public operations directly.
//! - [`AppError`] is the closed application taxonomy callers see. Values are
//!   built exclusively by [`crate::translate`].

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type for raw transport/protocol operations.
pub type Result<T> = std::result::Result<T, McpError>;

/// Raw failure from a transport or the protocol layer.
#[derive(Debug, Error)]
pub enum McpError {
    /// Failed to spawn the MCP server process.
    #[error("failed to spawn MCP server: {0}")]
    SpawnFailed(String),

    /// Failed to communicate with the MCP server.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed or unexpected protocol traffic.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Non-success HTTP status from a remote endpoint.
    #[error("HTTP error {status}: {body}")]
    Http {
        /// Status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Server returned a JSON-RPC error object.
    #[error("server error {code}: {message}")]
    Rpc {
        /// Error code from the server.
        code: i64,
        /// Error message from the server.
        message: String,
        /// Optional additional data.
        data: Option<serde_json::Value>,
    },

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Timeout waiting for response.
    #[error("timeout waiting for response")]
    Timeout,
}

impl McpError {
    /// Create a spawn failed error.
    pub fn spawn_failed(msg: impl Into<String>) -> Self {
        Self::SpawnFailed(msg.into())
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create an error from a JSON-RPC error object.
    pub fn rpc(code: i64, message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
            data,
        }
    }

    /// The JSON-RPC error code, if the failure carries one.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The human-readable text of the failure.
    ///
    /// For JSON-RPC errors this is the server's message alone; an empty
    /// server message yields `None`.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Rpc { message, .. } if message.trim().is_empty() => None,
            Self::Rpc { message, .. } => Some(message.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Stable application error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Configuration is self-contradictory or malformed.
    ConfigurationError,
    /// Transport could not be established.
    ConnectionFailed,
    /// Operation attempted before `connect()` succeeded.
    NotConnected,
    /// Named tool does not exist on the server.
    ToolNotFound,
    /// Arguments rejected by the server's schema validation.
    InvalidParams,
    /// Any other failure reported by the server or transport.
    ServerError,
}

impl ErrorKind {
    /// Stable string identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigurationError => "CONFIGURATION_ERROR",
            Self::ConnectionFailed => "CONNECTION_FAILED",
            Self::NotConnected => "NOT_CONNECTED",
            Self::ToolNotFound => "TOOL_NOT_FOUND",
            Self::InvalidParams => "INVALID_PARAMS",
            Self::ServerError => "SERVER_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application error reported to callers of the client core.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

impl AppError {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>, tool_name: Option<&str>) -> Self {
        Self {
            kind,
            message: message.into(),
            tool_name: tool_name.map(str::to_string),
        }
    }

    /// The error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Tool the failure relates to, when one was being called.
    pub fn tool_name(&self) -> Option<&str> {
        self.tool_name.as_deref()
    }
}
