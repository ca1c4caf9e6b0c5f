//! One conversation with one MCP server.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::ConnectionConfig;
use crate::error::{AppError, McpError};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcNotification,
    JsonRpcRequest, ListToolsParams, ListToolsResult, MCP_PROTOCOL_VERSION, ToolInfo,
};
use crate::translate::{self, Operation};
use crate::transport::{Transport, TransportSpec};

/// Externally visible lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, not yet connected.
    Unconnected,
    /// Handshake completed.
    Connected,
    /// Torn down; cannot be reused.
    Closed,
}

enum Phase {
    Unconnected,
    Connected(Box<Connection>),
    Closed,
}

/// A live transport plus what the handshake told us.
struct Connection {
    transport: Box<dyn Transport>,
    server: InitializeResult,
    next_id: u64,
}

impl Connection {
    async fn request<T: DeserializeOwned>(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, McpError> {
        let result = send(self.transport.as_mut(), &mut self.next_id, method, params).await?;
        Ok(serde_json::from_value(result)?)
    }
}

async fn send(
    transport: &mut dyn Transport,
    next_id: &mut u64,
    method: &str,
    params: Option<Value>,
) -> Result<Value, McpError> {
    let id = *next_id;
    *next_id += 1;
    tracing::debug!(method, id, transport = transport.name(), "sending request");
    let response = transport
        .request(&JsonRpcRequest::new(id, method, params))
        .await?;
    Ok(response.into_result()?)
}

/// A session with an MCP server over a single transport.
///
/// Lifecycle is `Unconnected -> Connected -> Closed`. A failed
/// [`connect`](Self::connect) leaves the session unconnected; nothing
/// leaves `Closed`.
pub struct Session {
    spec: TransportSpec,
    phase: Phase,
}

impl Session {
    /// Create an unconnected session. No process or socket is opened.
    pub fn new(config: ConnectionConfig) -> Self {
        let spec = TransportSpec::select(&config);
        tracing::debug!(
            transport = spec.name(),
            kind = %config.kind(),
            "selected transport"
        );
        Self {
            spec,
            phase: Phase::Unconnected,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Unconnected => SessionState::Unconnected,
            Phase::Connected(_) => SessionState::Connected,
            Phase::Closed => SessionState::Closed,
        }
    }

    /// Name of the selected transport.
    pub fn transport_name(&self) -> &'static str {
        self.spec.name()
    }

    /// Handshake result, while connected.
    pub fn server_info(&self) -> Option<&InitializeResult> {
        match &self.phase {
            Phase::Connected(conn) => Some(&conn.server),
            _ => None,
        }
    }

    /// Open the transport and perform the initialize handshake.
    pub async fn connect(&mut self) -> Result<(), AppError> {
        match self.phase {
            Phase::Unconnected => {}
            Phase::Connected(_) => {
                return Err(translate::connection_refused("session is already connected"));
            }
            Phase::Closed => return Err(translate::connection_refused("session is closed")),
        }

        tracing::debug!(transport = self.spec.name(), "connecting to MCP server");
        let mut transport = self
            .spec
            .open()
            .await
            .map_err(|e| translate::connection_failed(&e))?;

        let mut next_id = 1;
        match handshake(transport.as_mut(), &mut next_id).await {
            Ok(server) => {
                tracing::info!(
                    server = %server.server_info.name,
                    version = %server.server_info.version,
                    protocol = %server.protocol_version,
                    "connected to MCP server"
                );
                self.phase = Phase::Connected(Box::new(Connection {
                    transport,
                    server,
                    next_id,
                }));
                Ok(())
            }
            Err(e) => {
                if let Err(close_err) = transport.close().await {
                    tracing::warn!(error = %close_err, "failed to release transport after handshake error");
                }
                Err(translate::connection_failed(&e))
            }
        }
    }

    /// List the server's tools in the order it reports them.
    pub async fn list_tools(&mut self) -> Result<Vec<ToolInfo>, AppError> {
        let op = Operation::ListTools;
        let conn = self.connection(op)?;

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();
        loop {
            let params = serde_json::to_value(ListToolsParams {
                cursor: cursor.clone(),
            })
            .map_err(|e| translate::translate(McpError::from(e), op))?;
            let page: ListToolsResult = conn
                .request("tools/list", Some(params))
                .await
                .map_err(|e| translate::translate(e, op))?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !seen.insert(next.clone()) => {
                    tracing::warn!(cursor = %next, "server repeated pagination cursor; stopping");
                    break;
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::debug!(count = tools.len(), "listed tools");
        Ok(tools)
    }

    /// Invoke a tool and return its result payload unmodified.
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, AppError> {
        let op = Operation::CallTool(name);
        let conn = self.connection(op)?;
        if name.trim().is_empty() {
            return Err(translate::empty_tool_name());
        }

        let params = serde_json::to_value(CallToolParams {
            name: name.to_string(),
            arguments,
        })
        .map_err(|e| translate::translate(McpError::from(e), op))?;

        tracing::debug!(tool = name, "calling tool");
        let result: CallToolResult = conn
            .request("tools/call", Some(params))
            .await
            .map_err(|e| translate::translate(e, op))?;

        if result.is_error() {
            return Err(translate::tool_error(name, result.first_text()));
        }
        Ok(result)
    }

    /// Release the transport. Safe to call in any state, any number of times.
    pub async fn close(&mut self) {
        let Phase::Connected(mut conn) = std::mem::replace(&mut self.phase, Phase::Closed) else {
            return;
        };
        match conn.transport.close().await {
            Ok(()) => tracing::info!(transport = conn.transport.name(), "session closed"),
            Err(e) => tracing::warn!(error = %e, "ignoring error during close"),
        }
    }

    fn connection(&mut self, op: Operation<'_>) -> Result<&mut Connection, AppError> {
        match &mut self.phase {
            Phase::Connected(conn) => Ok(conn.as_mut()),
            _ => Err(translate::not_connected(op)),
        }
    }
}

async fn handshake(
    transport: &mut dyn Transport,
    next_id: &mut u64,
) -> Result<InitializeResult, McpError> {
    let params = serde_json::to_value(InitializeParams::default())?;
    let result = send(transport, next_id, "initialize", Some(params)).await?;
    let server: InitializeResult = serde_json::from_value(result)?;

    if server.protocol_version != MCP_PROTOCOL_VERSION {
        tracing::debug!(
            requested = MCP_PROTOCOL_VERSION,
            agreed = %server.protocol_version,
            "server negotiated a different protocol version"
        );
    }
    transport.set_protocol_version(&server.protocol_version);

    transport
        .notify(&JsonRpcNotification::new("notifications/initialized", None))
        .await?;
    Ok(server)
}
