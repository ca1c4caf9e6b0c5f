//! Transport-agnostic MCP (Model Context Protocol) client core for mcptool.
//!
//! This crate connects to an MCP server over one of several transports,
//! discovers its tools, invokes them, and reports every failure as an
//! [`AppError`] drawn from a small closed set of kinds.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  invoker                                                    │
//! │  - validate settings, connect, run one operation, close     │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Session                                                    │
//! │  - unconnected -> connected -> closed                       │
//! │  - initialize, tools/list, tools/call                       │
//! │  - failures routed through translate                        │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Transport (selected by TransportSpec)                      │
//! │  - stdio: child process, newline-delimited JSON             │
//! │  - http: streamable HTTP, JSON or event-stream replies      │
//! │  - sse: GET event stream + POST endpoint                    │
//! │  - loopback: in-process channel for tests                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use mcptool_mcp::{ConnectionSettings, TransportKind, invoker};
//! use serde_json::{Map, json};
//!
//! let settings = ConnectionSettings::remote(TransportKind::Https, "https://example.com/mcp")
//!     .with_bearer_token("secret");
//!
//! for tool in invoker::list_tools(&settings).await? {
//!     println!("{} - {:?}", tool.name, tool.description);
//! }
//!
//! let mut args = Map::new();
//! args.insert("text".into(), json!("Hello World"));
//! let result = invoker::call_tool(&settings, "echo", args).await?;
//! println!("{:?}", result.text());
//! ```
//!
//! The protocol flow is:
//! 1. Client sends `initialize` with its name and version
//! 2. Server responds with its capabilities
//! 3. Client sends `notifications/initialized`
//! 4. Client can now call `tools/list` and `tools/call`

pub mod config;
pub mod error;
pub mod invoker;
pub mod protocol;
pub mod session;
pub mod translate;
pub mod transport;

pub use config::{
    ConnectionConfig, ConnectionSettings, DEFAULT_TIMEOUT, LoopbackConnector, TransportKind,
    validate_url,
};
pub use error::{AppError, ErrorKind, McpError, Result};
pub use invoker::{Invocation, Outcome};
pub use protocol::{
    CallToolResult, InitializeResult, InputSchema, PropertySchema, ServerInfo, ToolInfo,
};
pub use session::{Session, SessionState};
pub use transport::{LoopbackChannel, Transport, TransportSpec};
