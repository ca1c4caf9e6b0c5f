//! Transport layer for MCP communication.
//!
//! Every transport offers the same capability set: it is opened from a
//! [`TransportSpec`], exchanges one framed request for its matched
//! response, and closes. The session never branches on the concrete kind.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use url::Url;

use crate::config::{ConnectionConfig, LoopbackConnector, Target, TransportKind};
use crate::error::Result;
use crate::protocol::{
    IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
};

mod http;
mod sse;
mod stream;

pub use http::HttpTransport;
pub use sse::SseTransport;
pub use stream::{LoopbackChannel, StreamTransport};

/// A connected channel to one MCP server.
#[async_trait]
pub trait Transport: Send {
    /// Short transport name for logs.
    fn name(&self) -> &'static str;

    /// Send a request and wait for the response with the same id.
    async fn request(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse>;

    /// Send a notification (no response expected).
    async fn notify(&mut self, notification: &JsonRpcNotification) -> Result<()>;

    /// Record the protocol version the server agreed to.
    fn set_protocol_version(&mut self, _version: &str) {}

    /// Release the channel. Callers treat failures as non-fatal.
    async fn close(&mut self) -> Result<()>;
}

/// The transport chosen for a configuration, not yet opened.
#[derive(Debug, Clone)]
pub enum TransportSpec {
    /// Spawn `program` with `args` and talk over its stdio.
    Stdio {
        /// Executable.
        program: String,
        /// Arguments, split naively on whitespace.
        args: Vec<String>,
    },
    /// Streamable HTTP endpoint.
    Http {
        /// Endpoint URL.
        url: Url,
        /// Token for the `Authorization: Bearer` header.
        bearer_token: Option<String>,
        /// Per-request timeout.
        timeout: Duration,
    },
    /// HTTP+SSE endpoint.
    Sse {
        /// Event stream URL.
        url: Url,
        /// Per-request timeout for POSTed messages.
        timeout: Duration,
    },
    /// In-process channel.
    Loopback(LoopbackConnector),
}

impl TransportSpec {
    /// Pick the transport for a validated configuration. No I/O happens here.
    pub fn select(config: &ConnectionConfig) -> Self {
        match config.target() {
            Target::CommandLine(line) => {
                let mut parts = line.split_whitespace().map(str::to_string);
                let program = parts.next().unwrap_or_default();
                Self::Stdio {
                    program,
                    args: parts.collect(),
                }
            }
            Target::Url(url) if config.kind() == TransportKind::Sse => Self::Sse {
                url: url.clone(),
                timeout: config.timeout(),
            },
            Target::Url(url) => Self::Http {
                url: url.clone(),
                bearer_token: config.bearer_token().map(str::to_string),
                timeout: config.timeout(),
            },
            Target::Loopback(connector) => Self::Loopback(connector.clone()),
        }
    }

    /// Short name of the selected transport.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stdio { .. } => "stdio",
            Self::Http { .. } => "http",
            Self::Sse { .. } => "sse",
            Self::Loopback(_) => "loopback",
        }
    }

    /// Establish the channel: spawn, build the HTTP client, or open the stream.
    pub async fn open(&self) -> Result<Box<dyn Transport>> {
        let transport: Box<dyn Transport> = match self {
            Self::Stdio { program, args } => Box::new(StreamTransport::spawn(program, args)?),
            Self::Http {
                url,
                bearer_token,
                timeout,
            } => Box::new(HttpTransport::new(
                url.clone(),
                bearer_token.as_deref(),
                *timeout,
            )?),
            Self::Sse { url, timeout } => Box::new(SseTransport::open(url.clone(), *timeout).await?),
            Self::Loopback(connector) => Box::new(StreamTransport::loopback(connector.open())),
        };
        Ok(transport)
    }
}

/// What to do with a message received while waiting for request `awaiting`.
#[derive(Debug)]
pub(crate) enum Routed {
    /// The awaited response.
    Matched(JsonRpcResponse),
    /// A server request that must be answered.
    Reply(JsonRpcResponse),
    /// Anything else; already logged.
    Skip,
}

pub(crate) fn route(message: IncomingMessage, awaiting: u64) -> Routed {
    match message {
        IncomingMessage::Response(response) if response.answers(awaiting) => {
            Routed::Matched(response)
        }
        IncomingMessage::Response(response) => {
            tracing::warn!(id = %response.id, awaiting, "skipping response with unexpected id");
            Routed::Skip
        }
        IncomingMessage::Notification(notification) => {
            tracing::debug!(method = %notification.method, "server notification");
            Routed::Skip
        }
        IncomingMessage::Request(request) if request.method == "ping" => {
            Routed::Reply(JsonRpcResponse::success(request.id, json!({})))
        }
        IncomingMessage::Request(request) => {
            tracing::debug!(method = %request.method, "declining server request");
            Routed::Reply(JsonRpcResponse::failure(
                request.id,
                JsonRpcError::new(
                    JsonRpcError::METHOD_NOT_FOUND,
                    format!("Method not supported by client: {}", request.method),
                ),
            ))
        }
    }
}
