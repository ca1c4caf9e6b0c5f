//! Newline-delimited JSON over a byte stream.
//!
//! Used for local servers (child process stdin/stdout) and for the
//! in-process loopback channel.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream};
use tokio::process::{Child, Command};

use super::{Routed, Transport, route};
use crate::error::{McpError, Result};
use crate::protocol::{IncomingMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// How long a child gets to exit after stdin closes before it is killed.
const EXIT_GRACE: Duration = Duration::from_millis(500);

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// The client half of an in-process byte channel.
pub struct LoopbackChannel {
    reader: BoxedReader,
    writer: BoxedWriter,
}

impl LoopbackChannel {
    /// Wrap an existing reader/writer pair.
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    /// Create a connected pair; the returned stream is the server's end.
    pub fn duplex(max_buf_size: usize) -> (Self, DuplexStream) {
        let (client, server) = tokio::io::duplex(max_buf_size);
        let (reader, writer) = tokio::io::split(client);
        (Self::new(reader, writer), server)
    }
}

/// Transport exchanging one JSON message per line.
pub struct StreamTransport {
    name: &'static str,
    reader: BufReader<BoxedReader>,
    writer: Option<BoxedWriter>,
    child: Option<Child>,
    /// Command line, for log and error messages.
    label: String,
}

impl StreamTransport {
    /// Spawn a local server process.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        let label = if args.is_empty() {
            program.to_string()
        } else {
            format!("{} {}", program, args.join(" "))
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| McpError::spawn_failed(format!("failed to spawn '{}': {}", label, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::spawn_failed("failed to capture stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::spawn_failed("failed to capture stdout"))?;

        tracing::debug!(command = %label, pid = ?child.id(), "spawned MCP server process");

        Ok(Self {
            name: "stdio",
            reader: BufReader::new(Box::new(stdout)),
            writer: Some(Box::new(stdin)),
            child: Some(child),
            label,
        })
    }

    /// Attach to an in-process channel.
    pub fn loopback(channel: LoopbackChannel) -> Self {
        Self {
            name: "loopback",
            reader: BufReader::new(channel.reader),
            writer: Some(channel.writer),
            child: None,
            label: "loopback".to_string(),
        }
    }

    async fn write_frame<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let mut json = serde_json::to_string(message)?;
        tracing::trace!(json = %json, "sending MCP message");
        json.push('\n');

        let writer = self.writer.as_mut().ok_or(McpError::ConnectionClosed)?;
        writer
            .write_all(json.as_bytes())
            .await
            .map_err(|e| McpError::transport(format!("write to '{}' failed: {}", self.label, e)))?;
        writer
            .flush()
            .await
            .map_err(|e| McpError::transport(format!("flush to '{}' failed: {}", self.label, e)))?;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        loop {
            line.clear();
            let bytes_read = self.reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                tracing::trace!(json = %trimmed, "received MCP message");
                return Ok(Some(trimmed.to_string()));
            }
        }
    }

    /// Describe why the stream ended.
    fn closed_error(&mut self) -> McpError {
        if let Some(child) = self.child.as_mut()
            && let Ok(Some(status)) = child.try_wait()
        {
            return McpError::transport(format!(
                "server process '{}' exited ({})",
                self.label, status
            ));
        }
        McpError::ConnectionClosed
    }
}

#[async_trait]
impl Transport for StreamTransport {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn request(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        self.write_frame(request).await?;

        loop {
            let Some(frame) = self.read_frame().await? else {
                return Err(self.closed_error());
            };

            let message = match IncomingMessage::parse(&frame) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(error = %e, line = %frame, "ignoring non-JSON-RPC output");
                    continue;
                }
            };

            match route(message, request.id) {
                Routed::Matched(response) => return Ok(response),
                Routed::Reply(reply) => self.write_frame(&reply).await?,
                Routed::Skip => {}
            }
        }
    }

    async fn notify(&mut self, notification: &JsonRpcNotification) -> Result<()> {
        self.write_frame(notification).await
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the writer closes the server's stdin.
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(command = %self.label, %status, "MCP server process exited");
                Ok(())
            }
            Ok(Err(e)) => Err(McpError::Io(e)),
            Err(_) => {
                tracing::debug!(command = %self.label, "killing MCP server process");
                child.kill().await?;
                Ok(())
            }
        }
    }
}
