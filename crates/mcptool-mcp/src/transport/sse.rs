//! HTTP+SSE transport.
//!
//! A long-lived GET stream delivers server messages. Its first `endpoint`
//! event names the URL that client messages are POSTed to.

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use super::http::{check_status, map_reqwest};
use super::{Routed, Transport, route};
use crate::error::{McpError, Result};
use crate::protocol::{IncomingMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// Transport for MCP servers speaking the HTTP+SSE protocol.
pub struct SseTransport {
    http: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
    incoming: mpsc::UnboundedReceiver<String>,
    reader: JoinHandle<()>,
}

impl SseTransport {
    /// Open the event stream and wait for the server to announce its endpoint.
    pub async fn open(url: Url, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::new();

        let response = tokio::time::timeout(
            timeout,
            http.get(url.clone()).header(ACCEPT, "text/event-stream").send(),
        )
        .await
        .map_err(|_| McpError::Timeout)?
        .map_err(map_reqwest)?;
        let response = check_status(response).await?;

        let mut events = Box::pin(response.bytes_stream().eventsource());

        let announced = tokio::time::timeout(timeout, async {
            while let Some(event) = events.next().await {
                let event = event.map_err(|e| McpError::transport(e.to_string()))?;
                if event.event == "endpoint" {
                    return Ok::<_, McpError>(event.data);
                }
                tracing::debug!(event = %event.event, "skipping event before endpoint");
            }
            Err(McpError::protocol("event stream ended before an endpoint event"))
        })
        .await
        .map_err(|_| McpError::Timeout)??;

        let endpoint = url
            .join(announced.trim())
            .map_err(|e| McpError::protocol(format!("invalid endpoint '{}': {}", announced, e)))?;
        tracing::debug!(endpoint = %endpoint, "SSE endpoint announced");

        let (tx, incoming) = mpsc::unbounded_channel();
        let reader = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                match event {
                    Ok(event) if event.event == "message" || event.event.is_empty() => {
                        if tx.send(event.data).is_err() {
                            break;
                        }
                    }
                    Ok(event) => {
                        tracing::debug!(event = %event.event, "ignoring SSE event");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "SSE stream failed");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            http,
            endpoint,
            timeout,
            incoming,
            reader,
        })
    }

    /// URL client messages are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post<T: Serialize>(&self, message: &T) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .json(message)
            .send()
            .await
            .map_err(map_reqwest)?;
        check_status(response).await?;
        Ok(())
    }

    async fn next_message(&mut self) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.incoming.recv()).await {
            Ok(Some(data)) => Ok(data),
            Ok(None) => Err(McpError::ConnectionClosed),
            Err(_) => Err(McpError::Timeout),
        }
    }
}

#[async_trait]
impl Transport for SseTransport {
    fn name(&self) -> &'static str {
        "sse"
    }

    async fn request(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        tracing::trace!(method = %request.method, id = request.id, endpoint = %self.endpoint, "POST");
        self.post(request).await?;

        loop {
            let data = self.next_message().await?;
            let message = match IncomingMessage::parse(&data) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(data = %data, error = %e, "ignoring malformed event");
                    continue;
                }
            };
            match route(message, request.id) {
                Routed::Matched(response) => return Ok(response),
                Routed::Reply(reply) => {
                    if let Err(e) = self.post(&reply).await {
                        tracing::warn!(error = %e, "failed to answer server request");
                    }
                }
                Routed::Skip => {}
            }
        }
    }

    async fn notify(&mut self, notification: &JsonRpcNotification) -> Result<()> {
        self.post(notification).await
    }

    async fn close(&mut self) -> Result<()> {
        self.reader.abort();
        self.incoming.close();
        Ok(())
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
