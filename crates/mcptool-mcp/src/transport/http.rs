//! Streamable HTTP transport.
//!
//! Each message is POSTed to the endpoint. The server answers with either a
//! JSON body or an event stream carrying the response.

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::{Routed, Transport, route};
use crate::error::{McpError, Result};
use crate::protocol::{IncomingMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

pub(super) const SESSION_ID_HEADER: &str = "mcp-session-id";
pub(super) const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";
const ACCEPT_BOTH: &str = "application/json, text/event-stream";

/// Transport for MCP servers behind a single HTTP endpoint.
pub struct HttpTransport {
    http: reqwest::Client,
    url: Url,
    session_id: Option<String>,
    protocol_version: Option<String>,
}

impl HttpTransport {
    /// Build the HTTP client. Does not touch the network.
    pub fn new(url: Url, bearer_token: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| McpError::transport("bearer token is not a valid header value"))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| McpError::transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url,
            session_id: None,
            protocol_version: None,
        })
    }

    /// Session id assigned by the server, once known.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    async fn post<T: Serialize>(&mut self, message: &T) -> Result<Response> {
        let mut request = self
            .http
            .post(self.url.clone())
            .header(ACCEPT, ACCEPT_BOTH)
            .json(message);
        if let Some(id) = &self.session_id {
            request = request.header(SESSION_ID_HEADER, id);
        }
        if let Some(version) = &self.protocol_version {
            request = request.header(PROTOCOL_VERSION_HEADER, version);
        }

        let response = request.send().await.map_err(map_reqwest)?;

        if let Some(id) = response
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            && self.session_id.as_deref() != Some(id)
        {
            tracing::debug!(session_id = %id, "MCP HTTP session established");
            self.session_id = Some(id.to_string());
        }

        check_status(response).await
    }

    async fn read_event_stream(
        &mut self,
        response: Response,
        awaiting: u64,
    ) -> Result<JsonRpcResponse> {
        let mut events = Box::pin(response.bytes_stream().eventsource());
        while let Some(event) = events.next().await {
            let event = event.map_err(|e| McpError::transport(e.to_string()))?;
            if event.data.trim().is_empty() {
                continue;
            }
            let message = match IncomingMessage::parse(&event.data) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(data = %event.data, error = %e, "ignoring malformed event");
                    continue;
                }
            };
            match route(message, awaiting) {
                Routed::Matched(response) => return Ok(response),
                Routed::Reply(reply) => self.send_reply(&reply).await,
                Routed::Skip => {}
            }
        }
        Err(McpError::ConnectionClosed)
    }

    async fn read_json_body(&mut self, response: Response, awaiting: u64) -> Result<JsonRpcResponse> {
        let body = response.text().await.map_err(map_reqwest)?;
        let value: Value = serde_json::from_str(&body)?;
        // A batch may carry server requests alongside the response.
        let messages = match value {
            Value::Array(items) => items,
            single => vec![single],
        };

        let mut matched = None;
        for item in messages {
            match route(IncomingMessage::from_value(item)?, awaiting) {
                Routed::Matched(response) => matched = Some(response),
                Routed::Reply(reply) => self.send_reply(&reply).await,
                Routed::Skip => {}
            }
        }
        matched.ok_or_else(|| McpError::protocol(format!("no response for request {}", awaiting)))
    }

    async fn send_reply(&mut self, reply: &JsonRpcResponse) {
        if let Err(e) = self.post(reply).await {
            tracing::warn!(error = %e, "failed to answer server request");
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn request(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        tracing::trace!(method = %request.method, id = request.id, url = %self.url, "POST");
        let response = self.post(request).await?;

        if response.status() == StatusCode::ACCEPTED {
            return Err(McpError::protocol(format!(
                "server accepted request {} without a response",
                request.id
            )));
        }

        if is_event_stream(&response) {
            self.read_event_stream(response, request.id).await
        } else {
            self.read_json_body(response, request.id).await
        }
    }

    async fn notify(&mut self, notification: &JsonRpcNotification) -> Result<()> {
        tracing::trace!(method = %notification.method, url = %self.url, "POST notification");
        self.post(notification).await?;
        Ok(())
    }

    fn set_protocol_version(&mut self, version: &str) {
        self.protocol_version = Some(version.to_string());
    }

    async fn close(&mut self) -> Result<()> {
        let Some(session_id) = self.session_id.take() else {
            return Ok(());
        };

        let result = self
            .http
            .delete(self.url.clone())
            .header(SESSION_ID_HEADER, &session_id)
            .send()
            .await;
        match result {
            Ok(response) => {
                tracing::debug!(status = %response.status(), "MCP HTTP session terminated");
            }
            Err(e) => {
                // Servers may not support explicit termination.
                tracing::warn!(error = %e, "session termination failed");
            }
        }
        Ok(())
    }
}

fn is_event_stream(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/event-stream"))
}

pub(super) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(McpError::Http {
        status: status.as_u16(),
        body,
    })
}

pub(super) fn map_reqwest(err: reqwest::Error) -> McpError {
    if err.is_timeout() {
        McpError::Timeout
    } else {
        McpError::transport(err.to_string())
    }
}
