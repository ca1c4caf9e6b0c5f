//! Mock MCP server logic shared by the `mock-mcp-server` binary and the
//! in-process loopback tests.
//!
//! Tools: `echo`, `add`, `error`.

#![allow(dead_code)]

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Behaviour switches.
#[derive(Debug, Clone, Default)]
pub struct MockOptions {
    /// Split `tools/list` into pages of this size.
    pub page_size: Option<usize>,
    /// Report unknown tools with the invalid-params code instead of method-not-found.
    pub unknown_as_invalid: bool,
    /// Send a log notification before every response.
    pub chatty: bool,
    /// Exit when this tool is called.
    pub crash_on: Option<String>,
    /// Serve one tool per page with cursors that cycle back on themselves.
    pub cycle_cursor: bool,
    /// Also list a tool whose schema uses a boolean subschema.
    pub odd_schema: bool,
}

impl MockOptions {
    pub fn from_args(args: impl IntoIterator<Item = String>) -> Self {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--page-size" => options.page_size = args.next().and_then(|v| v.parse().ok()),
                "--unknown-as-invalid" => options.unknown_as_invalid = true,
                "--chatty" => options.chatty = true,
                "--crash-on" => options.crash_on = args.next(),
                "--cycle-cursor" => options.cycle_cursor = true,
                "--odd-schema" => options.odd_schema = true,
                _ => {}
            }
        }
        options
    }
}

/// Outcome of handling one inbound line.
pub enum Reply {
    Send(Value),
    Silent,
    Exit,
}

/// Serve newline-delimited JSON-RPC until the reader hits EOF.
pub async fn serve<R, W>(reader: R, mut writer: W, options: MockOptions)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Ok(message) = serde_json::from_str::<Value>(&line) else {
            continue;
        };

        match handle(&message, &options) {
            Reply::Send(response) => {
                if options.chatty {
                    let note = json!({
                        "jsonrpc": "2.0",
                        "method": "notifications/message",
                        "params": {"level": "info", "data": "working"}
                    });
                    if write_line(&mut writer, &note).await.is_err() {
                        return;
                    }
                }
                if write_line(&mut writer, &response).await.is_err() {
                    return;
                }
            }
            Reply::Silent => {}
            Reply::Exit => return,
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, value: &Value) -> std::io::Result<()> {
    let mut line = value.to_string();
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

pub fn handle(message: &Value, options: &MockOptions) -> Reply {
    // Notifications and stray responses need no answer.
    let (Some(method), Some(id)) = (
        message.get("method").and_then(Value::as_str),
        message.get("id").cloned(),
    ) else {
        return Reply::Silent;
    };
    let params = message.get("params").cloned().unwrap_or(json!({}));

    let outcome = match method {
        "initialize" => Ok(json!({
            "protocolVersion": params
                .get("protocolVersion")
                .cloned()
                .unwrap_or(json!("2025-06-18")),
            "capabilities": { "tools": {} },
            "serverInfo": { "name": "mock-mcp-server", "version": "1.0.0" }
        })),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(list_page(params.get("cursor"), options)),
        "tools/call" => {
            let name = params.get("name").and_then(Value::as_str).unwrap_or("");
            if options.crash_on.as_deref() == Some(name) {
                return Reply::Exit;
            }
            let args = params.get("arguments").cloned().unwrap_or(json!({}));
            call(name, &args, options)
        }
        other => Err((-32601, format!("Method not found: {other}"))),
    };

    Reply::Send(match outcome {
        Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
        Err((code, message)) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": code, "message": message}
        }),
    })
}

pub fn tool_definitions() -> Vec<Value> {
    vec![
        json!({
            "name": "echo",
            "description": "Echo back the input text",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Text to echo" }
                },
                "required": ["text"]
            }
        }),
        json!({
            "name": "add",
            "description": "Add two numbers",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "a": { "type": "number", "description": "First addend" },
                    "b": { "type": "number", "description": "Second addend" }
                },
                "required": ["a", "b"]
            }
        }),
        json!({
            "name": "error",
            "description": "Always fails (for testing)",
            "inputSchema": { "type": "object", "properties": {} }
        }),
    ]
}

fn list_page(cursor: Option<&Value>, options: &MockOptions) -> Value {
    let mut tools = tool_definitions();
    if options.odd_schema {
        tools.push(json!({
            "name": "any",
            "description": "Accepts anything",
            "inputSchema": {
                "type": ["object", "null"],
                "properties": { "x": true }
            }
        }));
    }

    let cursor = cursor.and_then(Value::as_str);
    if options.cycle_cursor {
        // None -> A -> B -> A ...
        let (index, next) = match cursor {
            None => (0, "A"),
            Some("A") => (1, "B"),
            _ => (2, "A"),
        };
        return json!({ "tools": [tools[index].clone()], "nextCursor": next });
    }

    let Some(size) = options.page_size.filter(|s| *s > 0) else {
        return json!({ "tools": tools });
    };

    let start: usize = cursor
        .and_then(|c| c.strip_prefix("page-"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0);
    let end = (start + size).min(tools.len());
    let page: Vec<Value> = tools[start.min(end)..end].to_vec();

    if end < tools.len() {
        json!({ "tools": page, "nextCursor": format!("page-{end}") })
    } else {
        json!({ "tools": page })
    }
}

fn text_result(text: impl Into<String>) -> Value {
    json!({ "content": [{ "type": "text", "text": text.into() }] })
}

fn call(name: &str, args: &Value, options: &MockOptions) -> Result<Value, (i64, String)> {
    match name {
        "echo" => match args.get("text").and_then(Value::as_str) {
            Some(text) => Ok(text_result(format!("Echo: {text}"))),
            None => Err((-32602, "Invalid parameters: 'text' is required".to_string())),
        },
        "add" => {
            let (Some(a), Some(b)) = (args.get("a"), args.get("b")) else {
                return Err((-32602, "Invalid parameters: 'a' and 'b' are required".to_string()));
            };
            let sum = match (a.as_i64(), b.as_i64()) {
                (Some(a), Some(b)) => json!(a + b),
                _ => match (a.as_f64(), b.as_f64()) {
                    (Some(a), Some(b)) => json!(a + b),
                    _ => return Err((-32602, "Invalid parameters: 'a' and 'b' must be numbers".to_string())),
                },
            };
            Ok(text_result(format!("{a} + {b} = {sum}")))
        }
        "error" => Ok(json!({
            "content": [{ "type": "text", "text": "This is a test error" }],
            "isError": true
        })),
        unknown if options.unknown_as_invalid => {
            Err((-32602, format!("Invalid parameters: unknown tool '{unknown}'")))
        }
        unknown => Err((-32601, format!("Tool not found: {unknown}"))),
    }
}
