//! Integration tests for the MCP client core.
//!
//! Most tests run the mock server in-process over the loopback transport;
//! the stdio tests spawn the `mock-mcp-server` binary.

#[path = "support/mock_tools.rs"]
mod mock_tools;

use mcptool_mcp::{
    ConnectionSettings, ErrorKind, Invocation, LoopbackChannel, LoopbackConnector, Outcome,
    Session, SessionState, invoker,
};
use mock_tools::MockOptions;
use serde_json::{Map, Value, json};

fn loopback(options: MockOptions) -> ConnectionSettings {
    let connector = LoopbackConnector::new(move || {
        let (client, server) = LoopbackChannel::duplex(64 * 1024);
        let (read, write) = tokio::io::split(server);
        tokio::spawn(mock_tools::serve(read, write, options.clone()));
        client
    });
    ConnectionSettings::loopback(connector)
}

fn stdio(flags: &str) -> ConnectionSettings {
    let command = format!("{} {}", env!("CARGO_BIN_EXE_mock-mcp-server"), flags);
    ConnectionSettings::local(command)
}

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

async fn connected(settings: &ConnectionSettings) -> Session {
    let mut session = Session::new(settings.validate().expect("valid settings"));
    session.connect().await.expect("connect");
    session
}

// ─────────────────────────────────────────────────────────────────────────────
// Session lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_exposes_server_info() {
    let mut session = connected(&loopback(MockOptions::default())).await;
    assert_eq!(session.state(), SessionState::Connected);

    let info = session.server_info().expect("server info");
    assert_eq!(info.server_info.name, "mock-mcp-server");
    assert_eq!(info.server_info.version, "1.0.0");
    assert!(info.capabilities.tools.is_some());

    session.close().await;
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_second_connect_is_refused() {
    let mut session = connected(&loopback(MockOptions::default())).await;
    let err = session.connect().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
    // The existing connection is untouched.
    assert_eq!(session.state(), SessionState::Connected);
    assert_eq!(session.list_tools().await.unwrap().len(), 3);
    session.close().await;
}

#[tokio::test]
async fn test_close_then_list_is_not_connected() {
    let mut session = connected(&loopback(MockOptions::default())).await;
    session.close().await;
    session.close().await;

    let err = session.list_tools().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotConnected);
    let err = session.call_tool("echo", Map::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotConnected);
}

// ─────────────────────────────────────────────────────────────────────────────
// Discovery
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_tools_in_server_order() {
    let tools = invoker::list_tools(&loopback(MockOptions::default()))
        .await
        .unwrap();

    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "add", "error"]);
    for tool in &tools {
        assert!(
            tool.description.as_deref().is_some_and(|d| !d.is_empty()),
            "{} has no description",
            tool.name
        );
    }

    let add = &tools[1];
    let schema = add.input_schema.as_ref().expect("schema");
    assert!(schema.is_required("a"));
    assert!(schema.is_required("b"));
    assert_eq!(schema.properties["a"].type_name(), "number");
}

#[tokio::test]
async fn test_list_tools_follows_pagination() {
    let options = MockOptions {
        page_size: Some(1),
        ..Default::default()
    };
    let tools = invoker::list_tools(&loopback(options)).await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "add", "error"]);
}

#[tokio::test]
async fn test_cycling_cursor_stops_listing() {
    let options = MockOptions {
        cycle_cursor: true,
        ..Default::default()
    };
    let listing = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        invoker::list_tools(&loopback(options)),
    )
    .await
    .expect("listing must not loop on a cursor cycle");

    let tools = listing.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "add", "error"]);
}

#[tokio::test]
async fn test_boolean_property_schema_does_not_break_listing() {
    let options = MockOptions {
        odd_schema: true,
        ..Default::default()
    };
    let tools = invoker::list_tools(&loopback(options)).await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "add", "error", "any"]);

    let schema = tools[3].input_schema.as_ref().expect("schema");
    assert_eq!(schema.properties["x"].type_name(), "any");
    assert_eq!(schema.raw()["properties"]["x"], json!(true));
    // Well-formed schemas alongside it are still read normally.
    assert!(tools[0].input_schema.as_ref().unwrap().is_required("text"));
}

#[tokio::test]
async fn test_notifications_are_skipped() {
    let options = MockOptions {
        chatty: true,
        ..Default::default()
    };
    let settings = loopback(options);
    let tools = invoker::list_tools(&settings).await.unwrap();
    assert_eq!(tools.len(), 3);

    let result = invoker::call_tool(&settings, "echo", args(json!({"text": "hi"})))
        .await
        .unwrap();
    assert_eq!(result.first_text(), Some("Echo: hi"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Invocation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_echo() {
    let result = invoker::call_tool(
        &loopback(MockOptions::default()),
        "echo",
        args(json!({"text": "Hello World"})),
    )
    .await
    .unwrap();
    assert_eq!(result.first_text(), Some("Echo: Hello World"));
    assert!(!result.is_error());
}

#[tokio::test]
async fn test_add() {
    let settings = loopback(MockOptions::default());
    let result = invoker::call_tool(&settings, "add", args(json!({"a": 5, "b": 3})))
        .await
        .unwrap();
    assert_eq!(result.first_text(), Some("5 + 3 = 8"));
}

#[tokio::test]
async fn test_add_missing_param_is_invalid_params() {
    let settings = loopback(MockOptions::default());
    let err = invoker::call_tool(&settings, "add", args(json!({"a": 5})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParams);
    assert!(err.message().contains("add"));
}

#[tokio::test]
async fn test_unknown_tool() {
    for options in [
        MockOptions::default(),
        MockOptions {
            unknown_as_invalid: true,
            ..Default::default()
        },
    ] {
        let err = invoker::call_tool(&loopback(options), "nonexistent_tool", Map::new())
            .await
            .unwrap_err();
        // Servers disagree on which code an unknown tool gets.
        assert!(
            matches!(err.kind(), ErrorKind::ToolNotFound | ErrorKind::InvalidParams),
            "unexpected kind {}",
            err.kind()
        );
        assert!(err.message().contains("nonexistent_tool"));
    }
}

#[tokio::test]
async fn test_tool_reported_error() {
    let err = invoker::call_tool(&loopback(MockOptions::default()), "error", Map::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServerError);
    assert!(err.message().contains("This is a test error"));
    assert_eq!(err.tool_name(), Some("error"));
}

#[tokio::test]
async fn test_empty_tool_name_is_rejected_locally() {
    let mut session = connected(&loopback(MockOptions::default())).await;
    let err = session.call_tool("  ", Map::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParams);
    // The session is still usable.
    assert_eq!(session.list_tools().await.unwrap().len(), 3);
    session.close().await;
}

#[tokio::test]
async fn test_invoke_dispatches() {
    let settings = loopback(MockOptions::default());
    match invoker::invoke(&settings, Invocation::ListTools).await.unwrap() {
        Outcome::Tools(tools) => assert_eq!(tools.len(), 3),
        other => panic!("unexpected outcome {other:?}"),
    }

    let call = Invocation::CallTool {
        name: "echo".to_string(),
        arguments: args(json!({"text": "x"})),
    };
    match invoker::invoke(&settings, call).await.unwrap() {
        Outcome::Called(result) => assert_eq!(result.first_text(), Some("Echo: x")),
        other => panic!("unexpected outcome {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stdio transport
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stdio_round_trip() {
    let settings = stdio("");
    let tools = invoker::list_tools(&settings).await.unwrap();
    assert_eq!(tools.len(), 3);

    let result = invoker::call_tool(&settings, "add", args(json!({"a": 5, "b": 3})))
        .await
        .unwrap();
    assert_eq!(result.first_text(), Some("5 + 3 = 8"));
}

#[tokio::test]
async fn test_stdio_session_reuses_process() {
    let mut session = connected(&stdio("--chatty --page-size 2")).await;
    assert_eq!(session.transport_name(), "stdio");
    assert_eq!(session.list_tools().await.unwrap().len(), 3);
    let result = session
        .call_tool("echo", args(json!({"text": "Hello World"})))
        .await
        .unwrap();
    assert_eq!(result.first_text(), Some("Echo: Hello World"));
    session.close().await;
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_stdio_server_crash_is_server_error() {
    let mut session = connected(&stdio("--crash-on echo")).await;
    let err = session
        .call_tool("echo", args(json!({"text": "boom"})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServerError);
    session.close().await;
}
