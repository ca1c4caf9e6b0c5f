//! Single-shot entry point: validate, connect, run one operation, close.

use serde_json::{Map, Value};

use crate::config::ConnectionSettings;
use crate::error::AppError;
use crate::protocol::{CallToolResult, ToolInfo};
use crate::session::Session;

/// The one operation an invocation performs.
#[derive(Debug, Clone)]
pub enum Invocation {
    /// Tool discovery.
    ListTools,
    /// Invoke a named tool.
    CallTool {
        /// Tool name.
        name: String,
        /// Tool arguments.
        arguments: Map<String, Value>,
    },
}

/// What a successful invocation produced.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Tools in server order.
    Tools(Vec<ToolInfo>),
    /// Raw tool result.
    Called(CallToolResult),
}

/// Run one invocation against the server described by `settings`.
pub async fn invoke(
    settings: &ConnectionSettings,
    invocation: Invocation,
) -> Result<Outcome, AppError> {
    match invocation {
        Invocation::ListTools => list_tools(settings).await.map(Outcome::Tools),
        Invocation::CallTool { name, arguments } => call_tool(settings, &name, arguments)
            .await
            .map(Outcome::Called),
    }
}

/// Discover the server's tools.
pub async fn list_tools(settings: &ConnectionSettings) -> Result<Vec<ToolInfo>, AppError> {
    let mut session = open(settings).await?;
    let outcome = session.list_tools().await;
    session.close().await;
    outcome
}

/// Call one tool.
///
/// The session is closed whether or not the call succeeds, and a failure
/// while closing never replaces the call's own outcome.
pub async fn call_tool(
    settings: &ConnectionSettings,
    name: &str,
    arguments: Map<String, Value>,
) -> Result<CallToolResult, AppError> {
    let mut session = open(settings).await?;
    let outcome = session.call_tool(name, arguments).await;
    session.close().await;
    outcome
}

async fn open(settings: &ConnectionSettings) -> Result<Session, AppError> {
    let config = settings.validate()?;
    let mut session = Session::new(config);
    session.connect().await?;
    Ok(session)
}
