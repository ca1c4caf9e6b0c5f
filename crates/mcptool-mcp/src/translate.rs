//! Collapses failure signals into [`AppError`] values.
//!
//! Structured signals are checked before free text, and "not found" before
//! "invalid parameters". Changing that order changes which kind a given
//! server response maps to.

use crate::error::{AppError, ErrorKind, McpError};
use crate::protocol::JsonRpcError;

/// A failure on its way to becoming an [`AppError`].
#[derive(Debug)]
pub enum Failure {
    /// Already translated upstream; passed through unchanged.
    Translated(AppError),
    /// Raw transport or protocol failure.
    Raw(McpError),
}

impl From<AppError> for Failure {
    fn from(err: AppError) -> Self {
        Self::Translated(err)
    }
}

impl From<McpError> for Failure {
    fn from(err: McpError) -> Self {
        Self::Raw(err)
    }
}

/// The operation a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
    /// Discovery.
    ListTools,
    /// Invocation of the named tool.
    CallTool(&'a str),
}

impl Operation<'_> {
    fn label(&self) -> &'static str {
        match self {
            Self::ListTools => "list_tools",
            Self::CallTool(_) => "call_tool",
        }
    }
}

const GENERIC_SERVER_ERROR: &str = "Server error";

/// Translate a failure raised while performing `operation`.
///
/// Discovery has no named resource, so raw failures there always become
/// [`ErrorKind::ServerError`].
pub fn translate(failure: impl Into<Failure>, operation: Operation<'_>) -> AppError {
    let err = match failure.into() {
        Failure::Translated(app) => return app,
        Failure::Raw(err) => err,
    };
    let detail = err.detail();

    let Operation::CallTool(tool) = operation else {
        return server_error(detail, None);
    };

    match err.code() {
        Some(JsonRpcError::METHOD_NOT_FOUND) => {
            return AppError::new(
                ErrorKind::ToolNotFound,
                format!("Tool '{tool}' not found"),
                Some(tool),
            );
        }
        Some(JsonRpcError::INVALID_PARAMS) => {
            return invalid_params(tool, detail.as_deref());
        }
        _ => {}
    }

    let lowered = detail.as_deref().unwrap_or_default().to_lowercase();
    if lowered.contains("not found") {
        let text = detail.as_deref().unwrap_or_default();
        AppError::new(
            ErrorKind::ToolNotFound,
            format!("Tool '{tool}' not found: {text}"),
            Some(tool),
        )
    } else if lowered.contains("invalid parameters") {
        invalid_params(tool, detail.as_deref())
    } else {
        server_error(detail, Some(tool))
    }
}

/// Translate a tool result the server flagged with `isError`.
///
/// `text` is the first content block's text, when present.
pub fn tool_error(tool: &str, text: Option<&str>) -> AppError {
    let text = text.map(str::trim).filter(|t| !t.is_empty());
    match text {
        Some(text) if text.to_lowercase().contains("not found") => AppError::new(
            ErrorKind::ToolNotFound,
            format!("Tool '{tool}' not found: {text}"),
            Some(tool),
        ),
        Some(text) => AppError::new(ErrorKind::ServerError, text, Some(tool)),
        None => AppError::new(
            ErrorKind::ServerError,
            format!("Tool '{tool}' reported an error"),
            Some(tool),
        ),
    }
}

/// Configuration rejected before any I/O.
pub fn configuration(message: impl Into<String>) -> AppError {
    AppError::new(ErrorKind::ConfigurationError, message, None)
}

/// Transport could not be established or the handshake failed.
pub fn connection_failed(cause: &McpError) -> AppError {
    AppError::new(
        ErrorKind::ConnectionFailed,
        format!("Failed to connect to MCP server: {cause}"),
        None,
    )
}

/// Session state forbids the connect attempt.
pub fn connection_refused(reason: &str) -> AppError {
    AppError::new(
        ErrorKind::ConnectionFailed,
        format!("Failed to connect to MCP server: {reason}"),
        None,
    )
}

/// Operation attempted on a session that is not connected.
pub fn not_connected(operation: Operation<'_>) -> AppError {
    let tool = match operation {
        Operation::CallTool(tool) => Some(tool),
        Operation::ListTools => None,
    };
    AppError::new(
        ErrorKind::NotConnected,
        format!(
            "Not connected to an MCP server; call connect() before {}",
            operation.label()
        ),
        tool,
    )
}

/// Tool name rejected before sending.
pub fn empty_tool_name() -> AppError {
    AppError::new(
        ErrorKind::InvalidParams,
        "Tool name must not be empty",
        None,
    )
}

fn invalid_params(tool: &str, detail: Option<&str>) -> AppError {
    let message = match detail {
        Some(detail) => format!("Invalid parameters for tool '{tool}': {detail}"),
        None => format!("Invalid parameters for tool '{tool}'"),
    };
    AppError::new(ErrorKind::InvalidParams, message, Some(tool))
}

fn server_error(detail: Option<String>, tool: Option<&str>) -> AppError {
    AppError::new(
        ErrorKind::ServerError,
        detail.unwrap_or_else(|| GENERIC_SERVER_ERROR.to_string()),
        tool,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(err: McpError) -> AppError {
        translate(err, Operation::CallTool("weather"))
    }

    #[test]
    fn test_translated_errors_pass_through() {
        let original = not_connected(Operation::ListTools);
        let translated = translate(original.clone(), Operation::CallTool("weather"));
        assert_eq!(translated, original);
    }

    #[test]
    fn test_method_not_found_code() {
        let err = call(McpError::rpc(-32601, "Method not found", None));
        assert_eq!(err.kind(), ErrorKind::ToolNotFound);
        assert!(err.message().contains("weather"));
        assert_eq!(err.tool_name(), Some("weather"));
    }

    #[test]
    fn test_invalid_params_code_includes_detail() {
        let err = call(McpError::rpc(-32602, "missing field `city`", None));
        assert_eq!(err.kind(), ErrorKind::InvalidParams);
        assert!(err.message().contains("weather"));
        assert!(err.message().contains("missing field `city`"));
    }

    #[test]
    fn test_code_checked_before_text() {
        // The code says invalid params even though the text says not found.
        let err = call(McpError::rpc(-32602, "Tool weather not found", None));
        assert_eq!(err.kind(), ErrorKind::InvalidParams);
    }

    #[test]
    fn test_not_found_text_is_case_insensitive() {
        let err = call(McpError::rpc(-32603, "Tool NOT FOUND: weather", None));
        assert_eq!(err.kind(), ErrorKind::ToolNotFound);

        let err = call(McpError::transport("endpoint Not Found"));
        assert_eq!(err.kind(), ErrorKind::ToolNotFound);
    }

    #[test]
    fn test_not_found_text_wins_over_invalid_parameters_text() {
        let err = call(McpError::rpc(
            -32000,
            "invalid parameters: tool not found",
            None,
        ));
        assert_eq!(err.kind(), ErrorKind::ToolNotFound);
    }

    #[test]
    fn test_invalid_parameters_text() {
        let err = call(McpError::rpc(-32000, "Invalid Parameters: b is required", None));
        assert_eq!(err.kind(), ErrorKind::InvalidParams);
        assert!(err.message().contains("b is required"));
    }

    #[test]
    fn test_other_failures_become_server_error_verbatim() {
        let err = call(McpError::rpc(-32603, "database exploded", None));
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.message(), "database exploded");
    }

    #[test]
    fn test_empty_message_becomes_generic_server_error() {
        let err = call(McpError::rpc(-32603, "", None));
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.message(), "Server error");
    }

    #[test]
    fn test_list_tools_always_server_error() {
        for raw in [
            McpError::rpc(-32601, "Method not found", None),
            McpError::rpc(-32602, "Invalid params", None),
            McpError::transport("resource not found"),
        ] {
            let err = translate(raw, Operation::ListTools);
            assert_eq!(err.kind(), ErrorKind::ServerError);
            assert_eq!(err.tool_name(), None);
        }
    }

    #[test]
    fn test_tool_error_not_found_text() {
        let err = tool_error("weather", Some("Unknown tool: weather not found"));
        assert_eq!(err.kind(), ErrorKind::ToolNotFound);
        assert!(err.message().contains("weather"));
    }

    #[test]
    fn test_tool_error_carries_reported_text() {
        let err = tool_error("error", Some("This is a test error"));
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.message(), "This is a test error");

        let err = tool_error("error", None);
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert!(err.message().contains("error"));
    }

    #[test]
    fn test_connection_failed_prefix() {
        let err = connection_failed(&McpError::spawn_failed("no such file"));
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
        assert!(err.message().starts_with("Failed to connect to MCP server"));
        assert!(err.message().contains("no such file"));
    }
}
