//! Mock MCP server for integration testing.
//!
//! Speaks newline-delimited JSON-RPC on stdin/stdout and exposes the tools
//! `echo`, `add` and `error`.
//!
//! Usage:
//!   mock-mcp-server [--page-size N] [--unknown-as-invalid] [--chatty] [--crash-on TOOL]
//!                   [--cycle-cursor] [--odd-schema]
//!
//! Options:
//!   --page-size N          Paginate tools/list with N tools per page
//!   --unknown-as-invalid   Report unknown tools with -32602 instead of -32601
//!   --chatty               Send a notification before every response
//!   --crash-on TOOL        Exit when TOOL is called
//!   --cycle-cursor         Page tools/list with cursors that cycle A -> B -> A
//!   --odd-schema           Also list a tool with a boolean property schema

#[path = "support/mock_tools.rs"]
mod mock_tools;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let options = mock_tools::MockOptions::from_args(std::env::args().skip(1));
    mock_tools::serve(tokio::io::stdin(), tokio::io::stdout(), options).await;
}
