//! mcptool - command-line client for MCP servers
//!
//! Main entry point for the mcptool CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{ConnectionArgs, call, list_tools};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// mcptool - discover and call tools on MCP servers
#[derive(Parser)]
#[command(name = "mcptool")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress progress output and non-error logs
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write JSON logs to a daily rolling file in this directory
    #[arg(long, global = true, env = "MCPTOOL_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the tools a server exposes
    #[command(alias = "tools")]
    ListTools(list_tools::ListToolsArgs),

    /// Call a tool
    Call(call::CallArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Held until exit so buffered file logs are flushed.
    let _guard = init_tracing(&cli);

    let json_output = cli.json;
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            commands::report_error(&err, json_output);
            ExitCode::from(commands::exit_code(&err))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = commands::Context::resolve(&cli.connection, cli.json, cli.quiet, cli.verbose)?;

    match cli.command {
        Commands::ListTools(args) => list_tools::run(args, &ctx).await,
        Commands::Call(args) => call::run(args, &ctx).await,
    }
}

/// Console logs go to stderr; stdout carries results only.
fn init_tracing(cli: &Cli) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let default_filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "mcptool=debug,mcptool_mcp=debug,mcptool_config=debug,info"
    } else {
        "mcptool=info,mcptool_mcp=info,mcptool_config=info,warn"
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let console = tracing_subscriber::fmt::layer()
        .with_target(cli.verbose)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let (file_layer, guard) = match &cli.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "mcptool.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(
                    "mcptool=trace,mcptool_mcp=trace,mcptool_config=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .init();

    guard
}
