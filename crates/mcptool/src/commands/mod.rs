//! CLI command handlers.

pub mod call;
pub mod list_tools;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use mcptool_config::{McptoolConfig, ServerProfile, load_config, load_config_file};
use mcptool_mcp::{AppError, ConnectionSettings, ErrorKind};

/// How to reach the server. Flags override environment variables, which
/// override the selected config profile.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Transport: local, http, https or sse (inferred when omitted)
    #[arg(short, long, global = true, env = "MCPTOOL_TRANSPORT")]
    pub transport: Option<String>,

    /// Server URL for http, https and sse transports
    #[arg(short, long, global = true, env = "MCPTOOL_URL")]
    pub url: Option<String>,

    /// Server command line for the local transport (split on whitespace)
    #[arg(short, long, global = true, env = "MCPTOOL_COMMAND")]
    pub command: Option<String>,

    /// Bearer token for http and https transports
    #[arg(long, global = true, env = "MCPTOOL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Request timeout in seconds for remote transports
    #[arg(long, global = true, env = "MCPTOOL_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Named server profile from the config file
    #[arg(short, long, global = true, env = "MCPTOOL_SERVER")]
    pub server: Option<String>,

    /// Config file to use instead of the discovered ones
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Fully resolved connection settings.
    pub settings: ConnectionSettings,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Suppress progress output.
    pub quiet: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Merge config profile, environment and flags into connection settings.
    pub fn resolve(args: &ConnectionArgs, json_output: bool, quiet: bool, verbose: bool) -> Result<Self> {
        let config = load_profiles(args.config.as_deref())?;
        let profile = match config.select(args.server.as_deref())? {
            Some((name, profile)) => {
                tracing::debug!(server = name, "using server profile");
                profile.clone()
            }
            None => ServerProfile::default(),
        };

        let mut settings = merge_settings(args, &profile);
        settings.quiet = quiet;

        Ok(Self {
            settings,
            json_output,
            quiet,
            verbose,
        })
    }

    /// Whether progress indicators should be drawn.
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json_output
    }

    /// Spinner on stderr, hidden when progress output is off.
    pub fn spinner(&self, message: impl Into<String>) -> ProgressBar {
        if !self.show_progress() {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(message.into());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }
}

fn load_profiles(explicit: Option<&std::path::Path>) -> Result<McptoolConfig> {
    if let Some(path) = explicit {
        return load_config_file(path)
            .with_context(|| format!("failed to load config file {}", path.display()));
    }

    let loaded = load_config(None)?;
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    for path in loaded.loaded_from() {
        tracing::debug!(path = %path.display(), "config loaded");
    }
    Ok(loaded.config)
}

/// Flags (and their environment variables) win over the profile.
fn merge_settings(args: &ConnectionArgs, profile: &ServerProfile) -> ConnectionSettings {
    let url = args.url.clone().or_else(|| profile.url.clone());
    let command = args.command.clone().or_else(|| profile.command.clone());
    let transport = args
        .transport
        .clone()
        .or_else(|| profile.transport.clone())
        .unwrap_or_else(|| infer_transport(url.as_deref(), command.as_deref()).to_string());

    ConnectionSettings {
        transport,
        url,
        command,
        bearer_token: args.token.clone().or_else(|| profile.token.clone()),
        timeout: args.timeout.map(Duration::from_secs).or(profile.timeout()),
        ..Default::default()
    }
}

/// Guess the transport from what was supplied.
fn infer_transport(url: Option<&str>, command: Option<&str>) -> &'static str {
    match (url, command) {
        (Some(url), _) if url.trim().to_ascii_lowercase().starts_with("https://") => "https",
        (Some(_), _) => "http",
        _ => "local",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error reporting
// ─────────────────────────────────────────────────────────────────────────────

/// Process exit code for a failed run.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<AppError>().map(AppError::kind) {
        Some(ErrorKind::ServerError | ErrorKind::NotConnected) => 1,
        Some(ErrorKind::ConfigurationError) | None => 2,
        Some(ErrorKind::ConnectionFailed) => 3,
        Some(ErrorKind::ToolNotFound) => 4,
        Some(ErrorKind::InvalidParams) => 5,
    }
}

/// Print a failed run's error. JSON goes to stdout, text to stderr.
pub fn report_error(err: &anyhow::Error, json_output: bool) {
    let app = err.downcast_ref::<AppError>();

    if json_output {
        let body = match app {
            Some(app) => serde_json::json!({ "error": app }),
            None => serde_json::json!({
                "error": { "kind": ErrorKind::ConfigurationError, "message": format!("{:#}", err) }
            }),
        };
        println!("{}", body);
        return;
    }

    match app {
        Some(app) => {
            eprintln!(
                "{} {}",
                style(format!("Error [{}]:", app.kind())).red().bold(),
                app.message()
            );
            if app.kind() == ErrorKind::ToolNotFound {
                eprintln!(
                    "{} run `mcptool list-tools` to see the available tools",
                    style("hint:").cyan()
                );
            }
        }
        None => eprintln!("{} {:#}", style("Error:").red().bold(), err),
    }
}
