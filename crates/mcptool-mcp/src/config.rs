//! Connection configuration and its eager validation.
//!
//! [`ConnectionSettings`] is the raw, caller-populated value. Calling
//! [`ConnectionSettings::validate`] checks it once, before any process or
//! socket exists, and yields an immutable [`ConnectionConfig`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderValue;
use url::Url;

use crate::error::AppError;
use crate::transport::LoopbackChannel;
use crate::translate;

/// Default timeout for remote requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Supported transport kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Child process over stdin/stdout.
    Local,
    /// Streamable HTTP over plain HTTP.
    Http,
    /// Streamable HTTP over TLS.
    Https,
    /// Server-Sent Events stream plus POST endpoint.
    Sse,
    /// In-process channel pair, for tests.
    Loopback,
}

impl TransportKind {
    /// Kinds accepted on the command line, in display order.
    pub const PUBLIC: [TransportKind; 4] = [Self::Local, Self::Http, Self::Https, Self::Sse];

    /// Identifier used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Http => "http",
            Self::Https => "https",
            Self::Sse => "sse",
            Self::Loopback => "loopback",
        }
    }

    /// Whether this kind talks to a URL.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Http | Self::Https | Self::Sse)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            "sse" => Ok(Self::Sse),
            "loopback" => Ok(Self::Loopback),
            _ => {
                let expected: Vec<&str> = Self::PUBLIC.iter().map(TransportKind::as_str).collect();
                Err(translate::configuration(format!(
                    "Invalid transport '{}'. Expected one of: {}",
                    s,
                    expected.join(", ")
                )))
            }
        }
    }
}

/// Produces a fresh in-process channel for each loopback connection.
#[derive(Clone)]
pub struct LoopbackConnector(Arc<dyn Fn() -> LoopbackChannel + Send + Sync>);

impl LoopbackConnector {
    /// Wrap a channel factory.
    pub fn new(factory: impl Fn() -> LoopbackChannel + Send + Sync + 'static) -> Self {
        Self(Arc::new(factory))
    }

    pub(crate) fn open(&self) -> LoopbackChannel {
        (self.0)()
    }
}

impl fmt::Debug for LoopbackConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LoopbackConnector(..)")
    }
}

/// Raw connection settings, as supplied by the CLI or a test.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSettings {
    /// Transport kind name (`local`, `http`, `https`, `sse`, `loopback`).
    pub transport: String,
    /// Server URL for remote transports.
    pub url: Option<String>,
    /// Command line for the local transport, split on whitespace.
    pub command: Option<String>,
    /// Bearer token sent on HTTP(S) requests.
    pub bearer_token: Option<String>,
    /// Per-request timeout for remote transports.
    pub timeout: Option<Duration>,
    /// Display hint only.
    pub quiet: bool,
    /// Channel factory for the loopback transport.
    pub loopback: Option<LoopbackConnector>,
}

impl ConnectionSettings {
    /// Settings for a local subprocess server.
    pub fn local(command: impl Into<String>) -> Self {
        Self {
            transport: TransportKind::Local.to_string(),
            command: Some(command.into()),
            ..Default::default()
        }
    }

    /// Settings for a remote server.
    pub fn remote(kind: TransportKind, url: impl Into<String>) -> Self {
        Self {
            transport: kind.to_string(),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Settings for an in-process server.
    pub fn loopback(connector: LoopbackConnector) -> Self {
        Self {
            transport: TransportKind::Loopback.to_string(),
            loopback: Some(connector),
            ..Default::default()
        }
    }

    /// Attach a bearer token.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Set the remote request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validate the settings. The first failing rule wins:
    ///
    /// 1. the transport kind is recognised;
    /// 2. remote kinds have a URL;
    /// 3. `local` has a non-blank command (and `loopback` a connector);
    /// 4. a URL, when present, parses as an absolute URL;
    /// 5. an http(s) bearer token is a valid header value.
    pub fn validate(&self) -> Result<ConnectionConfig, AppError> {
        let kind: TransportKind = self.transport.parse()?;

        let url = non_blank(self.url.as_deref());
        let command = non_blank(self.command.as_deref());

        if kind.is_remote() && url.is_none() {
            return Err(translate::configuration(format!(
                "The {kind} transport needs a URL"
            )));
        }
        if kind == TransportKind::Local && command.is_none() {
            return Err(translate::configuration(format!(
                "The {kind} transport needs a command"
            )));
        }
        if kind == TransportKind::Loopback && self.loopback.is_none() {
            return Err(translate::configuration(
                "The loopback transport needs an in-process channel",
            ));
        }
        let url = url.map(validate_url).transpose()?;

        let bearer_token = self.bearer_token.clone().filter(|t| !t.trim().is_empty());
        if matches!(kind, TransportKind::Http | TransportKind::Https)
            && let Some(token) = &bearer_token
            && HeaderValue::from_str(&format!("Bearer {token}")).is_err()
        {
            return Err(translate::configuration(
                "Bearer token contains characters not allowed in an HTTP header",
            ));
        }

        let target = match kind {
            TransportKind::Local => Target::CommandLine(command.unwrap_or_default().to_string()),
            TransportKind::Http | TransportKind::Https | TransportKind::Sse => match url {
                Some(url) => Target::Url(url),
                None => return Err(translate::configuration("missing URL")),
            },
            TransportKind::Loopback => match &self.loopback {
                Some(connector) => Target::Loopback(connector.clone()),
                None => return Err(translate::configuration("missing loopback channel")),
            },
        };

        Ok(ConnectionConfig {
            kind,
            target,
            bearer_token,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            quiet: self.quiet,
        })
    }
}

/// Check that `raw` is an absolute URL.
pub fn validate_url(raw: &str) -> Result<Url, AppError> {
    Url::parse(raw.trim())
        .map_err(|e| translate::configuration(format!("Invalid URL '{raw}': {e}")))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Where a validated configuration points.
#[derive(Debug, Clone)]
pub enum Target {
    /// Unsplit command line for a local server.
    CommandLine(String),
    /// Remote endpoint.
    Url(Url),
    /// In-process channel factory.
    Loopback(LoopbackConnector),
}

/// Validated, immutable connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    kind: TransportKind,
    target: Target,
    bearer_token: Option<String>,
    timeout: Duration,
    quiet: bool,
}

impl ConnectionConfig {
    /// Selected transport kind.
    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Connection target.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Remote URL, for remote kinds.
    pub fn url(&self) -> Option<&Url> {
        match &self.target {
            Target::Url(url) => Some(url),
            _ => None,
        }
    }

    /// Command line, for the local kind.
    pub fn command_line(&self) -> Option<&str> {
        match &self.target {
            Target::CommandLine(line) => Some(line),
            _ => None,
        }
    }

    /// Bearer token, if configured.
    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    /// Remote request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Display hint.
    pub fn quiet(&self) -> bool {
        self.quiet
    }
}
