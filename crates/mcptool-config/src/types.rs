//! Configuration types.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Root configuration: named server profiles plus a default.
///
/// ```toml
/// default_server = "local"
///
/// [servers.local]
/// command = "npx -y @modelcontextprotocol/server-everything"
///
/// [servers.prod]
/// transport = "https"
/// url = "https://mcp.example.com/mcp"
/// timeout_secs = 10
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McptoolConfig {
    /// Profile used when none is named.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_server: Option<String>,
    /// Profiles by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub servers: BTreeMap<String, ServerProfile>,
}

/// How to reach one server. Every field is optional; gaps are filled from
/// the environment or command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerProfile {
    /// Transport kind name (`local`, `http`, `https`, `sse`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    /// Server URL for remote transports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Command line for the local transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Bearer token for HTTP(S).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Remote request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ServerProfile {
    /// Request timeout, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Whether the profile stores a token inline.
    pub fn has_plaintext_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

impl McptoolConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Merge another config on top of this one.
    ///
    /// `default_server` is replaced when the other layer sets it. Profiles are
    /// replaced whole, by name.
    pub fn merge(&mut self, other: McptoolConfig) {
        if other.default_server.is_some() {
            self.default_server = other.default_server;
        }
        self.servers.extend(other.servers);
    }

    /// Look up a profile by name.
    pub fn server(&self, name: &str) -> Option<&ServerProfile> {
        self.servers.get(name)
    }

    /// Select the profile to use.
    ///
    /// An explicit name must exist. Without one, `default_server` is used
    /// when set; otherwise no profile applies.
    pub fn select(&self, explicit: Option<&str>) -> Result<Option<(&str, &ServerProfile)>> {
        let Some(name) = explicit.or(self.default_server.as_deref()) else {
            return Ok(None);
        };
        match self.servers.get_key_value(name) {
            Some((name, profile)) => Ok(Some((name.as_str(), profile))),
            None => Err(ConfigError::ServerNotFound {
                name: name.to_string(),
                available: self.available(),
            }),
        }
    }

    fn available(&self) -> String {
        if self.servers.is_empty() {
            "none".to_string()
        } else {
            self.servers
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}
