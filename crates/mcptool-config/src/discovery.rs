//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/mcptool/config.toml` (XDG user config)
//! 2. `./mcptool.toml` (project-local)
//! 3. Environment variables and CLI arguments (handled by the binary)

use std::path::{Path, PathBuf};

use crate::{ConfigError, McptoolConfig, Result};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "mcptool.toml";

/// Default config filename within XDG config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "mcptool";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "MCPTOOL_CONFIG_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file.
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: McptoolConfig,
    /// Sources that were checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Warnings generated during loading (unreadable layers, inline tokens).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Discover and merge the user and project config layers.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Like [`load_config`], with an explicit user config directory.
///
/// `config_dir` overrides both `MCPTOOL_CONFIG_DIR` and the platform default.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut loaded = LoadedConfig::default();

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    if let Some(path) = user_config_path {
        load_layer(&mut loaded, &path);
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    load_layer(&mut loaded, &project_path);

    check_plaintext_tokens(&loaded.config, &mut loaded.warnings);
    Ok(loaded)
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<McptoolConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    McptoolConfig::from_toml(&contents)
}

/// Path of the user config file.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// The mcptool config directory.
///
/// Checks `MCPTOOL_CONFIG_DIR` first, then falls back to the platform default.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Merge one layer if it exists. Failures become warnings.
fn load_layer(loaded: &mut LoadedConfig, path: &Path) {
    let mut source = ConfigSource {
        path: path.to_path_buf(),
        loaded: false,
    };

    if path.is_file() {
        match load_config_file(path) {
            Ok(layer) => {
                tracing::debug!(path = %path.display(), "loaded config layer");
                loaded.config.merge(layer);
                source.loaded = true;
            }
            Err(e) => {
                loaded
                    .warnings
                    .push(format!("Failed to load {}: {}", path.display(), e));
            }
        }
    }

    loaded.sources.push(source);
}

fn check_plaintext_tokens(config: &McptoolConfig, warnings: &mut Vec<String>) {
    for (name, profile) in &config.servers {
        if profile.has_plaintext_token() {
            warnings.push(format!(
                "[servers.{}] contains a plaintext token. \
                 Consider MCPTOOL_TOKEN or --token instead.",
                name
            ));
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
