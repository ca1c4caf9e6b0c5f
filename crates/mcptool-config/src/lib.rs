//! Configuration for mcptool.
//!
//! Provides TOML-based configuration with:
//! - Named server profiles (`[servers.<name>]`) and a `default_server`
//! - Config file layering (XDG user config + project-local overrides)
//!
//! Environment variables and CLI flags are layered on top by the binary.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    LoadedConfig, load_config, load_config_file, load_config_with_options, xdg_config_dir,
    xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::{McptoolConfig, ServerProfile};
