//! User config file source: `$XDG_CONFIG_HOME/starkline/config.toml` on Linux, the
//! platform config directory elsewhere.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Path to the user config file.
pub fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "starkline")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Add the user config file to the builder if it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    path: Option<&Path>,
) -> ConfigBuilder<DefaultState> {
    match path {
        Some(path) if path.exists() => {
            debug!(config_path = %path.display(), "Using user configuration file");
            builder.add_source(File::from(path).required(false))
        }
        Some(path) => {
            debug!(config_path = %path.display(), "No user configuration file");
            builder
        }
        None => builder,
    }
}
