//! Workspace config file source: `starkline.toml` in the workspace root.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::File;
use std::path::Path;
use tracing::debug;

pub const WORKSPACE_CONFIG_FILE: &str = "starkline.toml";

/// Add the workspace config file to the builder if present.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> ConfigBuilder<DefaultState> {
    let path = workspace_root.join(WORKSPACE_CONFIG_FILE);
    if path.exists() {
        debug!(config_path = %path.display(), "Using workspace configuration file");
        builder.add_source(File::from(path.as_path()).required(false))
    } else {
        builder
    }
}
