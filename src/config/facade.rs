//! Config loader facade: assembles the layered sources and deserializes the result.

use crate::config::merge::builder_with_defaults;
use crate::config::sources::{environment, global_file, workspace_file};
use crate::config::RuntimeConfig;
use crate::error::ApiError;
use config::File;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Explicit source selection, mostly for tests and embedding hosts
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// User config file; `None` skips the layer
    pub global_file: Option<PathBuf>,
    /// Directory searched for `starkline.toml`; `None` skips the layer
    pub workspace_root: Option<PathBuf>,
    /// Environment variables to read instead of the process environment
    pub environment: Option<HashMap<String, String>>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace from all standard sources.
    pub fn load(workspace_root: &Path) -> Result<RuntimeConfig, ApiError> {
        Self::load_with(ConfigSources {
            global_file: global_file::global_config_path(),
            workspace_root: Some(workspace_root.to_path_buf()),
            environment: None,
        })
    }

    /// Load configuration from the given sources, lowest precedence first:
    /// defaults, user file, workspace file, environment.
    pub fn load_with(sources: ConfigSources) -> Result<RuntimeConfig, ApiError> {
        let mut builder = builder_with_defaults()?;
        builder = global_file::add_to_builder(builder, sources.global_file.as_deref());
        if let Some(root) = sources.workspace_root.as_deref() {
            builder = workspace_file::add_to_builder(builder, root);
        }
        builder = environment::add_to_builder(builder, sources.environment);

        let config: RuntimeConfig = builder.build()?.try_deserialize()?;
        debug!(?config, "Loaded runtime configuration");
        Ok(config)
    }

    /// Load a single config file on top of the defaults. The file must exist.
    pub fn load_from_file(path: &Path) -> Result<RuntimeConfig, ApiError> {
        let config = builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Default configuration without consulting any source.
    pub fn default() -> RuntimeConfig {
        RuntimeConfig::default()
    }

    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
