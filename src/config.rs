//! Configuration System
//!
//! Layered runtime configuration: built-in defaults, the user config file, the
//! workspace `starkline.toml`, then `STARKLINE__*` environment variables.

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

mod facade;
mod merge;
mod sources;

pub use facade::{ConfigLoader, ConfigSources};
pub use sources::global_file::global_config_path;
pub use sources::workspace_file::WORKSPACE_CONFIG_FILE;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub prover: ProverConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Per-context transport limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Bounded inbox between host and context
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,

    /// Units parked while the engine is loading; beyond this, senders wait
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,

    /// Lifecycle event buffer per context
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_inbox_capacity() -> usize {
    1024
}

fn default_max_pending() -> usize {
    1024
}

fn default_event_capacity() -> usize {
    256
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: default_inbox_capacity(),
            max_pending: default_max_pending(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// Worker pool sizing. Unset counts use the available parallelism.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default)]
    pub hashing_workers: Option<usize>,

    #[serde(default)]
    pub constraint_workers: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProverConfig {
    /// Trace rows per hashing batch
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Number of fragments constraint evaluation is split into
    #[serde(default = "default_constraint_fragments")]
    pub constraint_fragments: usize,
}

fn default_chunk_size() -> usize {
    1024
}

fn default_constraint_fragments() -> usize {
    8
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            constraint_fragments: default_constraint_fragments(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Context(String),
    Pool(String),
    Prover(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Context(msg) => write!(f, "context: {}", msg),
            ValidationError::Pool(msg) => write!(f, "pool: {}", msg),
            ValidationError::Prover(msg) => write!(f, "prover: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl RuntimeConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let context = [
            ("inbox_capacity", self.context.inbox_capacity),
            ("max_pending", self.context.max_pending),
            ("event_capacity", self.context.event_capacity),
        ];
        for (name, value) in context {
            if value == 0 {
                errors.push(ValidationError::Context(format!("{} must be at least 1", name)));
            }
        }

        let pool = [
            ("hashing_workers", self.pool.hashing_workers),
            ("constraint_workers", self.pool.constraint_workers),
        ];
        for (name, value) in pool {
            if value == Some(0) {
                errors.push(ValidationError::Pool(format!("{} must be at least 1", name)));
            }
        }

        if self.prover.chunk_size == 0 {
            errors.push(ValidationError::Prover(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.prover.constraint_fragments == 0 {
            errors.push(ValidationError::Prover(
                "constraint_fragments must be at least 1".to_string(),
            ));
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, folding every problem into one error.
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }
}
