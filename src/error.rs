//! Error types for the Starkline proving runtime.

use crate::context::ContextKind;
use thiserror::Error;

/// Input that could not be interpreted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedInput {
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },
}

/// Runtime and API errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// The engine failed to load inside a background context. Fatal to that context.
    #[error("Engine bootstrap failed in {kind} context: {reason}")]
    BootstrapFailure { kind: ContextKind, reason: String },

    /// Internal: a unit reached the router before bootstrap settled.
    #[error("Dispatch attempted before the {0} context was ready")]
    DispatchBeforeReady(ContextKind),

    /// The engine rejected or failed a single unit of work.
    #[error("Engine invocation failed: {0}")]
    EngineInvocationFailure(String),

    /// The engine panicked earlier; the context no longer accepts work.
    #[error("{kind} context is poisoned after an engine panic: {reason}")]
    ContextPoisoned { kind: ContextKind, reason: String },

    #[error("{0} context is closed")]
    ContextClosed(ContextKind),

    #[error("Malformed input: {0}")]
    MalformedInput(#[from] MalformedInput),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ApiError {
    /// True for failures that leave the context unable to serve further work.
    pub fn is_context_fatal(&self) -> bool {
        matches!(
            self,
            ApiError::BootstrapFailure { .. }
                | ApiError::ContextPoisoned { .. }
                | ApiError::ContextClosed(_)
        )
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
