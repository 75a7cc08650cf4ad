//! Built-in defaults, applied underneath every file and environment source.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Worker counts are deliberately absent so they fall back to the available
/// parallelism at spawn time.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("context.inbox_capacity", 1024_i64)?
        .set_default("context.max_pending", 1024_i64)?
        .set_default("context.event_capacity", 256_i64)?
        .set_default("prover.chunk_size", 1024_i64)?
        .set_default("prover.constraint_fragments", 8_i64)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}
