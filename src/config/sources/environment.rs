//! Environment source: `STARKLINE__SECTION__KEY=value`.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;
use std::collections::HashMap;

pub const ENV_PREFIX: &str = "STARKLINE";
pub const ENV_SEPARATOR: &str = "__";

/// Add the environment layer. `overrides` replaces the process environment when set.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    overrides: Option<HashMap<String, String>>,
) -> ConfigBuilder<DefaultState> {
    let environment = Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
        .source(overrides.map(|vars| vars.into_iter().collect::<config::Map<_, _>>()));
    builder.add_source(environment)
}
