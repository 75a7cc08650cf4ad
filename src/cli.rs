//! Command-line surface: argument parsing, the run context and output formatting.

mod output;
mod parse;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, Row};
pub use route::{command_name, RunContext};
