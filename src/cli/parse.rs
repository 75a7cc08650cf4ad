//! CLI parse: clap types for Starkline. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// Starkline CLI - prove stack programs on background engine contexts
#[derive(Parser, Debug)]
#[command(name = "starkline")]
#[command(about = "Prove stack programs with a pool of background engine contexts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory, searched for starkline.toml
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path, used with --log-output file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a program and prove its execution
    Prove {
        /// Program source file
        #[arg(long)]
        program: PathBuf,

        /// Initial stack, comma separated; the last value ends up on top
        #[arg(long, value_delimiter = ',')]
        stack_init: Vec<u64>,

        /// Advice tape, comma separated
        #[arg(long, value_delimiter = ',')]
        advice: Vec<u64>,

        /// Prove inside the proving context without the worker pool
        #[arg(long)]
        sequential: bool,

        /// TOML file with proof options (defaults to the standard options)
        #[arg(long)]
        options: Option<PathBuf>,
    },
    /// Hash trace rows on the hashing contexts
    Hash {
        /// One row of comma separated field elements; repeat for more rows
        #[arg(long = "row", required = true)]
        rows: Vec<Row>,
    },
    /// Print the effective configuration
    Config,
}

/// A comma separated row of u64 values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row(pub Vec<u64>);

impl FromStr for Row {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(|value| {
                value
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| format!("invalid element '{}': {}", value.trim(), e))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Row)
    }
}
