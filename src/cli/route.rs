//! CLI route: single route table and run context. Dispatches to the SDK client and output.

use crate::cli::output::{to_json, HashOutput, ProveOutput};
use crate::cli::parse::{Commands, Row};
use crate::config::{ConfigLoader, RuntimeConfig};
use crate::engine::reference::ReferenceLoader;
use crate::proto::{MidenProgram, MidenProgramInputs, ProofOptions};
use crate::sdk::ProverClient;
use anyhow::Context;
use prost::Message;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Runtime context for CLI execution: workspace, config path and the loaded configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: RuntimeConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => ConfigLoader::load(&workspace_root).context("loading configuration")?,
        };
        config.ensure_valid()?;
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Execute a command and return its JSON output.
    pub fn execute(&self, command: &Commands) -> anyhow::Result<String> {
        let started = Instant::now();
        let result = match command {
            Commands::Prove {
                program,
                stack_init,
                advice,
                sequential,
                options,
            } => self.handle_prove(program, stack_init, advice, *sequential, options.as_deref()),
            Commands::Hash { rows } => self.handle_hash(rows),
            Commands::Config => to_json(&self.config),
        };
        info!(
            command = command_name(command),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis(),
            "Command finished"
        );
        result
    }

    fn handle_prove(
        &self,
        program_path: &Path,
        stack_init: &[u64],
        advice: &[u64],
        sequential: bool,
        options_path: Option<&Path>,
    ) -> anyhow::Result<String> {
        let source = std::fs::read_to_string(self.resolve(program_path))
            .with_context(|| format!("reading program {}", program_path.display()))?;
        let program = MidenProgram { program: source };
        let inputs = MidenProgramInputs {
            stack_init: stack_init.to_vec(),
            advice_tape: advice.to_vec(),
        };
        let options = match options_path {
            Some(path) => Some(OptionsFile::load(&self.resolve(path))?),
            None => None,
        };

        let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
        runtime.block_on(async {
            let client = ProverClient::start(ReferenceLoader::new(), &self.config)?;
            let bundle = if sequential {
                client.prove_sequential(&program, &inputs, options).await
            } else {
                client.prove(&program, &inputs, options).await
            };
            client.shutdown().await;
            let bundle = bundle?;
            let output =
                ProveOutput::from_bundle(&bundle, sequential, bundle.proof.encoded_len())?;
            to_json(&output)
        })
    }

    fn handle_hash(&self, rows: &[Row]) -> anyhow::Result<String> {
        let rows: Vec<Vec<u64>> = rows.iter().map(|row| row.0.clone()).collect();
        let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
        runtime.block_on(async {
            let client = ProverClient::start(ReferenceLoader::new(), &self.config)?;
            let digests = client.hash_elements(&rows).await;
            client.shutdown().await;
            to_json(&HashOutput::new(&digests?))
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }
}

pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Prove { .. } => "prove",
        Commands::Hash { .. } => "hash",
        Commands::Config => "config",
    }
}

/// Proof option overrides read from TOML; unset fields keep the standard values.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OptionsFile {
    num_queries: Option<u32>,
    blowup_factor: Option<u32>,
    grinding_factor: Option<u32>,
    fri_folding_factor: Option<u32>,
    fri_max_remainder_size: Option<u32>,
}

impl OptionsFile {
    fn load(path: &Path) -> anyhow::Result<ProofOptions> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading proof options {}", path.display()))?;
        let file: OptionsFile = toml::from_str(&text)
            .with_context(|| format!("parsing proof options {}", path.display()))?;
        Ok(file.apply(ProofOptions::standard()))
    }

    fn apply(self, mut options: ProofOptions) -> ProofOptions {
        if let Some(value) = self.num_queries {
            options.num_queries = value;
        }
        if let Some(value) = self.blowup_factor {
            options.blowup_factor = value;
        }
        if let Some(value) = self.grinding_factor {
            options.grinding_factor = value;
        }
        if let Some(value) = self.fri_folding_factor {
            options.fri_folding_factor = value;
        }
        if let Some(value) = self.fri_max_remainder_size {
            options.fri_max_remainder_size = value;
        }
        options
    }
}
