//! Reference Engine
//!
//! A small, deterministic stand-in for the external proving engine: a stack
//! machine over the Goldilocks field, BLAKE2s trace commitments, and a
//! Fiat-Shamir query phase. It exercises the full engine surface (row hashing,
//! fragment evaluation, stateful proving with reset) without being a production
//! STARK.

pub mod assembly;
pub mod constraints;
pub mod field;
pub mod merkle;
pub mod options;
pub mod processor;
pub mod prover;
pub mod transcript;
pub mod verifier;

pub use prover::ReferenceProver;

use crate::config::ProverConfig;
use crate::engine::{Engine, EngineLoader};
use crate::error::{ApiError, MalformedInput};
use crate::pool::WorkerPool;
use crate::work::{self, ConstraintResult, ConstraintWorkItem, HashingResult, HashingWorkItem};
use assembly::{AssemblyError, InstructionSet};
use async_trait::async_trait;
use constraints::ConstraintError;
use processor::ExecutionError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("assembly failed: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("execution failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("constraint evaluation failed: {0}")]
    Constraints(#[from] ConstraintError),

    #[error(transparent)]
    Malformed(#[from] MalformedInput),

    #[error("unsupported proof options: {0}")]
    UnsupportedOptions(String),

    #[error("trace violates transition constraints at row {row}")]
    ConstraintViolation { row: usize },

    #[error("proof failed verification: {0}")]
    Verification(String),

    #[error("internal prover error: {0}")]
    Internal(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Malformed(input) => ApiError::MalformedInput(input),
            other => ApiError::EngineInvocationFailure(other.to_string()),
        }
    }
}

/// Loads [`ReferenceEngine`] instances.
///
/// The instruction table is built once per loader and its clones; every context
/// gets its own engine sharing that table.
#[derive(Clone, Default)]
pub struct ReferenceLoader {
    instructions: Arc<OnceCell<Arc<InstructionSet>>>,
    setups: Arc<AtomicUsize>,
}

impl ReferenceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the process-level setup has run
    pub fn setup_count(&self) -> usize {
        self.setups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineLoader for ReferenceLoader {
    type Engine = ReferenceEngine;

    async fn initialize(&self) -> Result<ReferenceEngine, ApiError> {
        let instructions = self
            .instructions
            .get_or_try_init(|| async {
                self.setups.fetch_add(1, Ordering::SeqCst);
                let set = InstructionSet::standard();
                if set.is_empty() {
                    return Err(ApiError::EngineInvocationFailure(
                        "instruction table is empty".to_string(),
                    ));
                }
                info!(instructions = set.len(), "Reference engine loaded");
                Ok(Arc::new(set))
            })
            .await?;

        Ok(ReferenceEngine {
            instructions: Arc::clone(instructions),
        })
    }
}

/// Engine instance owned by one context
pub struct ReferenceEngine {
    instructions: Arc<InstructionSet>,
}

impl Engine for ReferenceEngine {
    type Prover = ReferenceProver;

    fn hash(&self, input: &[u8]) -> Result<Vec<u8>, ApiError> {
        let item: HashingWorkItem = work::decode(input, "hashing work item")?;
        let hashes = item.data.iter().map(|row| merkle::hash_row(row)).collect();
        debug!(batch_idx = item.batch_idx, rows = item.data.len(), "Hashed batch");
        work::encode(&HashingResult {
            batch_idx: item.batch_idx,
            hashes,
        })
    }

    fn evaluate_constraints(&self, input: &[u8]) -> Result<Vec<u8>, ApiError> {
        let item: ConstraintWorkItem = work::decode(input, "constraint work item")?;
        let evaluations =
            constraints::evaluate_rows(&item.rows, item.first_row, &item.coefficients)
                .map_err(EngineError::from)?;
        debug!(
            fragment_offset = item.fragment_offset,
            transitions = evaluations.len(),
            "Evaluated constraint fragment"
        );
        work::encode(&ConstraintResult {
            fragment_offset: item.fragment_offset,
            num_fragments: item.num_fragments,
            evaluations,
        })
    }

    fn prover(&self, pool: WorkerPool, config: &ProverConfig) -> Result<ReferenceProver, ApiError> {
        Ok(ReferenceProver::new(
            pool,
            config.clone(),
            Arc::clone(&self.instructions),
        ))
    }
}
