//! Work Items
//!
//! Payloads carried between the host and background contexts. Each context receives
//! untyped bytes; these structs are the `bincode` encodings the entry points agree on.

use crate::error::{ApiError, MalformedInput};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A batch of trace rows to hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashingWorkItem {
    pub batch_idx: usize,
    pub data: Vec<Vec<u64>>,
}

/// Row digests for one batch, in row order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashingResult {
    pub batch_idx: usize,
    pub hashes: Vec<[u8; 32]>,
}

/// One fragment of transition-constraint evaluation.
///
/// `rows` holds every row the fragment's transitions touch, so a fragment covering
/// transitions `first_row..first_row + n` carries `n + 1` rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintWorkItem {
    pub fragment_offset: usize,
    pub num_fragments: usize,
    pub first_row: usize,
    pub rows: Vec<Vec<u64>>,
    pub coefficients: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintResult {
    pub fragment_offset: usize,
    pub num_fragments: usize,
    pub evaluations: Vec<u64>,
}

/// Proving request sent to the proving context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvingWorkItem {
    pub program: Vec<u8>,
    pub program_inputs: Vec<u8>,
    pub proof_options: Vec<u8>,
    /// Rows per hashing batch when proving in parallel
    pub chunk_size: usize,
    pub is_sequential: bool,
}

/// Encoded proof, program outputs and public inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProverOutput {
    pub proof: Vec<u8>,
    pub program_outputs: Vec<u8>,
    pub public_inputs: Vec<u8>,
}

pub fn encode<T: Serialize>(item: &T) -> Result<Vec<u8>, ApiError> {
    bincode::serialize(item)
        .map_err(|e| ApiError::EngineInvocationFailure(format!("Failed to encode work item: {}", e)))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8], what: &'static str) -> Result<T, MalformedInput> {
    bincode::deserialize(bytes).map_err(|e| MalformedInput::Decode {
        what,
        reason: e.to_string(),
    })
}
