//! CLI output: JSON views of command results and error mapping.

use crate::sdk::ProofBundle;
use serde::Serialize;

/// Map errors to a string for CLI output, including their causes.
pub fn map_error(e: &anyhow::Error) -> String {
    format!("{:#}", e)
}

#[derive(Debug, Serialize)]
pub struct ProveOutput {
    pub sequential: bool,
    pub program_hash: String,
    /// Final stack, top first
    pub stack: Vec<u64>,
    pub trace_length: u64,
    pub trace_commitment: String,
    pub pow_nonce: u64,
    pub queries: usize,
    pub proof_bytes: usize,
}

impl ProveOutput {
    pub fn from_bundle(
        bundle: &ProofBundle,
        sequential: bool,
        proof_bytes: usize,
    ) -> anyhow::Result<Self> {
        let hex_digest = |digest: Option<&crate::proto::Digest>| {
            digest.map(|d| hex::encode(&d.data)).unwrap_or_default()
        };
        Ok(Self {
            sequential,
            program_hash: hex_digest(bundle.public_inputs.program_hash.as_ref()),
            stack: bundle.stack()?,
            trace_length: bundle
                .proof
                .context
                .as_ref()
                .map(|c| c.trace_length)
                .unwrap_or_default(),
            trace_commitment: hex_digest(bundle.proof.trace_commitment.as_ref()),
            pow_nonce: bundle.proof.pow_nonce,
            queries: bundle.proof.queries.len(),
            proof_bytes,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct HashOutput {
    pub rows: usize,
    pub digests: Vec<String>,
}

impl HashOutput {
    pub fn new(digests: &[[u8; 32]]) -> Self {
        Self {
            rows: digests.len(),
            digests: digests.iter().map(hex::encode).collect(),
        }
    }
}

pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
