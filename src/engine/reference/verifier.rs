//! Proof verification.
//!
//! Replays the transcript from the public inputs and the proof's commitments,
//! checks the proof of work, and authenticates every opened row against the
//! trace commitment.

use crate::engine::reference::constraints::NUM_CONSTRAINTS;
use crate::engine::reference::field::MODULUS;
use crate::engine::reference::merkle::{hash_row, verify_openings, Blake2sDigest};
use crate::engine::reference::options;
use crate::engine::reference::processor::{CLK_COLUMN, MIN_TRACE_LENGTH, TRACE_WIDTH};
use crate::engine::reference::transcript::Transcript;
use crate::engine::reference::EngineError;
use crate::proto::{Digest, MidenPublicInputs, StarkProof};
use prost::Message;

fn reject(reason: impl Into<String>) -> EngineError {
    EngineError::Verification(reason.into())
}

fn digest(value: Option<&Digest>, what: &str) -> Result<Blake2sDigest, EngineError> {
    let value = value.ok_or_else(|| reject(format!("missing {}", what)))?;
    value
        .data
        .as_slice()
        .try_into()
        .map_err(|_| reject(format!("{} is {} bytes, expected 32", what, value.data.len())))
}

pub fn verify(proof: &StarkProof, public_inputs: &MidenPublicInputs) -> Result<(), EngineError> {
    let context = proof
        .context
        .as_ref()
        .ok_or_else(|| reject("missing proof context"))?;
    let proof_options = context
        .options
        .as_ref()
        .ok_or_else(|| reject("missing proof options"))?;
    let params = options::validate(proof_options)?;

    let trace_length = context.trace_length as usize;
    if trace_length < MIN_TRACE_LENGTH || !trace_length.is_power_of_two() {
        return Err(reject(format!("invalid trace length {}", trace_length)));
    }
    if context.trace_width as usize != TRACE_WIDTH {
        return Err(reject(format!("invalid trace width {}", context.trace_width)));
    }
    let modulus = context
        .field_modulus
        .as_ref()
        .map(u64::try_from)
        .transpose()?;
    if modulus != Some(MODULUS) {
        return Err(reject("proof is not over the Goldilocks field"));
    }
    digest(public_inputs.program_hash.as_ref(), "program hash")?;
    if public_inputs.outputs.is_none() {
        return Err(reject("missing program outputs"));
    }

    let trace_root = digest(proof.trace_commitment.as_ref(), "trace commitment")?;
    let constraint_root = digest(proof.constraint_commitment.as_ref(), "constraint commitment")?;

    let mut transcript = Transcript::new(&public_inputs.encode_to_vec());
    transcript.absorb(&trace_root);
    for _ in 0..NUM_CONSTRAINTS {
        transcript.draw_felt();
    }
    transcript.absorb(&constraint_root);
    if !transcript.check_pow(proof.pow_nonce, params.grinding_factor) {
        return Err(reject("insufficient proof of work"));
    }
    transcript.absorb(&proof.pow_nonce.to_le_bytes());

    let positions = transcript.draw_positions(params.num_queries, trace_length);
    let opened: Vec<usize> = proof.queries.iter().map(|q| q.position as usize).collect();
    if opened != positions {
        return Err(reject("query positions do not match the transcript"));
    }

    let mut leaves = Vec::with_capacity(proof.queries.len());
    for query in &proof.queries {
        if query.values.len() != TRACE_WIDTH {
            return Err(reject(format!(
                "row {} has {} values",
                query.position,
                query.values.len()
            )));
        }
        let row = query
            .values
            .iter()
            .map(u64::try_from)
            .collect::<Result<Vec<u64>, _>>()?;
        if row[CLK_COLUMN] != query.position {
            return Err(reject(format!(
                "row {} reports clock {}",
                query.position, row[CLK_COLUMN]
            )));
        }
        leaves.push(hash_row(&row));
    }

    let query_proof = proof
        .query_proof
        .as_ref()
        .ok_or_else(|| reject("missing query proof"))?;
    let nodes = query_proof
        .nodes
        .iter()
        .map(|node| digest(Some(node), "query proof node"))
        .collect::<Result<Vec<_>, _>>()?;

    if !verify_openings(trace_root, &positions, &leaves, trace_length, nodes) {
        return Err(reject("opened rows do not match the trace commitment"));
    }

    Ok(())
}
