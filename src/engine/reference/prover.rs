//! Reference prover.
//!
//! Both proving paths run the same pipeline and differ only in where row hashing
//! and constraint evaluation happen: `prove` fans them out to the worker pool,
//! `prove_sequential` runs them in place. For identical requests they produce
//! identical proofs.

use crate::config::ProverConfig;
use crate::engine::reference::assembly::{InstructionSet, Program};
use crate::engine::reference::constraints::{evaluate_rows, fragment_trace, NUM_CONSTRAINTS};
use crate::engine::reference::field::MODULUS;
use crate::engine::reference::merkle::{blake2s, hash_row, Blake2sDigest, TraceCommitment};
use crate::engine::reference::options::{self, QueryParameters};
use crate::engine::reference::processor::{execute, Execution, TRACE_WIDTH};
use crate::engine::reference::transcript::Transcript;
use crate::engine::reference::{verifier, EngineError};
use crate::engine::ProverEngine;
use crate::error::ApiError;
use crate::pool::WorkerPool;
use crate::proto::{
    decode_message, BatchMerkleProof, Digest, FieldElement, MidenProgram, MidenProgramInputs,
    MidenProgramOutputs, MidenPublicInputs, ProofContext, ProofOptions, StarkProof, TraceQuery,
};
use crate::work::{HashingWorkItem, ProverOutput};
use async_trait::async_trait;
use prost::Message;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub struct ReferenceProver {
    pool: WorkerPool,
    config: ProverConfig,
    instructions: Arc<InstructionSet>,
    generation: u64,
    proofs: u64,
}

impl ReferenceProver {
    pub fn new(pool: WorkerPool, config: ProverConfig, instructions: Arc<InstructionSet>) -> Self {
        Self {
            pool,
            config,
            instructions,
            generation: 0,
            proofs: 0,
        }
    }

    /// Resets performed on the resources behind this prover
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Proofs produced since the last reset
    pub fn proofs(&self) -> u64 {
        self.proofs
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    fn statement(
        &mut self,
        program: &[u8],
        program_inputs: &[u8],
        proof_options: &[u8],
    ) -> Result<Statement, EngineError> {
        let source: MidenProgram = decode_message(program, "program")?;
        let inputs: MidenProgramInputs = decode_message(program_inputs, "program inputs")?;
        let options: ProofOptions = decode_message(proof_options, "proof options")?;
        let params = options::validate(&options)?;

        let program = self.instructions.assemble(&source.program)?;
        let started = Instant::now();
        let execution = execute(&program, &inputs.stack_init, &inputs.advice_tape)?;
        self.proofs += 1;

        debug!(
            generation = self.generation,
            cycles = execution.cycles,
            trace_length = execution.trace.len(),
            duration_ms = started.elapsed().as_millis(),
            "Program executed"
        );

        Ok(Statement::new(program, inputs, options, params, execution))
    }
}

#[async_trait]
impl ProverEngine for ReferenceProver {
    fn reset(&mut self) -> Self {
        Self {
            pool: self.pool.clone(),
            config: self.config.clone(),
            instructions: Arc::clone(&self.instructions),
            generation: self.generation + 1,
            proofs: 0,
        }
    }

    async fn prove(
        &mut self,
        program: &[u8],
        program_inputs: &[u8],
        proof_options: &[u8],
        chunk_size: usize,
    ) -> Result<ProverOutput, ApiError> {
        let started = Instant::now();
        let statement = self.statement(program, program_inputs, proof_options)?;
        let trace = &statement.execution.trace;

        let batches: Vec<HashingWorkItem> = trace
            .chunks(chunk_size.max(1))
            .enumerate()
            .map(|(batch_idx, rows)| HashingWorkItem {
                batch_idx,
                data: rows.to_vec(),
            })
            .collect();
        let row_hashes: Vec<Blake2sDigest> = self
            .pool
            .hash_batches(&batches)
            .await?
            .into_iter()
            .flat_map(|result| result.hashes)
            .collect();

        let committed = statement.commit(&row_hashes)?;

        let fragments = fragment_trace(
            trace,
            self.config.constraint_fragments,
            &committed.coefficients,
        );
        let evaluations: Vec<u64> = self
            .pool
            .evaluate_fragments(&fragments)
            .await?
            .into_iter()
            .flat_map(|result| result.evaluations)
            .collect();

        let output = statement.finish(committed, &evaluations)?;
        info!(
            batches = batches.len(),
            fragments = fragments.len(),
            proof_bytes = output.proof.len(),
            duration_ms = started.elapsed().as_millis(),
            "Proof generated"
        );
        Ok(output)
    }

    fn prove_sequential(
        &mut self,
        program: &[u8],
        program_inputs: &[u8],
        proof_options: &[u8],
    ) -> Result<ProverOutput, ApiError> {
        let started = Instant::now();
        let statement = self.statement(program, program_inputs, proof_options)?;
        let trace = &statement.execution.trace;

        let row_hashes: Vec<Blake2sDigest> = trace.iter().map(|row| hash_row(row)).collect();
        let committed = statement.commit(&row_hashes)?;
        let evaluations =
            evaluate_rows(trace, 0, &committed.coefficients).map_err(EngineError::from)?;

        let output = statement.finish(committed, &evaluations)?;
        info!(
            proof_bytes = output.proof.len(),
            duration_ms = started.elapsed().as_millis(),
            "Proof generated sequentially"
        );
        Ok(output)
    }
}

/// Everything fixed before the first commitment
struct Statement {
    options: ProofOptions,
    params: QueryParameters,
    execution: Execution,
    outputs: MidenProgramOutputs,
    public_inputs: MidenPublicInputs,
}

/// State after committing to the trace
struct Committed {
    commitment: TraceCommitment,
    transcript: Transcript,
    coefficients: Vec<u64>,
}

impl Statement {
    fn new(
        program: Program,
        inputs: MidenProgramInputs,
        options: ProofOptions,
        params: QueryParameters,
        execution: Execution,
    ) -> Self {
        let outputs = MidenProgramOutputs {
            stack: execution.stack.iter().copied().map(FieldElement::from).collect(),
            overflow_addrs: Vec::new(),
        };
        let public_inputs = MidenPublicInputs {
            program_hash: Some(Digest::from(program.hash())),
            stack_inputs: inputs
                .stack_init
                .iter()
                .copied()
                .map(FieldElement::from)
                .collect(),
            outputs: Some(outputs.clone()),
        };
        Self {
            options,
            params,
            execution,
            outputs,
            public_inputs,
        }
    }

    fn commit(&self, row_hashes: &[Blake2sDigest]) -> Result<Committed, EngineError> {
        let trace_length = self.execution.trace.len();
        if row_hashes.len() != trace_length {
            return Err(EngineError::Internal(format!(
                "{} row digests for {} trace rows",
                row_hashes.len(),
                trace_length
            )));
        }
        let commitment = TraceCommitment::new(row_hashes)
            .ok_or_else(|| EngineError::Internal("empty trace".to_string()))?;

        let mut transcript = Transcript::new(&self.public_inputs.encode_to_vec());
        transcript.absorb(&commitment.root());
        let coefficients = (0..NUM_CONSTRAINTS)
            .map(|_| transcript.draw_felt().as_u64())
            .collect();

        Ok(Committed {
            commitment,
            transcript,
            coefficients,
        })
    }

    fn finish(self, committed: Committed, evaluations: &[u64]) -> Result<ProverOutput, EngineError> {
        let Committed {
            commitment,
            mut transcript,
            ..
        } = committed;
        let trace = &self.execution.trace;
        let trace_length = trace.len();

        if evaluations.len() != trace_length - 1 {
            return Err(EngineError::Internal(format!(
                "{} constraint evaluations for {} transitions",
                evaluations.len(),
                trace_length - 1
            )));
        }
        if let Some(transition) = evaluations.iter().position(|e| *e != 0) {
            return Err(EngineError::ConstraintViolation {
                row: transition + 1,
            });
        }

        let mut evaluation_bytes = Vec::with_capacity(evaluations.len() * 8);
        for evaluation in evaluations {
            evaluation_bytes.extend_from_slice(&evaluation.to_le_bytes());
        }
        let constraint_root = blake2s(&evaluation_bytes);
        transcript.absorb(&constraint_root);

        let pow_nonce = transcript.grind(self.params.grinding_factor);
        transcript.absorb(&pow_nonce.to_le_bytes());

        let positions = transcript.draw_positions(self.params.num_queries, trace_length);
        let queries = positions
            .iter()
            .map(|&position| TraceQuery {
                position: position as u64,
                values: trace[position]
                    .iter()
                    .copied()
                    .map(FieldElement::from)
                    .collect(),
            })
            .collect();
        let nodes = commitment
            .open(&positions)
            .into_iter()
            .map(Digest::from)
            .collect();

        let proof = StarkProof {
            context: Some(ProofContext {
                trace_length: trace_length as u64,
                trace_width: TRACE_WIDTH as u32,
                options: Some(self.options.clone()),
                field_modulus: Some(FieldElement::from(MODULUS)),
            }),
            trace_commitment: Some(Digest::from(commitment.root())),
            constraint_commitment: Some(Digest::from(constraint_root)),
            pow_nonce,
            queries,
            query_proof: Some(BatchMerkleProof {
                nodes,
                depth: trace_length.trailing_zeros(),
            }),
        };

        verifier::verify(&proof, &self.public_inputs)?;

        Ok(ProverOutput {
            proof: proof.encode_to_vec(),
            program_outputs: self.outputs.encode_to_vec(),
            public_inputs: self.public_inputs.encode_to_vec(),
        })
    }
}
