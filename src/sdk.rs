//! SDK Facade
//!
//! Host-facing entry points. Requests are encoded to protobuf payloads, wrapped in
//! a [`ProvingWorkItem`], and sent to the proving context; replies are decoded back
//! into the proof, program outputs and public inputs.

use crate::capability::ProvingCapability;
use crate::config::RuntimeConfig;
use crate::context::{self, fault_channel, ContextHandle, FaultMonitor};
use crate::engine::EngineLoader;
use crate::error::{ApiError, MalformedInput};
use crate::pool::WorkerPool;
use crate::proto::{
    decode_message, MidenProgram, MidenProgramInputs, MidenProgramOutputs, MidenPublicInputs,
    ProofOptions, StarkProof,
};
use crate::work::{self, HashingWorkItem, ProverOutput, ProvingWorkItem};
use parking_lot::Mutex;
use prost::Message;
use tracing::{debug, info};

/// Decode exactly 8 little-endian bytes into a `u64`.
pub fn u64_from_le_bytes(bytes: &[u8]) -> Result<u64, MalformedInput> {
    let array: [u8; 8] = bytes.try_into().map_err(|_| MalformedInput::InvalidLength {
        expected: 8,
        actual: bytes.len(),
    })?;
    Ok(u64::from_le_bytes(array))
}

/// Decoded result of a proving request
#[derive(Debug, Clone, PartialEq)]
pub struct ProofBundle {
    pub proof: StarkProof,
    pub outputs: MidenProgramOutputs,
    pub public_inputs: MidenPublicInputs,
}

impl ProofBundle {
    fn decode(output: &ProverOutput) -> Result<Self, MalformedInput> {
        Ok(Self {
            proof: decode_message(&output.proof, "proof")?,
            outputs: decode_message(&output.program_outputs, "program outputs")?,
            public_inputs: decode_message(&output.public_inputs, "public inputs")?,
        })
    }

    /// Top of the final stack
    pub fn top(&self) -> Result<Option<u64>, MalformedInput> {
        self.outputs.stack.first().map(u64::try_from).transpose()
    }

    /// Final stack, top first
    pub fn stack(&self) -> Result<Vec<u64>, MalformedInput> {
        self.outputs.stack.iter().map(u64::try_from).collect()
    }
}

/// Client owning the worker pool and the proving context
pub struct ProverClient {
    pool: WorkerPool,
    proving: ContextHandle,
    chunk_size: usize,
    faults: Mutex<Option<FaultMonitor>>,
}

impl ProverClient {
    /// Spawn the worker pool and the proving context.
    ///
    /// Returns immediately; every context bootstraps in the background and requests
    /// made before that finishes are held until it does.
    pub fn start<L: EngineLoader>(loader: L, config: &RuntimeConfig) -> Result<Self, ApiError> {
        config.ensure_valid()?;

        let (fault_sender, fault_monitor) = fault_channel();
        let pool = WorkerPool::spawn(loader.clone(), config, &fault_sender);
        let proving = context::spawn(
            ProvingCapability::new(loader, pool.clone(), config.prover.clone()),
            &config.context,
            &fault_sender,
        );

        info!(
            proving = %proving.id(),
            hashing_workers = pool.hashing_concurrency(),
            constraint_workers = pool.constraint_concurrency(),
            "Prover client started"
        );

        Ok(Self {
            pool,
            proving,
            chunk_size: config.prover.chunk_size,
            faults: Mutex::new(Some(fault_monitor)),
        })
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn proving_context(&self) -> &ContextHandle {
        &self.proving
    }

    /// Prove using the worker pool. `None` options use [`ProofOptions::standard`].
    pub async fn prove(
        &self,
        program: &MidenProgram,
        inputs: &MidenProgramInputs,
        options: Option<ProofOptions>,
    ) -> Result<ProofBundle, ApiError> {
        self.request_proof(program, inputs, options, false).await
    }

    /// Prove inside the proving context without the worker pool.
    pub async fn prove_sequential(
        &self,
        program: &MidenProgram,
        inputs: &MidenProgramInputs,
        options: Option<ProofOptions>,
    ) -> Result<ProofBundle, ApiError> {
        self.request_proof(program, inputs, options, true).await
    }

    async fn request_proof(
        &self,
        program: &MidenProgram,
        inputs: &MidenProgramInputs,
        options: Option<ProofOptions>,
        is_sequential: bool,
    ) -> Result<ProofBundle, ApiError> {
        let options = options.unwrap_or_else(ProofOptions::standard);
        let item = ProvingWorkItem {
            program: program.encode_to_vec(),
            program_inputs: inputs.encode_to_vec(),
            proof_options: options.encode_to_vec(),
            chunk_size: self.chunk_size,
            is_sequential,
        };

        let reply = self.proving.request(work::encode(&item)?).await?;
        let output: ProverOutput = work::decode(&reply, "prover output")?;
        debug!(
            proof_bytes = output.proof.len(),
            sequential = is_sequential,
            "Received prover output"
        );
        Ok(ProofBundle::decode(&output)?)
    }

    /// Hash trace rows on the hashing contexts. Digests come back in row order.
    pub async fn hash_elements(&self, rows: &[Vec<u64>]) -> Result<Vec<[u8; 32]>, ApiError> {
        let items: Vec<HashingWorkItem> = rows
            .chunks(self.chunk_size.max(1))
            .enumerate()
            .map(|(batch_idx, chunk)| HashingWorkItem {
                batch_idx,
                data: chunk.to_vec(),
            })
            .collect();

        let mut results = self.pool.hash_batches(&items).await?;
        results.sort_by_key(|result| result.batch_idx);
        Ok(results.into_iter().flat_map(|result| result.hashes).collect())
    }

    /// Wait until every context has loaded its engine.
    pub async fn initialized(&self) -> Result<(), ApiError> {
        self.pool.initialized().await?;
        self.proving.initialized().await
    }

    /// Take the fault monitor. Only the first call gets it.
    pub fn take_faults(&self) -> Option<FaultMonitor> {
        self.faults.lock().take()
    }

    /// Stop accepting work and wait for every context to finish what it holds.
    pub async fn shutdown(self) {
        let ProverClient { pool, proving, .. } = self;
        // The proving context holds a pool clone; stop it first.
        proving.join().await;
        pool.join().await;
        debug!("Prover client stopped");
    }
}

impl std::fmt::Debug for ProverClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProverClient")
            .field("proving", &self.proving)
            .field("pool", &self.pool)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}
