//! Engine Handle
//!
//! The computation engine is an external collaborator reached through a narrow
//! surface: a loader that initializes an engine instance, pure entry points for
//! hashing and constraint evaluation, and a stateful prover. Every payload crossing
//! this surface is an encoded byte buffer.
//!
//! [`reference`] provides a small self-contained implementation of the surface.

pub mod reference;

use crate::config::ProverConfig;
use crate::error::ApiError;
use crate::pool::WorkerPool;
use crate::work::ProverOutput;
use async_trait::async_trait;

/// Loads engine instances.
///
/// Each background context calls [`EngineLoader::initialize`] once during bootstrap
/// and owns the engine it gets back. Process-wide setup behind the loader happens
/// at most once; if it failed, every call reports the failure.
#[async_trait]
pub trait EngineLoader: Clone + Send + Sync + 'static {
    type Engine: Engine;

    async fn initialize(&self) -> Result<Self::Engine, ApiError>;
}

/// An initialized engine instance, owned by exactly one context
pub trait Engine: Send + 'static {
    type Prover: ProverEngine;

    /// Hash an encoded [`HashingWorkItem`](crate::work::HashingWorkItem), returning an
    /// encoded [`HashingResult`](crate::work::HashingResult).
    fn hash(&self, input: &[u8]) -> Result<Vec<u8>, ApiError>;

    /// Evaluate an encoded [`ConstraintWorkItem`](crate::work::ConstraintWorkItem),
    /// returning an encoded [`ConstraintResult`](crate::work::ConstraintResult).
    fn evaluate_constraints(&self, input: &[u8]) -> Result<Vec<u8>, ApiError>;

    /// Build the stateful prover. Called once, while the proving context bootstraps.
    fn prover(&self, pool: WorkerPool, config: &ProverConfig) -> Result<Self::Prover, ApiError>;
}

/// Stateful proving engine.
#[async_trait]
pub trait ProverEngine: Send + 'static {
    /// A fresh generation backed by the same resources (worker pool, tables).
    fn reset(&mut self) -> Self
    where
        Self: Sized;

    /// Prove, fanning trace hashing and constraint evaluation out to the worker pool.
    /// `chunk_size` is the number of trace rows per hashing batch.
    async fn prove(
        &mut self,
        program: &[u8],
        program_inputs: &[u8],
        proof_options: &[u8],
        chunk_size: usize,
    ) -> Result<ProverOutput, ApiError>;

    /// Prove entirely inside the calling context.
    fn prove_sequential(
        &mut self,
        program: &[u8],
        program_inputs: &[u8],
        proof_options: &[u8],
    ) -> Result<ProverOutput, ApiError>;
}
