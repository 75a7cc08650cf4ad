//! Proving entry point.
//!
//! Bootstrap loads the engine and builds the prover once, on top of the shared
//! worker pool. Each unit then gets a freshly reset generation from the session
//! and the context posts a completion sentinel after the entry point settles.

use crate::capability::Capability;
use crate::config::ProverConfig;
use crate::context::ContextKind;
use crate::engine::{Engine, EngineLoader, ProverEngine};
use crate::error::ApiError;
use crate::pool::WorkerPool;
use crate::session::ProverSession;
use crate::work::{self, ProvingWorkItem};
use async_trait::async_trait;
use tracing::{debug, info};

pub struct ProvingCapability<L> {
    loader: L,
    pool: WorkerPool,
    config: ProverConfig,
}

impl<L: EngineLoader> ProvingCapability<L> {
    pub fn new(loader: L, pool: WorkerPool, config: ProverConfig) -> Self {
        Self {
            loader,
            pool,
            config,
        }
    }
}

/// Proving context state after bootstrap
pub struct ProvingReady<E: Engine> {
    engine: E,
    session: ProverSession<E::Prover>,
}

impl<E: Engine> ProvingReady<E> {
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn session(&self) -> &ProverSession<E::Prover> {
        &self.session
    }
}

#[async_trait]
impl<L: EngineLoader> Capability for ProvingCapability<L> {
    type Ready = ProvingReady<L::Engine>;

    fn kind(&self) -> ContextKind {
        ContextKind::Proving
    }

    async fn bootstrap(&self) -> Result<Self::Ready, ApiError> {
        let engine = self.loader.initialize().await?;
        let prover = engine.prover(self.pool.clone(), &self.config)?;
        info!(
            hashing_workers = self.pool.hashing_concurrency(),
            constraint_workers = self.pool.constraint_concurrency(),
            "Prover constructed"
        );

        Ok(ProvingReady {
            engine,
            session: ProverSession::new(prover),
        })
    }

    async fn dispatch(
        &self,
        ready: &mut Self::Ready,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, ApiError> {
        let item: ProvingWorkItem = work::decode(&payload, "proving work item")?;

        let mut generation = ready.session.prepare();
        debug!(
            generation = generation.generation(),
            sequential = item.is_sequential,
            chunk_size = item.chunk_size,
            "Proving with fresh generation"
        );

        let output = if item.is_sequential {
            generation.prover().prove_sequential(
                &item.program,
                &item.program_inputs,
                &item.proof_options,
            )?
        } else {
            generation
                .prover()
                .prove(
                    &item.program,
                    &item.program_inputs,
                    &item.proof_options,
                    item.chunk_size,
                )
                .await?
        };

        work::encode(&output)
    }

    fn posts_completion(&self) -> bool {
        true
    }
}
