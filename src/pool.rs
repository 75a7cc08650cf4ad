//! Worker Pool
//!
//! Hashing and constraint-evaluation contexts shared by the prover. Batches are
//! routed by index modulo the number of contexts of that kind, so a given batch
//! index always lands on the same context and each context keeps its own FIFO.

use crate::capability::{ConstraintCapability, HashingCapability};
use crate::config::RuntimeConfig;
use crate::context::{self, ContextHandle, ContextKind, FaultSender};
use crate::engine::EngineLoader;
use crate::error::ApiError;
use crate::work::{self, ConstraintResult, ConstraintWorkItem, HashingResult, HashingWorkItem};
use futures::future::{join_all, try_join_all};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cheaply cloneable set of hashing and constraint contexts
#[derive(Clone, Debug)]
pub struct WorkerPool {
    hashing: Arc<Vec<ContextHandle>>,
    constraints: Arc<Vec<ContextHandle>>,
}

/// Worker count used when the configuration leaves it open
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl WorkerPool {
    /// Spawn the configured number of hashing and constraint contexts.
    pub fn spawn<L: EngineLoader>(loader: L, config: &RuntimeConfig, faults: &FaultSender) -> Self {
        let hashing_workers = config
            .pool
            .hashing_workers
            .unwrap_or_else(default_concurrency)
            .max(1);
        let constraint_workers = config
            .pool
            .constraint_workers
            .unwrap_or_else(default_concurrency)
            .max(1);

        let hashing = (0..hashing_workers)
            .map(|_| {
                context::spawn(
                    HashingCapability::new(loader.clone()),
                    &config.context,
                    faults,
                )
            })
            .collect();
        let constraints = (0..constraint_workers)
            .map(|_| {
                context::spawn(
                    ConstraintCapability::new(loader.clone()),
                    &config.context,
                    faults,
                )
            })
            .collect();

        info!(hashing_workers, constraint_workers, "Spawned worker pool");

        Self::from_contexts(hashing, constraints)
    }

    /// Build a pool from already spawned contexts.
    pub fn from_contexts(hashing: Vec<ContextHandle>, constraints: Vec<ContextHandle>) -> Self {
        Self {
            hashing: Arc::new(hashing),
            constraints: Arc::new(constraints),
        }
    }

    pub fn hashing_concurrency(&self) -> usize {
        self.hashing.len()
    }

    pub fn constraint_concurrency(&self) -> usize {
        self.constraints.len()
    }

    pub fn hashing_contexts(&self) -> &[ContextHandle] {
        &self.hashing
    }

    pub fn constraint_contexts(&self) -> &[ContextHandle] {
        &self.constraints
    }

    fn route(contexts: &[ContextHandle], index: usize, kind: ContextKind) -> Result<&ContextHandle, ApiError> {
        if contexts.is_empty() {
            return Err(ApiError::ContextClosed(kind));
        }
        Ok(&contexts[index % contexts.len()])
    }

    /// Hash one batch of rows on the context selected by its batch index.
    pub async fn hash_batch(&self, item: &HashingWorkItem) -> Result<HashingResult, ApiError> {
        let context = Self::route(&self.hashing, item.batch_idx, ContextKind::Hashing)?;
        debug!(
            context = %context.id(),
            batch_idx = item.batch_idx,
            rows = item.data.len(),
            "Routing hashing batch"
        );
        let reply = context.request(work::encode(item)?).await?;
        let result: HashingResult = work::decode(&reply, "hashing result")?;
        if result.batch_idx != item.batch_idx || result.hashes.len() != item.data.len() {
            return Err(ApiError::EngineInvocationFailure(format!(
                "hashing context answered batch {} with {} digests for batch {} of {} rows",
                result.batch_idx,
                result.hashes.len(),
                item.batch_idx,
                item.data.len()
            )));
        }
        Ok(result)
    }

    /// Hash every batch concurrently; results come back in the order given.
    pub async fn hash_batches(
        &self,
        items: &[HashingWorkItem],
    ) -> Result<Vec<HashingResult>, ApiError> {
        try_join_all(items.iter().map(|item| self.hash_batch(item))).await
    }

    /// Evaluate one constraint fragment on the context selected by its offset.
    pub async fn evaluate_fragment(
        &self,
        item: &ConstraintWorkItem,
    ) -> Result<ConstraintResult, ApiError> {
        let context = Self::route(&self.constraints, item.fragment_offset, ContextKind::Constraints)?;
        debug!(
            context = %context.id(),
            fragment_offset = item.fragment_offset,
            rows = item.rows.len(),
            "Routing constraint fragment"
        );
        let reply = context.request(work::encode(item)?).await?;
        let result: ConstraintResult = work::decode(&reply, "constraint result")?;
        if result.fragment_offset != item.fragment_offset {
            return Err(ApiError::EngineInvocationFailure(format!(
                "constraint context answered fragment {} for fragment {}",
                result.fragment_offset, item.fragment_offset
            )));
        }
        Ok(result)
    }

    /// Evaluate every fragment concurrently; results come back in the order given.
    pub async fn evaluate_fragments(
        &self,
        items: &[ConstraintWorkItem],
    ) -> Result<Vec<ConstraintResult>, ApiError> {
        try_join_all(items.iter().map(|item| self.evaluate_fragment(item))).await
    }

    /// Wait until every context in the pool has loaded its engine.
    pub async fn initialized(&self) -> Result<(), ApiError> {
        let all = self.hashing.iter().chain(self.constraints.iter());
        try_join_all(all.map(|context| context.initialized())).await?;
        Ok(())
    }

    /// Drop this pool and wait for its contexts to stop.
    ///
    /// Contexts only stop once every clone of the pool is gone; if another clone is
    /// still alive the handles are released without waiting.
    pub async fn join(self) {
        let WorkerPool {
            hashing,
            constraints,
        } = self;

        for contexts in [hashing, constraints] {
            match Arc::try_unwrap(contexts) {
                Ok(contexts) => {
                    join_all(contexts.into_iter().map(ContextHandle::join)).await;
                }
                Err(_) => {
                    warn!("Worker pool still shared, not waiting for its contexts");
                }
            }
        }
    }
}
