//! Hashing entry point.

use crate::capability::Capability;
use crate::context::ContextKind;
use crate::engine::{Engine, EngineLoader};
use crate::error::ApiError;
use async_trait::async_trait;

/// Hashes batches of trace rows
#[derive(Clone)]
pub struct HashingCapability<L> {
    loader: L,
}

impl<L: EngineLoader> HashingCapability<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl<L: EngineLoader> Capability for HashingCapability<L> {
    type Ready = L::Engine;

    fn kind(&self) -> ContextKind {
        ContextKind::Hashing
    }

    async fn bootstrap(&self) -> Result<Self::Ready, ApiError> {
        self.loader.initialize().await
    }

    async fn dispatch(
        &self,
        engine: &mut Self::Ready,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, ApiError> {
        engine.hash(&payload)
    }
}
