//! Constraint evaluation entry point.

use crate::capability::Capability;
use crate::context::ContextKind;
use crate::engine::{Engine, EngineLoader};
use crate::error::ApiError;
use async_trait::async_trait;

/// Evaluates transition-constraint fragments
#[derive(Clone)]
pub struct ConstraintCapability<L> {
    loader: L,
}

impl<L: EngineLoader> ConstraintCapability<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl<L: EngineLoader> Capability for ConstraintCapability<L> {
    type Ready = L::Engine;

    fn kind(&self) -> ContextKind {
        ContextKind::Constraints
    }

    async fn bootstrap(&self) -> Result<Self::Ready, ApiError> {
        self.loader.initialize().await
    }

    async fn dispatch(
        &self,
        engine: &mut Self::Ready,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, ApiError> {
        engine.evaluate_constraints(&payload)
    }
}
