//! Capabilities
//!
//! A capability is what a background context does once its engine is ready. The
//! context runtime is generic over it: bootstrap produces the capability's ready
//! state, and every routed unit is handed to [`Capability::dispatch`].

pub mod constraints;
pub mod hashing;
pub mod proving;

pub use constraints::ConstraintCapability;
pub use hashing::HashingCapability;
pub use proving::{ProvingCapability, ProvingReady};

use crate::context::ContextKind;
use crate::error::ApiError;
use async_trait::async_trait;

#[async_trait]
pub trait Capability: Send + Sync + 'static {
    /// State owned by the context after a successful bootstrap
    type Ready: Send + 'static;

    fn kind(&self) -> ContextKind;

    /// One-time engine initialization. Runs exactly once per context lifetime.
    async fn bootstrap(&self) -> Result<Self::Ready, ApiError>;

    /// Forward one payload to the entry point and return the raw reply.
    async fn dispatch(&self, ready: &mut Self::Ready, payload: Vec<u8>)
        -> Result<Vec<u8>, ApiError>;

    /// Whether the context posts a completion sentinel after each dispatch.
    fn posts_completion(&self) -> bool {
        false
    }
}
