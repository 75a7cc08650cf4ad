//! Host-side handle to a background context.

use crate::context::events::ContextEvent;
use crate::context::init::InitializationFuture;
use crate::context::router::{UnitId, WorkUnit};
use crate::context::{ContextId, ContextKind, LifecycleState};
use crate::error::ApiError;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Per-context counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextStats {
    /// Units accepted into the inbox
    pub submitted: usize,
    /// Units parked while the engine was loading
    pub deferred: usize,
    pub processed: usize,
    pub failed: usize,
}

/// Cloneable handle used to submit work to a context.
///
/// The context stops once every handle (and every clone) has been dropped and its
/// remaining units have been answered.
#[derive(Clone)]
pub struct ContextHandle {
    pub(crate) id: ContextId,
    pub(crate) kind: ContextKind,
    pub(crate) sender: mpsc::Sender<WorkUnit>,
    pub(crate) init: InitializationFuture,
    pub(crate) state: watch::Receiver<LifecycleState>,
    pub(crate) events: broadcast::Sender<ContextEvent>,
    pub(crate) stats: Arc<RwLock<ContextStats>>,
    pub(crate) task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

/// Reply for a unit that has been accepted by a context
#[derive(Debug)]
pub struct PendingReply {
    unit: UnitId,
    kind: ContextKind,
    receiver: oneshot::Receiver<Result<Vec<u8>, ApiError>>,
}

impl PendingReply {
    pub fn unit(&self) -> UnitId {
        self.unit
    }

    /// Wait for the context to answer.
    pub async fn recv(self) -> Result<Vec<u8>, ApiError> {
        self.receiver
            .await
            .map_err(|_| ApiError::ContextClosed(self.kind))?
    }
}

impl ContextHandle {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// The context's initialization future
    pub fn initialization(&self) -> InitializationFuture {
        self.init.clone()
    }

    /// Wait until the engine is ready; fails if bootstrap failed.
    pub async fn initialized(&self) -> Result<(), ApiError> {
        self.init.clone().wait().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContextEvent> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> ContextStats {
        self.stats.read().clone()
    }

    /// Hand a payload to the context without waiting for the answer.
    ///
    /// Waits only for room in the inbox. Units are processed in the order they are
    /// accepted here.
    pub async fn submit(&self, payload: Vec<u8>) -> Result<PendingReply, ApiError> {
        let (reply, receiver) = oneshot::channel();
        let unit = WorkUnit::new(payload, reply);
        let unit_id = unit.id();

        self.sender
            .send(unit)
            .await
            .map_err(|_| ApiError::ContextClosed(self.kind))?;
        self.stats.write().submitted += 1;

        debug!(context = %self.id, kind = %self.kind, unit = %unit_id, "Submitted unit");

        Ok(PendingReply {
            unit: unit_id,
            kind: self.kind,
            receiver,
        })
    }

    /// Submit a payload and wait for its reply.
    pub async fn request(&self, payload: Vec<u8>) -> Result<Vec<u8>, ApiError> {
        self.submit(payload).await?.recv().await
    }

    /// Drop this handle and wait for the context task to finish.
    ///
    /// Only returns once every other clone of the handle is gone as well.
    pub async fn join(self) {
        let task = self.task.lock().take();
        let id = self.id;
        drop(self);

        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(context = %id, error = %e, "Context task ended abnormally");
            }
        }
    }
}

impl std::fmt::Debug for ContextHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}
