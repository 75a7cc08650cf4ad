//! Background Contexts
//!
//! A background context hosts one engine instance and is reachable only through
//! asynchronous message passing. Each context runs the same bootstrap protocol:
//! it loads its engine exactly once, parks work that arrives while loading, and
//! then routes every unit, in arrival order, to its capability's entry point.
//!
//! - [`init`]: the single-resolution initialization future
//! - [`router`]: the tagged-state bootstrap and dispatch loop
//! - [`handle`]: the host-side handle used to submit work
//! - [`events`]: lifecycle and dispatch events
//! - [`fault`]: the host-wide fault channel

pub mod events;
pub mod fault;
pub mod handle;
pub mod init;
pub mod router;

pub use events::ContextEvent;
pub use fault::{fault_channel, FaultMonitor, FaultReport, FaultSender};
pub use handle::{ContextHandle, ContextStats, PendingReply};
pub use init::{InitStatus, InitializationFuture};
pub use router::{UnitId, WorkUnit};

use crate::capability::Capability;
use crate::config::ContextConfig;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::debug;

/// Which capability a context serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    Hashing,
    Constraints,
    Proving,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContextKind::Hashing => "hashing",
            ContextKind::Constraints => "constraints",
            ContextKind::Proving => "proving",
        };
        f.write_str(name)
    }
}

/// Process-unique context identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        ContextId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Observable lifecycle state of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

/// Spawn a background context for `capability` on the current tokio runtime.
///
/// Bootstrap starts immediately; work may be submitted through the returned handle
/// right away and is held until the engine is ready.
pub fn spawn<C: Capability>(
    capability: C,
    config: &ContextConfig,
    faults: &FaultSender,
) -> ContextHandle {
    let id = ContextId::next();
    let kind = capability.kind();
    let (sender, inbox) = mpsc::channel(config.inbox_capacity.max(1));
    let (init_tx, init_rx) = watch::channel(InitStatus::Pending);
    let (state_tx, state_rx) = watch::channel(LifecycleState::Uninitialized);
    let (events, _) = broadcast::channel(config.event_capacity.max(1));
    let stats = Arc::new(RwLock::new(ContextStats::default()));

    let runner = router::Runner {
        capability,
        inbox,
        max_pending: config.max_pending.max(1),
        signals: router::Signals {
            id,
            kind,
            init: init_tx,
            state: state_tx,
            events: events.clone(),
            faults: faults.clone(),
            stats: Arc::clone(&stats),
        },
    };
    let task = tokio::spawn(runner.run());

    debug!(context = %id, kind = %kind, "Spawned background context");

    ContextHandle {
        id,
        kind,
        sender,
        init: InitializationFuture::new(kind, init_rx),
        state: state_rx,
        events,
        stats,
        task: Arc::new(Mutex::new(Some(task))),
    }
}
