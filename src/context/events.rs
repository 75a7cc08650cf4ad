//! Context lifecycle and dispatch events.

use crate::context::router::UnitId;
use crate::context::{ContextId, LifecycleState};

/// Event published by a background context.
///
/// Delivery is best effort: subscribers that lag behind lose the oldest events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextEvent {
    StateChanged {
        context: ContextId,
        state: LifecycleState,
    },
    /// Unit arrived while the engine was still loading and was parked.
    UnitDeferred { context: ContextId, unit: UnitId },
    UnitStarted { context: ContextId, unit: UnitId },
    UnitSettled {
        context: ContextId,
        unit: UnitId,
        ok: bool,
    },
    /// Completion sentinel, posted by capabilities that signal it after their
    /// entry point has settled.
    Completion { context: ContextId, unit: UnitId },
}

impl ContextEvent {
    pub fn context(&self) -> ContextId {
        match self {
            ContextEvent::StateChanged { context, .. }
            | ContextEvent::UnitDeferred { context, .. }
            | ContextEvent::UnitStarted { context, .. }
            | ContextEvent::UnitSettled { context, .. }
            | ContextEvent::Completion { context, .. } => *context,
        }
    }
}
