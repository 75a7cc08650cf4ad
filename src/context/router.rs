//! Bootstrap Protocol and Message Router
//!
//! Every context runs [`Runner::run`]: it moves `Uninitialized -> Initializing`,
//! loads its engine once, and settles in `Ready` or `Failed`. Units that arrive
//! while the engine is loading are parked in a FIFO and routed first once
//! bootstrap settles, so arrival order is preserved across the transition.
//!
//! Within one context units are dispatched strictly one at a time. There is no
//! cancellation: a dispatched unit runs to completion even if its caller stopped
//! waiting for the reply.

use crate::capability::Capability;
use crate::context::events::ContextEvent;
use crate::context::fault::FaultSender;
use crate::context::handle::ContextStats;
use crate::context::init::InitStatus;
use crate::context::{ContextId, ContextKind, LifecycleState};
use crate::error::ApiError;
use futures::FutureExt;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, warn};

/// Identifier of one unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(u64);

impl UnitId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        UnitId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit-{}", self.0)
    }
}

/// One inbound message: an untyped payload plus its reply channel
#[derive(Debug)]
pub struct WorkUnit {
    pub(crate) id: UnitId,
    pub(crate) payload: Vec<u8>,
    pub(crate) reply: oneshot::Sender<Result<Vec<u8>, ApiError>>,
    pub(crate) submitted_at: Instant,
}

impl WorkUnit {
    pub(crate) fn new(
        payload: Vec<u8>,
        reply: oneshot::Sender<Result<Vec<u8>, ApiError>>,
    ) -> Self {
        Self {
            id: UnitId::next(),
            payload,
            reply,
            submitted_at: Instant::now(),
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }
}

/// Why a context stopped accepting work
#[derive(Debug, Clone)]
enum Failure {
    Bootstrap(String),
    Poisoned(String),
}

impl Failure {
    fn to_error(&self, kind: ContextKind) -> ApiError {
        match self {
            Failure::Bootstrap(reason) => ApiError::BootstrapFailure {
                kind,
                reason: reason.clone(),
            },
            Failure::Poisoned(reason) => ApiError::ContextPoisoned {
                kind,
                reason: reason.clone(),
            },
        }
    }
}

/// Tagged context state; `Ready` owns the capability's engine state.
enum ContextState<R> {
    Uninitialized,
    Initializing,
    Ready(R),
    Failed(Failure),
}

impl<R> ContextState<R> {
    fn lifecycle(&self) -> LifecycleState {
        match self {
            ContextState::Uninitialized => LifecycleState::Uninitialized,
            ContextState::Initializing => LifecycleState::Initializing,
            ContextState::Ready(_) => LifecycleState::Ready,
            ContextState::Failed(_) => LifecycleState::Failed,
        }
    }
}

/// Everything a context publishes to the outside world
pub(crate) struct Signals {
    pub(crate) id: ContextId,
    pub(crate) kind: ContextKind,
    pub(crate) init: watch::Sender<InitStatus>,
    pub(crate) state: watch::Sender<LifecycleState>,
    pub(crate) events: broadcast::Sender<ContextEvent>,
    pub(crate) faults: FaultSender,
    pub(crate) stats: Arc<RwLock<ContextStats>>,
}

impl Signals {
    fn emit(&self, event: ContextEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn transition(&self, state: LifecycleState) {
        self.state.send_replace(state);
        debug!(context = %self.id, kind = %self.kind, state = ?state, "Context state changed");
        self.emit(ContextEvent::StateChanged {
            context: self.id,
            state,
        });
    }
}

pub(crate) struct Runner<C: Capability> {
    pub(crate) capability: C,
    pub(crate) inbox: mpsc::Receiver<WorkUnit>,
    pub(crate) max_pending: usize,
    pub(crate) signals: Signals,
}

impl<C: Capability> Runner<C> {
    pub(crate) async fn run(self) {
        let Runner {
            capability,
            mut inbox,
            max_pending,
            signals,
        } = self;

        let mut state: ContextState<C::Ready> = ContextState::Uninitialized;
        debug_assert_eq!(state.lifecycle(), LifecycleState::Uninitialized);

        state = ContextState::Initializing;
        signals.transition(state.lifecycle());
        info!(context = %signals.id, kind = %signals.kind, "Bootstrapping engine");
        let bootstrap_started = Instant::now();

        let mut pending: VecDeque<WorkUnit> = VecDeque::new();
        let outcome = {
            let bootstrap = AssertUnwindSafe(capability.bootstrap()).catch_unwind();
            tokio::pin!(bootstrap);
            let mut inbox_open = true;

            loop {
                tokio::select! {
                    biased;
                    outcome = &mut bootstrap => break outcome.unwrap_or_else(|panic| {
                        Err(ApiError::EngineInvocationFailure(format!(
                            "engine panicked while loading: {}",
                            panic_message(panic.as_ref())
                        )))
                    }),
                    unit = inbox.recv(), if inbox_open && pending.len() < max_pending => {
                        match unit {
                            Some(unit) => {
                                debug!(
                                    context = %signals.id,
                                    unit = %unit.id,
                                    pending = pending.len() + 1,
                                    "Deferring unit until engine is ready"
                                );
                                signals.stats.write().deferred += 1;
                                signals.emit(ContextEvent::UnitDeferred {
                                    context: signals.id,
                                    unit: unit.id,
                                });
                                pending.push_back(unit);
                            }
                            None => inbox_open = false,
                        }
                    }
                }
            }
        };

        state = match outcome {
            Ok(ready) => {
                signals.init.send_replace(InitStatus::Ready);
                info!(
                    context = %signals.id,
                    kind = %signals.kind,
                    duration_ms = bootstrap_started.elapsed().as_millis(),
                    deferred = pending.len(),
                    "Engine ready"
                );
                ContextState::Ready(ready)
            }
            Err(err) => {
                let reason = err.to_string();
                // Settle the future first so anything awaiting it observes the rejection,
                // then raise on the host fault channel.
                signals.init.send_replace(InitStatus::Failed(reason.clone()));
                signals.faults.raise(signals.id, signals.kind, reason.clone());
                ContextState::Failed(Failure::Bootstrap(reason))
            }
        };
        signals.transition(state.lifecycle());

        while let Some(unit) = pending.pop_front() {
            route(&capability, &mut state, unit, &signals).await;
        }
        while let Some(unit) = inbox.recv().await {
            route(&capability, &mut state, unit, &signals).await;
        }

        debug!(context = %signals.id, kind = %signals.kind, "Inbox closed, context stopping");
    }
}

async fn route<C: Capability>(
    capability: &C,
    state: &mut ContextState<C::Ready>,
    unit: WorkUnit,
    signals: &Signals,
) {
    let WorkUnit {
        id: unit_id,
        payload,
        reply,
        submitted_at,
    } = unit;

    let mut dispatched = false;
    let mut poisoned = None;

    let result = match state {
        ContextState::Uninitialized | ContextState::Initializing => {
            Err(ApiError::DispatchBeforeReady(signals.kind))
        }
        ContextState::Failed(failure) => Err(failure.to_error(signals.kind)),
        ContextState::Ready(ready) => {
            dispatched = true;
            signals.emit(ContextEvent::UnitStarted {
                context: signals.id,
                unit: unit_id,
            });
            debug!(
                context = %signals.id,
                unit = %unit_id,
                payload_bytes = payload.len(),
                queue_wait_ms = submitted_at.elapsed().as_millis(),
                "Dispatching unit"
            );

            match AssertUnwindSafe(capability.dispatch(ready, payload))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    poisoned = Some(reason.clone());
                    Err(ApiError::EngineInvocationFailure(format!(
                        "engine panicked: {}",
                        reason
                    )))
                }
            }
        }
    };

    if let Some(reason) = poisoned {
        *state = ContextState::Failed(Failure::Poisoned(reason.clone()));
        signals.faults.raise(
            signals.id,
            signals.kind,
            format!("engine panicked during dispatch: {}", reason),
        );
        signals.transition(state.lifecycle());
    }

    let ok = result.is_ok();
    {
        let mut stats = signals.stats.write();
        if ok {
            stats.processed += 1;
        } else {
            stats.failed += 1;
        }
    }

    match &result {
        Ok(bytes) => debug!(
            context = %signals.id,
            unit = %unit_id,
            reply_bytes = bytes.len(),
            duration_ms = submitted_at.elapsed().as_millis(),
            "Unit settled"
        ),
        Err(err) => warn!(
            context = %signals.id,
            unit = %unit_id,
            error = %err,
            "Unit failed"
        ),
    }

    if dispatched {
        signals.emit(ContextEvent::UnitSettled {
            context: signals.id,
            unit: unit_id,
            ok,
        });
    }

    if reply.send(result).is_err() {
        debug!(context = %signals.id, unit = %unit_id, "Caller stopped waiting for reply");
    }

    if dispatched && capability.posts_completion() {
        signals.emit(ContextEvent::Completion {
            context: signals.id,
            unit: unit_id,
        });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
