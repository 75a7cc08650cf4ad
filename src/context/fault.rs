//! Host-wide fault channel.
//!
//! Fatal context failures (bootstrap errors, engine panics) are raised here in
//! addition to the reply of whichever unit observed them, so a host that never
//! awaits a particular context still learns that it has died.

use crate::context::{ContextId, ContextKind};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{error, warn};

#[derive(Debug, Clone)]
pub struct FaultReport {
    pub context: ContextId,
    pub kind: ContextKind,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// Sending half, cloned into every context
#[derive(Debug, Clone)]
pub struct FaultSender {
    sender: mpsc::UnboundedSender<FaultReport>,
}

/// Receiving half, owned by the host
#[derive(Debug)]
pub struct FaultMonitor {
    receiver: mpsc::UnboundedReceiver<FaultReport>,
}

pub fn fault_channel() -> (FaultSender, FaultMonitor) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (FaultSender { sender }, FaultMonitor { receiver })
}

impl FaultSender {
    pub fn raise(&self, context: ContextId, kind: ContextKind, reason: impl Into<String>) {
        let report = FaultReport {
            context,
            kind,
            reason: reason.into(),
            at: Utc::now(),
        };
        error!(
            context = %report.context,
            kind = %report.kind,
            reason = %report.reason,
            "Background context fault"
        );
        if self.sender.send(report).is_err() {
            warn!(context = %context, "Fault monitor dropped; fault only logged");
        }
    }
}

impl FaultMonitor {
    /// Wait for the next fault. Returns `None` once every sender is gone.
    pub async fn next(&mut self) -> Option<FaultReport> {
        self.receiver.recv().await
    }

    /// Take a fault that has already been raised, if any.
    pub fn try_next(&mut self) -> Option<FaultReport> {
        self.receiver.try_recv().ok()
    }
}
