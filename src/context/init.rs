//! Initialization future shared by everything that waits on a context's bootstrap.

use crate::context::ContextKind;
use crate::error::ApiError;
use tokio::sync::watch;

/// Settled value of a context's bootstrap
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitStatus {
    Pending,
    Ready,
    Failed(String),
}

/// Resolves once the context's engine is ready, or rejects if it failed to load.
///
/// There is exactly one underlying value per context lifetime and it settles once;
/// every clone observes the same outcome.
#[derive(Debug, Clone)]
pub struct InitializationFuture {
    kind: ContextKind,
    status: watch::Receiver<InitStatus>,
}

impl InitializationFuture {
    pub(crate) fn new(kind: ContextKind, status: watch::Receiver<InitStatus>) -> Self {
        Self { kind, status }
    }

    /// Current status without waiting
    pub fn status(&self) -> InitStatus {
        self.status.borrow().clone()
    }

    /// Wait for bootstrap to settle.
    pub async fn wait(mut self) -> Result<(), ApiError> {
        let settled = self
            .status
            .wait_for(|status| *status != InitStatus::Pending)
            .await
            .map(|status| (*status).clone());

        match settled {
            Ok(InitStatus::Ready) => Ok(()),
            Ok(InitStatus::Failed(reason)) => Err(ApiError::BootstrapFailure {
                kind: self.kind,
                reason,
            }),
            Ok(InitStatus::Pending) => Err(ApiError::DispatchBeforeReady(self.kind)),
            // The context went away before settling; nothing will ever resolve it.
            Err(_) => match self.status.borrow().clone() {
                InitStatus::Ready => Ok(()),
                InitStatus::Failed(reason) => Err(ApiError::BootstrapFailure {
                    kind: self.kind,
                    reason,
                }),
                InitStatus::Pending => Err(ApiError::ContextClosed(self.kind)),
            },
        }
    }
}
