//! Shared test utilities for integration tests
//!
//! A scripted capability whose bootstrap waits on a gate, plus helpers for
//! building small runtime configurations and draining context events.

use async_trait::async_trait;
use parking_lot::Mutex;
use starkline::capability::Capability;
use starkline::config::RuntimeConfig;
use starkline::context::{ContextEvent, ContextKind};
use starkline::ApiError;
use std::sync::Arc;
use tokio::sync::{broadcast, Semaphore};

pub const FIB_PROGRAM: &str = "begin\n  repeat.10\n    swap dup.1 add\n  end\nend\n";

/// Payload that makes [`ScriptedCapability`] return an engine error
pub const FAIL: &[u8] = b"fail";
/// Payload that makes [`ScriptedCapability`] panic inside the entry point
pub const PANIC: &[u8] = b"panic";

/// Capability with a controllable bootstrap that records every payload it sees.
///
/// Replies echo the payload reversed.
#[derive(Clone)]
pub struct ScriptedCapability {
    gate: Arc<Semaphore>,
    bootstrap: BootstrapScript,
    seen: Arc<Mutex<Vec<Vec<u8>>>>,
}

/// How bootstrap ends once the gate opens
#[derive(Clone)]
enum BootstrapScript {
    Succeed,
    Fail(String),
    Panic(String),
}

impl ScriptedCapability {
    /// Bootstrap blocks until [`ScriptedCapability::release`] is called.
    pub fn gated() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            bootstrap: BootstrapScript::Succeed,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Bootstrap completes as soon as the context starts.
    pub fn open() -> Self {
        let capability = Self::gated();
        capability.release();
        capability
    }

    /// Bootstrap fails with `reason` as soon as the context starts.
    pub fn failing(reason: &str) -> Self {
        let capability = Self::gated_failing(reason);
        capability.release();
        capability
    }

    /// Bootstrap blocks until released, then fails with `reason`.
    pub fn gated_failing(reason: &str) -> Self {
        Self {
            bootstrap: BootstrapScript::Fail(reason.to_string()),
            ..Self::gated()
        }
    }

    /// Bootstrap blocks until released, then panics with `message`.
    pub fn gated_panicking(message: &str) -> Self {
        Self {
            bootstrap: BootstrapScript::Panic(message.to_string()),
            ..Self::gated()
        }
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn seen(&self) -> Vec<Vec<u8>> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Capability for ScriptedCapability {
    type Ready = usize;

    fn kind(&self) -> ContextKind {
        ContextKind::Hashing
    }

    async fn bootstrap(&self) -> Result<usize, ApiError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| ApiError::EngineInvocationFailure(e.to_string()))?;
        match &self.bootstrap {
            BootstrapScript::Succeed => Ok(0),
            BootstrapScript::Fail(reason) => {
                Err(ApiError::EngineInvocationFailure(reason.clone()))
            }
            BootstrapScript::Panic(message) => panic!("{}", message),
        }
    }

    async fn dispatch(&self, calls: &mut usize, payload: Vec<u8>) -> Result<Vec<u8>, ApiError> {
        *calls += 1;
        self.seen.lock().push(payload.clone());
        if payload == FAIL {
            return Err(ApiError::EngineInvocationFailure("scripted failure".to_string()));
        }
        if payload == PANIC {
            panic!("scripted panic");
        }
        Ok(payload.into_iter().rev().collect())
    }
}

/// Small pool so tests do not spawn a context per core.
pub fn small_config() -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.pool.hashing_workers = Some(2);
    config.pool.constraint_workers = Some(2);
    config.prover.chunk_size = 8;
    config.prover.constraint_fragments = 3;
    config
}

/// Every event already published, without waiting
pub fn drain(events: &mut broadcast::Receiver<ContextEvent>) -> Vec<ContextEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
