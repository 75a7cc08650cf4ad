//! Integration tests for the context bootstrap protocol

use super::test_utils::{drain, ScriptedCapability};
use starkline::config::ContextConfig;
use starkline::context::{self, fault_channel, ContextEvent, InitStatus, LifecycleState};
use starkline::ApiError;

async fn wait_for_deferred(handle: &starkline::context::ContextHandle, count: usize) {
    while handle.stats().deferred < count {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_units_sent_during_bootstrap_are_processed_in_order() {
    let capability = ScriptedCapability::gated();
    let (faults, _monitor) = fault_channel();
    let handle = context::spawn(capability.clone(), &ContextConfig::default(), &faults);
    let mut events = handle.subscribe();

    let mut replies = Vec::new();
    for payload in [b"one".to_vec(), b"two".to_vec(), b"three".to_vec()] {
        replies.push(handle.submit(payload).await.unwrap());
    }
    wait_for_deferred(&handle, 3).await;

    assert_eq!(handle.state(), LifecycleState::Initializing);
    assert_eq!(handle.initialization().status(), InitStatus::Pending);
    assert!(capability.seen().is_empty());

    capability.release();
    let unit_ids: Vec<_> = replies.iter().map(|reply| reply.unit()).collect();
    let mut answers = Vec::new();
    for reply in replies {
        answers.push(reply.recv().await.unwrap());
    }

    assert_eq!(
        answers,
        vec![b"eno".to_vec(), b"owt".to_vec(), b"eerht".to_vec()]
    );
    assert_eq!(
        capability.seen(),
        vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
    );
    assert_eq!(handle.state(), LifecycleState::Ready);

    let id = handle.id();
    let events = drain(&mut events);
    let deferred: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            ContextEvent::UnitDeferred { unit, .. } => Some(*unit),
            _ => None,
        })
        .collect();
    assert_eq!(deferred, unit_ids);

    let ready_at = events
        .iter()
        .position(|event| {
            *event
                == ContextEvent::StateChanged {
                    context: id,
                    state: LifecycleState::Ready,
                }
        })
        .unwrap();
    let first_start = events
        .iter()
        .position(|event| matches!(event, ContextEvent::UnitStarted { .. }))
        .unwrap();
    assert!(ready_at < first_start);

    let stats = handle.stats();
    assert_eq!(stats.submitted, 3);
    assert_eq!(stats.deferred, 3);
    assert_eq!(stats.processed, 3);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn test_initialization_future_resolves_for_every_waiter() {
    let capability = ScriptedCapability::gated();
    let (faults, _monitor) = fault_channel();
    let handle = context::spawn(capability.clone(), &ContextConfig::default(), &faults);

    let first = tokio::spawn({
        let handle = handle.clone();
        async move { handle.initialized().await }
    });
    let second = tokio::spawn(handle.initialization().wait());

    capability.release();
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();
    handle.initialized().await.unwrap();
    assert_eq!(handle.state(), LifecycleState::Ready);
}

#[tokio::test]
async fn test_bootstrap_failure_rejects_all_units_and_raises_fault() {
    let capability = ScriptedCapability::failing("engine module failed to compile");
    let (faults, mut monitor) = fault_channel();
    let handle = context::spawn(capability.clone(), &ContextConfig::default(), &faults);

    let early = handle.submit(b"early".to_vec()).await.unwrap();
    match early.recv().await {
        Err(ApiError::BootstrapFailure { reason, .. }) => {
            assert!(reason.contains("engine module failed to compile"))
        }
        other => panic!("unexpected reply: {:?}", other),
    }

    let report = monitor.next().await.unwrap();
    assert_eq!(report.context, handle.id());
    assert!(report.reason.contains("engine module failed to compile"));

    assert!(matches!(
        handle.initialized().await,
        Err(ApiError::BootstrapFailure { .. })
    ));
    assert_eq!(handle.state(), LifecycleState::Failed);

    // Units sent after the failure get the same answer.
    assert!(matches!(
        handle.request(b"late".to_vec()).await,
        Err(ApiError::BootstrapFailure { .. })
    ));
    assert!(capability.seen().is_empty());
    assert_eq!(handle.stats().failed, 2);
}

#[tokio::test]
async fn test_parked_units_surface_bootstrap_failure() {
    let capability = ScriptedCapability::gated_failing("engine module failed to compile");
    let (faults, mut monitor) = fault_channel();
    let handle = context::spawn(capability.clone(), &ContextConfig::default(), &faults);

    let mut replies = Vec::new();
    for i in 0u8..4 {
        replies.push(handle.submit(vec![i]).await.unwrap());
    }
    wait_for_deferred(&handle, 4).await;
    assert_eq!(handle.state(), LifecycleState::Initializing);
    assert!(monitor.try_next().is_none());

    capability.release();
    for reply in replies {
        match reply.recv().await {
            Err(ApiError::BootstrapFailure { reason, .. }) => {
                assert!(reason.contains("engine module failed to compile"))
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    let report = monitor.next().await.unwrap();
    assert_eq!(report.context, handle.id());
    assert!(monitor.try_next().is_none());
    assert_eq!(handle.state(), LifecycleState::Failed);
    assert!(capability.seen().is_empty());

    let stats = handle.stats();
    assert_eq!(stats.deferred, 4);
    assert_eq!(stats.failed, 4);
}

#[tokio::test]
async fn test_panic_while_loading_is_a_bootstrap_failure() {
    let capability = ScriptedCapability::gated_panicking("engine load panicked");
    let (faults, mut monitor) = fault_channel();
    let handle = context::spawn(capability.clone(), &ContextConfig::default(), &faults);

    let parked = handle.submit(b"parked".to_vec()).await.unwrap();
    wait_for_deferred(&handle, 1).await;
    capability.release();

    match parked.recv().await {
        Err(ApiError::BootstrapFailure { reason, .. }) => {
            assert!(reason.contains("engine load panicked"))
        }
        other => panic!("unexpected reply: {:?}", other),
    }
    match handle.initialized().await {
        Err(ApiError::BootstrapFailure { reason, .. }) => {
            assert!(reason.contains("engine load panicked"))
        }
        other => panic!("unexpected initialization outcome: {:?}", other),
    }
    assert_eq!(handle.state(), LifecycleState::Failed);

    let report = monitor.next().await.unwrap();
    assert_eq!(report.context, handle.id());
    assert!(report.reason.contains("engine load panicked"));

    // The context survives the panic and keeps answering.
    assert!(matches!(
        handle.request(b"late".to_vec()).await,
        Err(ApiError::BootstrapFailure { .. })
    ));
}

#[tokio::test]
async fn test_context_stops_once_handles_are_dropped() {
    let capability = ScriptedCapability::open();
    let (faults, _monitor) = fault_channel();
    let handle = context::spawn(capability, &ContextConfig::default(), &faults);
    let pending = handle.submit(b"last".to_vec()).await.unwrap();

    handle.join().await;
    assert_eq!(pending.recv().await.unwrap(), b"tsal".to_vec());
}
