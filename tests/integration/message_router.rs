//! Integration tests for message routing inside a ready context

use super::test_utils::{ScriptedCapability, FAIL, PANIC};
use futures::future::join_all;
use starkline::config::ContextConfig;
use starkline::context::{self, fault_channel, LifecycleState};
use starkline::ApiError;

#[tokio::test]
async fn test_units_are_answered_in_submission_order() {
    let capability = ScriptedCapability::open();
    let (faults, _monitor) = fault_channel();
    let handle = context::spawn(capability.clone(), &ContextConfig::default(), &faults);

    let payloads: Vec<Vec<u8>> = (0u16..50).map(|i| i.to_be_bytes().to_vec()).collect();
    let mut replies = Vec::new();
    for payload in &payloads {
        replies.push(handle.submit(payload.clone()).await.unwrap());
    }
    let answers = join_all(replies.into_iter().map(|reply| reply.recv())).await;

    assert_eq!(capability.seen(), payloads);
    for (payload, answer) in payloads.iter().zip(answers) {
        let expected: Vec<u8> = payload.iter().rev().copied().collect();
        assert_eq!(answer.unwrap(), expected);
    }
}

#[tokio::test]
async fn test_small_inbox_applies_backpressure_without_dropping() {
    let capability = ScriptedCapability::gated();
    let (faults, _monitor) = fault_channel();
    let config = ContextConfig {
        inbox_capacity: 2,
        max_pending: 2,
        ..ContextConfig::default()
    };
    let handle = context::spawn(capability.clone(), &config, &faults);

    let sender = tokio::spawn({
        let handle = handle.clone();
        async move {
            let mut replies = Vec::new();
            for i in 0u8..10 {
                replies.push(handle.submit(vec![i]).await.unwrap());
            }
            replies
        }
    });

    while handle.stats().deferred < 2 {
        tokio::task::yield_now().await;
    }
    capability.release();

    let replies = sender.await.unwrap();
    for (i, reply) in replies.into_iter().enumerate() {
        assert_eq!(reply.recv().await.unwrap(), vec![i as u8]);
    }
    assert_eq!(capability.seen().len(), 10);
}

#[tokio::test]
async fn test_engine_error_does_not_stop_context() {
    let capability = ScriptedCapability::open();
    let (faults, mut monitor) = fault_channel();
    let handle = context::spawn(capability, &ContextConfig::default(), &faults);

    assert!(matches!(
        handle.request(FAIL.to_vec()).await,
        Err(ApiError::EngineInvocationFailure(_))
    ));
    assert_eq!(handle.request(b"ok".to_vec()).await.unwrap(), b"ko".to_vec());
    assert_eq!(handle.state(), LifecycleState::Ready);

    let stats = handle.stats();
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.failed, 1);
    assert!(monitor.try_next().is_none());
}

#[tokio::test]
async fn test_panic_poisons_only_its_context() {
    let (faults, mut monitor) = fault_channel();
    let doomed = context::spawn(ScriptedCapability::open(), &ContextConfig::default(), &faults);
    let healthy = context::spawn(ScriptedCapability::open(), &ContextConfig::default(), &faults);

    match doomed.request(PANIC.to_vec()).await {
        Err(ApiError::EngineInvocationFailure(reason)) => {
            assert!(reason.contains("scripted panic"))
        }
        other => panic!("unexpected reply: {:?}", other),
    }
    assert!(matches!(
        doomed.request(b"after".to_vec()).await,
        Err(ApiError::ContextPoisoned { .. })
    ));
    assert_eq!(doomed.state(), LifecycleState::Failed);

    let report = monitor.next().await.unwrap();
    assert_eq!(report.context, doomed.id());
    assert!(report.reason.contains("scripted panic"));

    assert_eq!(healthy.request(b"fine".to_vec()).await.unwrap(), b"enif".to_vec());
    assert_eq!(healthy.state(), LifecycleState::Ready);
}
