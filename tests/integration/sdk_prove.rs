//! End-to-end proving through the SDK client

use super::test_utils::{small_config, FIB_PROGRAM};
use starkline::engine::reference::merkle::hash_row;
use starkline::engine::reference::ReferenceLoader;
use starkline::proto::{FieldElement, MidenProgram, MidenProgramInputs, ProofOptions};
use starkline::{ApiError, ProverClient};
use std::time::Duration;

fn program(source: &str) -> MidenProgram {
    MidenProgram {
        program: source.to_string(),
    }
}

fn inputs(stack_init: &[u64], advice_tape: &[u64]) -> MidenProgramInputs {
    MidenProgramInputs {
        stack_init: stack_init.to_vec(),
        advice_tape: advice_tape.to_vec(),
    }
}

#[tokio::test]
async fn test_fibonacci_proof() {
    let client = ProverClient::start(ReferenceLoader::new(), &small_config()).unwrap();

    let bundle = client
        .prove(&program(FIB_PROGRAM), &inputs(&[0, 1], &[]), None)
        .await
        .unwrap();

    assert_eq!(bundle.top().unwrap(), Some(89));
    assert_eq!(bundle.stack().unwrap(), vec![89, 55]);
    assert!(!bundle.proof.queries.is_empty());
    assert_eq!(
        bundle.public_inputs.stack_inputs,
        vec![FieldElement::from(0), FieldElement::from(1)]
    );
    assert_eq!(bundle.public_inputs.program_hash.as_ref().unwrap().data.len(), 32);
    assert_eq!(bundle.public_inputs.outputs.as_ref(), Some(&bundle.outputs));

    let context = bundle.proof.context.as_ref().unwrap();
    assert_eq!(context.options.as_ref(), Some(&ProofOptions::standard()));
    assert!(context.trace_length.is_power_of_two());

    client.shutdown().await;
}

#[tokio::test]
async fn test_parallel_and_sequential_proofs_match() {
    let client = ProverClient::start(ReferenceLoader::new(), &small_config()).unwrap();
    let source = program("begin adv.push adv.push mul push.3 add end");
    let inputs = inputs(&[], &[6, 7]);

    let parallel = client.prove(&source, &inputs, None).await.unwrap();
    let sequential = client.prove_sequential(&source, &inputs, None).await.unwrap();

    assert_eq!(parallel.top().unwrap(), Some(45));
    assert_eq!(parallel, sequential);

    client.shutdown().await;
}

#[tokio::test]
async fn test_custom_options_are_carried_into_the_proof() {
    let client = ProverClient::start(ReferenceLoader::new(), &small_config()).unwrap();
    let mut options = ProofOptions::standard();
    options.num_queries = 4;
    options.grinding_factor = 2;

    let bundle = client
        .prove(&program(FIB_PROGRAM), &inputs(&[0, 1], &[]), Some(options.clone()))
        .await
        .unwrap();
    let context = bundle.proof.context.as_ref().unwrap();
    assert_eq!(context.options.as_ref(), Some(&options));
    assert_eq!(bundle.proof.queries.len(), 4);

    client.shutdown().await;
}

#[tokio::test]
async fn test_engine_errors_leave_the_client_usable() {
    let client = ProverClient::start(ReferenceLoader::new(), &small_config()).unwrap();

    assert!(matches!(
        client
            .prove(&program("begin frobnicate end"), &inputs(&[], &[]), None)
            .await,
        Err(ApiError::EngineInvocationFailure(_))
    ));
    assert!(matches!(
        client
            .prove_sequential(&program("begin add end"), &inputs(&[], &[]), None)
            .await,
        Err(ApiError::EngineInvocationFailure(_))
    ));

    let mut unsupported = ProofOptions::standard();
    unsupported.prime_field = 7;
    assert!(matches!(
        client
            .prove(&program(FIB_PROGRAM), &inputs(&[0, 1], &[]), Some(unsupported))
            .await,
        Err(ApiError::EngineInvocationFailure(_))
    ));

    let bundle = client
        .prove(&program(FIB_PROGRAM), &inputs(&[0, 1], &[]), None)
        .await
        .unwrap();
    assert_eq!(bundle.top().unwrap(), Some(89));

    let mut faults = client.take_faults().unwrap();
    assert!(faults.try_next().is_none());
    assert!(client.take_faults().is_none());

    client.shutdown().await;
}

#[tokio::test]
async fn test_empty_nested_repeat_is_rejected_and_client_keeps_serving() {
    let client = ProverClient::start(ReferenceLoader::new(), &small_config()).unwrap();
    let source = program("begin repeat.65536 repeat.65536 repeat.65536 end end end end");

    let rejected = tokio::time::timeout(
        Duration::from_secs(10),
        client.prove_sequential(&source, &inputs(&[], &[]), None),
    )
    .await
    .unwrap();
    match rejected {
        Err(ApiError::EngineInvocationFailure(reason)) => {
            assert!(reason.contains("empty repeat block"))
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    let bundle = tokio::time::timeout(
        Duration::from_secs(10),
        client.prove_sequential(&program(FIB_PROGRAM), &inputs(&[0, 1], &[]), None),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(bundle.top().unwrap(), Some(89));

    client.shutdown().await;
}

#[tokio::test]
async fn test_prove_before_initialization_completes() {
    let loader = ReferenceLoader::new();
    let client = ProverClient::start(loader.clone(), &small_config()).unwrap();

    // No call to initialized(): the request is held until the contexts are ready.
    let bundle = client
        .prove(&program(FIB_PROGRAM), &inputs(&[0, 1], &[]), None)
        .await
        .unwrap();
    assert_eq!(bundle.top().unwrap(), Some(89));

    client.initialized().await.unwrap();
    assert_eq!(loader.setup_count(), 1);
    assert_eq!(client.pool().hashing_concurrency(), 2);
    assert_eq!(client.pool().constraint_concurrency(), 2);

    client.shutdown().await;
}

#[tokio::test]
async fn test_hash_elements_matches_row_hash() {
    let client = ProverClient::start(ReferenceLoader::new(), &small_config()).unwrap();
    let rows: Vec<Vec<u64>> = (0..20u64).map(|i| vec![i, i * i, 7]).collect();

    let digests = client.hash_elements(&rows).await.unwrap();
    let expected: Vec<[u8; 32]> = rows.iter().map(|row| hash_row(row)).collect();
    assert_eq!(digests, expected);

    client.shutdown().await;
}

#[test]
fn test_invalid_configuration_is_rejected_up_front() {
    let mut config = small_config();
    config.prover.chunk_size = 0;
    assert!(matches!(
        ProverClient::start(ReferenceLoader::new(), &config),
        Err(ApiError::ConfigError(_))
    ));
}
