//! Integration tests for the hashing and constraint contexts of the worker pool

use super::test_utils::small_config;
use starkline::context::{fault_channel, LifecycleState};
use starkline::engine::reference::constraints::evaluate_rows;
use starkline::engine::reference::merkle::hash_row;
use starkline::engine::reference::ReferenceLoader;
use starkline::pool::WorkerPool;
use starkline::work::{self, ConstraintWorkItem, HashingResult, HashingWorkItem};
use starkline::{ApiError, MalformedInput};

#[tokio::test]
async fn test_hash_request_sent_before_bootstrap_resolves() {
    let (faults, _monitor) = fault_channel();
    let pool = WorkerPool::spawn(ReferenceLoader::new(), &small_config(), &faults);
    let context = &pool.hashing_contexts()[0];

    let rows = vec![vec![1, 2, 3], vec![4, 5, 6]];
    let payload = work::encode(&HashingWorkItem {
        batch_idx: 0,
        data: rows.clone(),
    })
    .unwrap();
    let reply = context.request(payload).await.unwrap();
    let result: HashingResult = work::decode(&reply, "hashing result").unwrap();

    assert_eq!(result.batch_idx, 0);
    assert_eq!(result.hashes, vec![hash_row(&rows[0]), hash_row(&rows[1])]);
    assert_eq!(context.state(), LifecycleState::Ready);

    pool.join().await;
}

#[tokio::test]
async fn test_batches_spread_across_contexts() {
    let (faults, _monitor) = fault_channel();
    let pool = WorkerPool::spawn(ReferenceLoader::new(), &small_config(), &faults);

    let items: Vec<HashingWorkItem> = (0..6)
        .map(|batch_idx| HashingWorkItem {
            batch_idx,
            data: vec![vec![batch_idx as u64]],
        })
        .collect();
    let results = pool.hash_batches(&items).await.unwrap();

    for (item, result) in items.iter().zip(&results) {
        assert_eq!(result.batch_idx, item.batch_idx);
        assert_eq!(result.hashes, vec![hash_row(&item.data[0])]);
    }
    for context in pool.hashing_contexts() {
        assert_eq!(context.stats().processed, 3);
    }

    pool.join().await;
}

#[tokio::test]
async fn test_constraint_fragment_round_trip() {
    let (faults, _monitor) = fault_channel();
    let pool = WorkerPool::spawn(ReferenceLoader::new(), &small_config(), &faults);

    // clk, opcode (noop), depth, then eight stack columns.
    let rows: Vec<Vec<u64>> = (0..4u64)
        .map(|clk| {
            let mut row = vec![clk, 0, 1, 9];
            row.resize(11, 0);
            row
        })
        .collect();
    let coefficients = vec![3, 5];
    let item = ConstraintWorkItem {
        fragment_offset: 1,
        num_fragments: 2,
        first_row: 0,
        rows: rows.clone(),
        coefficients: coefficients.clone(),
    };

    let result = pool.evaluate_fragment(&item).await.unwrap();
    assert_eq!(result.fragment_offset, 1);
    assert_eq!(
        result.evaluations,
        evaluate_rows(&rows, 0, &coefficients).unwrap()
    );

    // Fragment 1 of a two-context pool lands on the second context only.
    let contexts = pool.constraint_contexts();
    assert_eq!(contexts.len(), 2);
    assert_eq!(contexts[0].stats().submitted, 0);
    assert_eq!(contexts[1].stats().processed, 1);

    pool.join().await;
}

#[tokio::test]
async fn test_garbage_payload_is_malformed() {
    let (faults, _monitor) = fault_channel();
    let pool = WorkerPool::spawn(ReferenceLoader::new(), &small_config(), &faults);

    let reply = pool.hashing_contexts()[1].request(vec![0xff; 3]).await;
    assert!(matches!(
        reply,
        Err(ApiError::MalformedInput(MalformedInput::Decode { .. }))
    ));
    // A malformed unit is an ordinary failure; the context keeps serving.
    assert_eq!(pool.hashing_contexts()[1].state(), LifecycleState::Ready);

    pool.join().await;
}
