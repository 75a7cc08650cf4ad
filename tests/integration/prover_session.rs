//! Integration tests for per-unit prover resets in the proving context

use super::test_utils::{drain, small_config, FIB_PROGRAM};
use prost::Message;
use starkline::capability::{Capability, ProvingCapability};
use starkline::context::{fault_channel, ContextEvent};
use starkline::engine::reference::ReferenceLoader;
use starkline::pool::WorkerPool;
use starkline::proto::{MidenProgram, MidenProgramInputs, ProofOptions};
use starkline::work::{self, ProverOutput, ProvingWorkItem};
use starkline::ProverClient;

fn fib_item(is_sequential: bool) -> Vec<u8> {
    let item = ProvingWorkItem {
        program: MidenProgram {
            program: FIB_PROGRAM.to_string(),
        }
        .encode_to_vec(),
        program_inputs: MidenProgramInputs {
            stack_init: vec![0, 1],
            advice_tape: Vec::new(),
        }
        .encode_to_vec(),
        proof_options: ProofOptions::standard().encode_to_vec(),
        chunk_size: 8,
        is_sequential,
    };
    work::encode(&item).unwrap()
}

#[tokio::test]
async fn test_each_unit_gets_a_fresh_generation() {
    let config = small_config();
    let (faults, _monitor) = fault_channel();
    let loader = ReferenceLoader::new();
    let pool = WorkerPool::spawn(loader.clone(), &config, &faults);
    let capability = ProvingCapability::new(loader.clone(), pool.clone(), config.prover.clone());

    let mut ready = capability.bootstrap().await.unwrap();
    assert_eq!(ready.session().generation(), 0);
    assert_eq!(ready.session().current().generation(), 0);

    let first = capability.dispatch(&mut ready, fib_item(false)).await.unwrap();
    assert_eq!(ready.session().generation(), 1);
    assert_eq!(ready.session().current().generation(), 1);
    assert_eq!(ready.session().current().proofs(), 1);

    let second = capability.dispatch(&mut ready, fib_item(true)).await.unwrap();
    assert_eq!(ready.session().generation(), 2);
    assert_eq!(ready.session().current().generation(), 2);
    // The count starts over with every generation.
    assert_eq!(ready.session().current().proofs(), 1);

    let first: ProverOutput = work::decode(&first, "prover output").unwrap();
    let second: ProverOutput = work::decode(&second, "prover output").unwrap();
    assert_eq!(first, second);

    // Every generation shares the pool built during bootstrap.
    assert_eq!(
        ready.session().current().pool().hashing_concurrency(),
        pool.hashing_concurrency()
    );
    assert_eq!(loader.setup_count(), 1);
}

#[tokio::test]
async fn test_units_do_not_overlap_and_post_completion() {
    let client = ProverClient::start(ReferenceLoader::new(), &small_config()).unwrap();
    let mut events = client.proving_context().subscribe();

    let program = MidenProgram {
        program: FIB_PROGRAM.to_string(),
    };
    let inputs = MidenProgramInputs {
        stack_init: vec![0, 1],
        advice_tape: Vec::new(),
    };
    let (first, second, third) = tokio::join!(
        client.prove(&program, &inputs, None),
        client.prove_sequential(&program, &inputs, None),
        client.prove(&program, &inputs, None),
    );
    let first = first.unwrap();
    assert_eq!(first, second.unwrap());
    assert_eq!(first, third.unwrap());

    // The completion sentinel is posted right after each reply; give the router a
    // chance to publish the last one.
    while client.proving_context().stats().processed < 3 {
        tokio::task::yield_now().await;
    }
    tokio::task::yield_now().await;

    let dispatch_events: Vec<ContextEvent> = drain(&mut events)
        .into_iter()
        .filter(|event| {
            matches!(
                event,
                ContextEvent::UnitStarted { .. }
                    | ContextEvent::UnitSettled { .. }
                    | ContextEvent::Completion { .. }
            )
        })
        .collect();
    assert_eq!(dispatch_events.len(), 9);

    for unit_events in dispatch_events.chunks(3) {
        match unit_events {
            [ContextEvent::UnitStarted { unit: started, .. }, ContextEvent::UnitSettled {
                unit: settled,
                ok: true,
                ..
            }, ContextEvent::Completion { unit: completed, .. }] => {
                assert_eq!(started, settled);
                assert_eq!(settled, completed);
            }
            other => panic!("interleaved dispatch events: {:?}", other),
        }
    }

    client.shutdown().await;
}
