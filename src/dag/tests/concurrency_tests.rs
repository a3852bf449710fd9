//! Concurrent decision tests
//!
//! Many threads race to decide the same or conflicting transitions; exactly
//! one acceptance may win.

use rayon::prelude::*;
use snowdag_dag::testing::{TestTransition, TestVm};
use snowdag_dag::{
    ChainContext, DagError, Id, MemoryDatabase, Serializer, SerializerConfig, Status, Transition,
};
use std::sync::Arc;

const RACERS: usize = 32;

fn serializer() -> Serializer {
    Serializer::with_collaborators(
        SerializerConfig::default(),
        ChainContext::default(),
        Arc::new(TestVm::new()),
        Arc::new(MemoryDatabase::new()),
    )
    .unwrap()
}

#[test]
fn test_same_transition_accepted_once() {
    let serializer = serializer();
    let tr: Arc<dyn Transition> = Arc::new(TestTransition::new(b"contested"));

    let results: Vec<_> = (0..RACERS)
        .into_par_iter()
        .map(|epoch| {
            let vertex = serializer
                .build(epoch as u32, &[], vec![tr.clone()], &[])
                .unwrap();
            let tx = vertex.txs().unwrap().remove(0);
            tx.accept()
        })
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(DagError::is_precondition_violation));
    assert_eq!(serializer.transition_status(&tr.id()).unwrap(), Status::Accepted);
}

#[test]
fn test_conflicting_spenders_accepted_once() {
    let serializer = serializer();
    let utxo = Id::from_data(b"double-spent");

    let results: Vec<_> = (0..RACERS)
        .into_par_iter()
        .map(|i| {
            let tr: Arc<dyn Transition> = Arc::new(
                TestTransition::new(format!("spend-{}", i).as_bytes()).with_inputs(vec![utxo]),
            );
            let vertex = serializer.build(0, &[], vec![tr.clone()], &[]).unwrap();
            let tx = vertex.txs().unwrap().remove(0);
            (tr.id(), tx.accept())
        })
        .collect();

    let winners: Vec<_> = results.iter().filter(|(_, r)| r.is_ok()).collect();
    assert_eq!(winners.len(), 1);

    for (id, result) in &results {
        match result {
            Ok(()) => assert_eq!(serializer.transition_status(id).unwrap(), Status::Accepted),
            Err(e) => {
                assert!(e.is_verification_failure());
                assert_eq!(serializer.transition_status(id).unwrap(), Status::Processing);
            }
        }
    }
}

#[test]
fn test_shared_vertex_handle_decided_once() {
    let serializer = serializer();
    let tr: Arc<dyn Transition> = Arc::new(TestTransition::new(b"t"));
    let vertex = serializer.build(0, &[], vec![tr], &[]).unwrap();
    vertex.txs().unwrap()[0].accept().unwrap();
    let bytes = vertex.bytes().to_vec();

    let results: Vec<_> = (0..RACERS)
        .into_par_iter()
        .map(|i| {
            let handle = serializer.parse(&bytes).unwrap();
            if i % 2 == 0 {
                handle.accept()
            } else {
                handle.reject()
            }
        })
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(vertex.status().is_decided());
}
