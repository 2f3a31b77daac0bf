//! End-to-end consensus tests.
//!
//! Exercises the conflict graph and the vertex DAG through their public
//! surface only: submissions, poll results, and the decision events they
//! emit.

use std::sync::Arc;

use proptest::prelude::*;

use snow_consensus::testing::{
    test_id, EventKind, RecordingDispatcher, TestTx, TestVertex,
};
use snow_consensus::{
    ConsensusMetrics, Context, Decidable, Directed, Parameters, Status, Topological,
};
use snow_ids::Id;
use snow_utils::{Bag, Set, UniqueBag};

fn small_params() -> Parameters {
    // K=2, Alpha=2, BetaVirtuous=1, BetaRogue=2
    Parameters::new(2, 2, 1, 2)
}

fn directed(params: Parameters) -> Directed<TestTx> {
    Directed::new(Context::new(test_id(0)), params).unwrap()
}

fn dag(params: Parameters) -> Topological<TestVertex> {
    Topological::new(Context::new(test_id(0)), params).unwrap()
}

fn bag(votes: &[(Id, usize)]) -> Bag<Id> {
    let mut bag = Bag::new();
    for (id, count) in votes {
        bag.add_count(*id, *count);
    }
    bag
}

fn vertex_votes(entries: &[(Id, &[usize])]) -> UniqueBag<Id> {
    let mut votes = UniqueBag::new();
    for (vertex_id, responders) in entries {
        for responder in *responders {
            votes.add(*responder, *vertex_id);
        }
    }
    votes
}

#[test]
fn single_virtuous_tx_accepted_after_one_poll() {
    let mut dg = directed(small_params());
    let a = TestTx::new(test_id(1), [test_id(100)]).shared();
    dg.add(a.clone()).unwrap();

    dg.record_poll(bag(&[(test_id(1), 2)])).unwrap();

    assert_eq!(a.read().status(), Status::Accepted);
    assert!(dg.preferences().is_empty());
    assert!(dg.virtuous().is_empty());
    assert!(dg.finalized());
}

#[test]
fn conflicting_pair_decided_by_biased_polls() {
    let mut dg = directed(small_params());
    let a = TestTx::new(test_id(1), [test_id(100)]).shared();
    let b = TestTx::new(test_id(2), [test_id(100)]).shared();
    dg.add(a.clone()).unwrap();
    dg.add(b.clone()).unwrap();

    // The incumbent is the sole preference once the conflict exists.
    assert_eq!(dg.preferences().to_vec(), vec![test_id(1)]);
    assert!(dg.virtuous().is_empty());

    // First winning poll: bias moves, nothing decided at beta_rogue 2.
    dg.record_poll(bag(&[(test_id(1), 2)])).unwrap();
    assert_eq!(a.read().status(), Status::Processing);
    assert_eq!(dg.preferences().to_vec(), vec![test_id(1)]);

    // Second consecutive win decides the whole conflict set.
    dg.record_poll(bag(&[(test_id(1), 2)])).unwrap();
    assert_eq!(a.read().status(), Status::Accepted);
    assert_eq!(b.read().status(), Status::Rejected);
    assert!(dg.preferences().is_empty());
    assert!(dg.finalized());
}

#[test]
fn below_quorum_poll_is_a_no_op() {
    let mut dg = directed(small_params());
    let a = TestTx::new(test_id(1), [test_id(100)]).shared();
    let b = TestTx::new(test_id(2), [test_id(100)]).shared();
    dg.add(a.clone()).unwrap();
    dg.add(b.clone()).unwrap();

    dg.record_poll(bag(&[(test_id(1), 1)])).unwrap();

    assert_eq!(a.read().status(), Status::Processing);
    assert_eq!(b.read().status(), Status::Processing);
    assert_eq!(dg.preferences().to_vec(), vec![test_id(1)]);
}

#[test]
fn vacuous_dependency_then_dependent_accepts() {
    let mut dg = directed(small_params());
    let a = TestTx::new(test_id(1), []).shared();
    dg.add(a.clone()).unwrap();
    assert_eq!(a.read().status(), Status::Accepted);

    let b = TestTx::new(test_id(2), [test_id(101)])
        .with_dependency(a)
        .shared();
    dg.add(b.clone()).unwrap();

    dg.record_poll(bag(&[(test_id(2), 2)])).unwrap();
    assert_eq!(b.read().status(), Status::Accepted);
    assert!(dg.finalized());
}

#[test]
fn vertex_accepts_on_accepted_parent() {
    let mut dag = dag(small_params());

    // Establish an accepted parent vertex first.
    let t0 = TestTx::new(test_id(1), [test_id(100)]).shared();
    let v0 = TestVertex::new(test_id(10), [], [t0]).shared();
    dag.add(v0.clone()).unwrap();
    dag.record_poll(&vertex_votes(&[(test_id(10), &[0, 1])]))
        .unwrap();
    assert_eq!(v0.read().status(), Status::Accepted);

    let t1 = TestTx::new(test_id(2), [test_id(101)]).shared();
    let t2 = TestTx::new(test_id(3), [test_id(102)]).shared();
    let v = TestVertex::new(test_id(11), [v0], [t1.clone(), t2.clone()]).shared();
    dag.add(v.clone()).unwrap();

    dag.record_poll(&vertex_votes(&[(test_id(11), &[0, 1])]))
        .unwrap();

    assert_eq!(t1.read().status(), Status::Accepted);
    assert_eq!(t2.read().status(), Status::Accepted);
    assert_eq!(v.read().status(), Status::Accepted);
    assert!(dag.finalized());
}

#[test]
fn all_virtuous_txs_accept_under_unanimous_polls() {
    // P1: non-conflicting txs all accept after beta_virtuous winning
    // polls, regardless of submission order.
    let params = Parameters::new(5, 4, 3, 5);
    let mut dg = directed(params);

    let txs: Vec<_> = (1u8..=6)
        .map(|i| TestTx::new(test_id(i), [test_id(100 + i)]).shared())
        .collect();
    for tx in txs.iter().rev() {
        dg.add(tx.clone()).unwrap();
    }

    for _ in 0..3 {
        let votes: Vec<_> = (1u8..=6).map(|i| (test_id(i), 4)).collect();
        dg.record_poll(bag(&votes)).unwrap();
    }

    for tx in &txs {
        assert_eq!(tx.read().status(), Status::Accepted);
    }
    assert!(dg.finalized());
}

#[test]
fn biased_polls_decide_within_beta_rogue() {
    // P3: with every poll naming only x, the pair is decided in at most
    // beta_rogue polls.
    let params = Parameters::new(5, 4, 2, 4);
    let mut dg = directed(params.clone());
    let x = TestTx::new(test_id(1), [test_id(100)]).shared();
    let y = TestTx::new(test_id(2), [test_id(100)]).shared();
    dg.add(x.clone()).unwrap();
    dg.add(y.clone()).unwrap();

    let mut polls = 0;
    while polls < params.beta_rogue {
        dg.record_poll(bag(&[(test_id(1), 4)])).unwrap();
        polls += 1;
        if x.read().status().decided() {
            break;
        }
    }

    assert_eq!(x.read().status(), Status::Accepted);
    assert_eq!(y.read().status(), Status::Rejected);
    assert!(polls <= params.beta_rogue);
}

#[test]
fn confidence_gap_defers_acceptance() {
    // P6: a missed poll resets the streak, so beta_virtuous=2 needs two
    // consecutive wins.
    let params = Parameters::new(2, 2, 2, 3);
    let mut dg = directed(params);
    let a = TestTx::new(test_id(1), [test_id(100)]).shared();
    dg.add(a.clone()).unwrap();

    dg.record_poll(bag(&[(test_id(1), 2)])).unwrap();
    dg.record_poll(Bag::new()).unwrap();
    dg.record_poll(bag(&[(test_id(1), 2)])).unwrap();
    // Two wins total, but not consecutive.
    assert_eq!(a.read().status(), Status::Processing);

    dg.record_poll(bag(&[(test_id(1), 2)])).unwrap();
    assert_eq!(a.read().status(), Status::Accepted);
}

#[test]
fn dependency_gating_holds_and_cascades() {
    // P7: a tx never accepts before its dependency, and follows a
    // rejected dependency down.
    let params = Parameters::new(2, 2, 1, 3);
    let mut dg = directed(params);

    let dep_a = TestTx::new(test_id(1), [test_id(100)]).shared();
    let dep_b = TestTx::new(test_id(2), [test_id(100)]).shared();
    let child = TestTx::new(test_id(3), [test_id(101)])
        .with_dependency(dep_b.clone())
        .shared();
    dg.add(dep_a.clone()).unwrap();
    dg.add(dep_b.clone()).unwrap();
    dg.add(child.clone()).unwrap();

    // The child crosses its threshold while its dependency is undecided.
    dg.record_poll(bag(&[(test_id(3), 2)])).unwrap();
    assert_eq!(child.read().status(), Status::Processing);

    // Deciding the conflict against the dependency rejects the child.
    for _ in 0..3 {
        dg.record_poll(bag(&[(test_id(1), 2)])).unwrap();
    }
    assert_eq!(dep_a.read().status(), Status::Accepted);
    assert_eq!(dep_b.read().status(), Status::Rejected);
    assert_eq!(child.read().status(), Status::Rejected);
}

#[test]
fn decision_events_fire_in_order_exactly_once() {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let metrics = Arc::new(ConsensusMetrics::new());
    let ctx = Context::new(test_id(0))
        .with_dispatcher(dispatcher.clone())
        .with_metrics(metrics.clone());
    let mut dg: Directed<TestTx> = Directed::new(ctx, small_params()).unwrap();

    let a = TestTx::new(test_id(1), [test_id(100)]).shared();
    let b = TestTx::new(test_id(2), [test_id(100)]).shared();
    dg.add(a).unwrap();
    dg.add(b).unwrap();
    dg.record_poll(bag(&[(test_id(1), 2)])).unwrap();
    dg.record_poll(bag(&[(test_id(1), 2)])).unwrap();

    assert_eq!(
        dispatcher.of_kind(EventKind::Issue),
        vec![test_id(1), test_id(2)]
    );
    assert_eq!(dispatcher.of_kind(EventKind::Accept), vec![test_id(1)]);
    assert_eq!(dispatcher.of_kind(EventKind::Reject), vec![test_id(2)]);

    // The reject is dispatched before the accept that caused it.
    let events = dispatcher.events();
    let reject_at = events
        .iter()
        .position(|(k, _)| *k == EventKind::Reject)
        .unwrap();
    let accept_at = events
        .iter()
        .position(|(k, _)| *k == EventKind::Accept)
        .unwrap();
    assert!(reject_at < accept_at);

    let snap = metrics.snapshot();
    assert_eq!(snap.issued, 2);
    assert_eq!(snap.accepted, 1);
    assert_eq!(snap.rejected, 1);
    assert_eq!(snap.processing(), 0);
}

#[test]
fn orphaned_virtuous_tx_survives_vertex_rejection() {
    let mut dag = dag(small_params());
    let t1 = TestTx::new(test_id(1), [test_id(100)]).shared();
    let t2 = TestTx::new(test_id(2), [test_id(100)]).shared();
    let t3 = TestTx::new(test_id(3), [test_id(101)]).shared();
    let v1 = TestVertex::new(test_id(10), [], [t1.clone()]).shared();
    let v2 = TestVertex::new(test_id(11), [], [t2.clone()]).shared();
    let rider = TestVertex::new(test_id(12), [v2.clone()], [t3.clone()]).shared();

    dag.add(v1).unwrap();
    dag.add(v2).unwrap();
    dag.add(rider.clone()).unwrap();

    dag.record_poll(&vertex_votes(&[(test_id(10), &[0, 1])]))
        .unwrap();
    dag.record_poll(&vertex_votes(&[(test_id(10), &[0, 1])]))
        .unwrap();

    assert_eq!(rider.read().status(), Status::Rejected);
    assert_eq!(t3.read().status(), Status::Processing);
    assert_eq!(dag.orphans().to_vec(), vec![test_id(3)]);
}

#[test]
fn quiesce_reflects_remaining_virtuous_work() {
    let mut dag = dag(small_params());
    let t1 = TestTx::new(test_id(1), [test_id(100)]).shared();
    let v1 = TestVertex::new(test_id(10), [], [t1]).shared();
    dag.add(v1).unwrap();
    assert!(!dag.quiesce());

    let t2 = TestTx::new(test_id(2), [test_id(100)]).shared();
    let v2 = TestVertex::new(test_id(11), [], [t2]).shared();
    dag.add(v2).unwrap();
    // Every processing vertex now carries only conflicted txs.
    assert!(dag.quiesce());
}

#[test]
fn quiesce_stays_false_while_accept_is_parked_on_dependency() {
    let mut dag = dag(small_params());

    // The dependency belongs to a collaborator and never decides.
    let dep = TestTx::new(test_id(1), [test_id(100)]).shared();
    let tx = TestTx::new(test_id(2), [test_id(101)])
        .with_dependency(dep.clone())
        .shared();
    let v = TestVertex::new(test_id(10), [], [tx.clone()]).shared();
    dag.add(v).unwrap();

    // The tx crosses its confidence threshold, so it stops needing polls,
    // but its accept is parked on the undecided dependency. The vertex is
    // still a non-decided, non-rogue vertex: no quiescence.
    dag.record_poll(&vertex_votes(&[(test_id(10), &[0, 1])]))
        .unwrap();
    assert_eq!(tx.read().status(), Status::Processing);
    assert!(!dag.quiesce());
    assert!(!dag.finalized());

    // Only the dependency's decision releases it.
    assert_eq!(dep.read().status(), Status::Processing);
}

fn accepted_spenders(txs: &[(Set<Id>, snow_consensus::TxRef<TestTx>)], utxo: &Id) -> usize {
    txs.iter()
        .filter(|(inputs, tx)| {
            inputs.contains(utxo) && tx.read().status() == Status::Accepted
        })
        .count()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // P2: whatever the poll sequence, two transactions sharing an input
    // are never both accepted.
    #[test]
    fn prop_conflicting_accepts_impossible(
        tx_inputs in proptest::collection::vec(
            proptest::collection::vec(0u8..4, 1..3),
            2..8,
        ),
        polls in proptest::collection::vec(
            proptest::collection::vec((0usize..8, 0usize..6), 1..4),
            0..12,
        ),
    ) {
        let params = Parameters::new(5, 3, 2, 3);
        let mut dg = directed(params);

        let txs: Vec<(Set<Id>, _)> = tx_inputs
            .iter()
            .enumerate()
            .map(|(i, inputs)| {
                let utxos: Set<Id> =
                    inputs.iter().map(|u| test_id(100 + u)).collect();
                let tx = TestTx::new(test_id(i as u8 + 1), utxos.to_vec()).shared();
                (utxos, tx)
            })
            .collect();
        for (_, tx) in &txs {
            dg.add(tx.clone()).unwrap();
        }

        for poll in &polls {
            let mut votes = Bag::new();
            for (index, count) in poll {
                let id = test_id((index % txs.len()) as u8 + 1);
                votes.add_count(id, *count);
            }
            dg.record_poll(votes).unwrap();
        }

        for u in 0u8..4 {
            let utxo = test_id(100 + u);
            prop_assert!(accepted_spenders(&txs, &utxo) <= 1);
        }

        // Terminal states never leave the graph's bookkeeping behind:
        // a decided tx is gone from every snapshot.
        let prefs = dg.preferences();
        let virtuous = dg.virtuous();
        for (_, tx) in &txs {
            let t = tx.read();
            if t.status().decided() {
                prop_assert!(!prefs.contains(&t.id()));
                prop_assert!(!virtuous.contains(&t.id()));
            }
        }
    }
}
