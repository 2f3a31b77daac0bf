//! Vertex DAG consensus composing the conflict graph.
//!
//! Vertices batch transactions and reference parent vertices. Votes arrive
//! per vertex and implicitly endorse the whole ancestry; the DAG rolls
//! them up to the accepted frontier, translates them into transaction
//! votes for the conflict graph, and finalizes a vertex once its
//! transactions and parents are all accepted.

use std::collections::VecDeque;

use indexmap::map::Entry;
use indexmap::IndexMap;
use snow_ids::Id;
use snow_utils::errors::Errs;
use snow_utils::{BitSet, Set, UniqueBag};
use tracing::debug;

use super::snowstorm::Directed;
use super::{Decidable, Status, TxRef, Vertex, VertexRef};
use crate::context::Context;
use crate::events::{Blockable, Blocker};
use crate::parameters::Parameters;
use crate::{ConsensusError, Result};

/// Bookkeeping for one processing vertex.
struct VertexNode<V: Vertex> {
    vtx: VertexRef<V>,
    parent_ids: Vec<Id>,
    txs: Vec<TxRef<V::Tx>>,
    tx_ids: Vec<Id>,
}

/// Verdict the DAG must apply for a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VertexEvent {
    Accept(Id),
    Reject(Id),
}

/// Parked until every parent is accepted and every carried tx decided.
///
/// Fulfill signals arrive when a dependency (parent vertex or tx) is
/// accepted; abandon signals when one is rejected, which dooms the vertex.
struct VertexWaiter {
    vertex_id: Id,
    deps: Set<Id>,
    rejected: bool,
}

impl Blockable for VertexWaiter {
    type Event = VertexEvent;

    fn dependencies(&self) -> &Set<Id> {
        &self.deps
    }

    fn fulfill(&mut self, id: &Id) -> Option<VertexEvent> {
        self.deps.remove(id);
        self.update()
    }

    fn abandon(&mut self, _id: &Id) -> Option<VertexEvent> {
        if self.rejected {
            return None;
        }
        self.rejected = true;
        Some(VertexEvent::Reject(self.vertex_id))
    }

    fn update(&mut self) -> Option<VertexEvent> {
        if self.rejected || !self.deps.is_empty() {
            None
        } else {
            Some(VertexEvent::Accept(self.vertex_id))
        }
    }
}

/// DAG consensus over batched transactions.
///
/// Named for its vote rollup: poll results are pushed through the
/// processing ancestry in topological order before being handed to the
/// conflict graph.
pub struct Topological<V: Vertex> {
    ctx: Context,
    params: Parameters,

    /// The embedded conflict graph deciding the carried transactions.
    cg: Directed<V::Tx>,

    /// Processing vertices, in submission order (parents precede
    /// children).
    processing: IndexMap<Id, VertexNode<V>>,

    /// Every vertex accepted so far. Pruning old decisions is deferred.
    accepted: Set<Id>,
    /// Accepted vertices with no accepted children.
    frontier: Set<Id>,

    /// Vertices whose txs and ancestry are all currently preferred.
    preferred: Set<Id>,
    /// Vertices whose txs and ancestry are all virtuous.
    virtuous: Set<Id>,
    /// Virtuous txs carried by no preferred vertex.
    orphans: Set<Id>,

    /// Vertices parked on undecided parents and txs.
    pending: Blocker<VertexWaiter>,

    errs: Errs<ConsensusError>,
}

impl<V: Vertex> Topological<V> {
    /// Creates a DAG instance for the given chain and parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameters` when the parameters fail validation.
    pub fn new(ctx: Context, params: Parameters) -> Result<Self> {
        let cg = Directed::new(ctx.clone(), params.clone())?;
        Ok(Self {
            ctx,
            params,
            cg,
            processing: IndexMap::new(),
            accepted: Set::new(),
            frontier: Set::new(),
            preferred: Set::new(),
            virtuous: Set::new(),
            orphans: Set::new(),
            pending: Blocker::new(),
            errs: Errs::new(),
        })
    }

    /// Returns the parameters this instance runs with.
    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Returns true if no submitted transaction conflicts with `tx`.
    pub fn is_virtuous(&self, tx: &V::Tx) -> bool {
        self.cg.is_virtuous(tx)
    }

    /// Returns the ids of processing transactions conflicting with `tx`.
    pub fn conflicts(&self, tx: &V::Tx) -> Set<Id> {
        self.cg.conflicts(tx)
    }

    /// Returns true if `tx` was decided or is in the conflict graph.
    pub fn tx_issued(&self, tx: &V::Tx) -> bool {
        self.cg.issued(tx)
    }

    /// Returns true if `vtx` was decided or is being processed.
    pub fn vertex_issued(&self, vtx: &V) -> bool {
        vtx.status().decided() || self.processing.contains_key(&vtx.id())
    }

    /// Submits a vertex. Parents and dependencies must have been
    /// submitted first. Duplicate and already-decided submissions are
    /// no-ops.
    pub fn add(&mut self, vtx: VertexRef<V>) -> Result<()> {
        self.errs.check()?;

        let (vertex_id, bytes, parents, txs) = {
            let v = vtx.read();
            if v.status().decided() {
                return Ok(());
            }
            (v.id(), v.bytes().to_vec(), v.parents(), v.txs())
        };
        if self.processing.contains_key(&vertex_id) {
            return Ok(());
        }

        self.ctx.dispatcher.issue(self.ctx.chain_id, vertex_id, &bytes);
        self.ctx.metrics.issued(vertex_id);

        let mut deps = Set::new();
        let mut doomed = false;

        let mut parent_ids = Vec::with_capacity(parents.len());
        for parent in &parents {
            let p = parent.read();
            parent_ids.push(p.id());
            match p.status() {
                Status::Processing => {
                    deps.add(p.id());
                }
                Status::Rejected => doomed = true,
                Status::Accepted => {}
            }
        }

        for tx in &txs {
            self.cg.add(tx.clone())?;
        }
        // Submitting the txs may have decided some (vacuous accepts) and
        // released vertices that were waiting on them.
        let mut events: VecDeque<VertexEvent> = self.drain_tx_decisions().into();

        let mut tx_ids = Vec::with_capacity(txs.len());
        for tx in &txs {
            let t = tx.read();
            tx_ids.push(t.id());
            match t.status() {
                Status::Processing => {
                    deps.add(t.id());
                }
                Status::Rejected => doomed = true,
                Status::Accepted => {}
            }
        }

        self.processing.insert(
            vertex_id,
            VertexNode {
                vtx: vtx.clone(),
                parent_ids,
                txs,
                tx_ids,
            },
        );

        if doomed {
            events.push_back(VertexEvent::Reject(vertex_id));
        } else {
            events.extend(self.pending.register(VertexWaiter {
                vertex_id,
                deps,
                rejected: false,
            }));
        }
        self.process(events)?;

        self.update_frontiers();
        self.errs.check()
    }

    /// Applies the outcome of one network poll.
    ///
    /// `votes` maps each voted vertex to the responders naming it. A vote
    /// for a vertex endorses its whole processing ancestry, so responder
    /// sets are pushed up in topological order (each responder counted
    /// once per vertex), collapsed into per-transaction counts, and
    /// handed to the conflict graph. Votes for unknown or decided
    /// vertices are dropped.
    pub fn record_poll(&mut self, votes: &UniqueBag<Id>) -> Result<()> {
        self.errs.check()?;

        struct Kahn {
            in_degree: usize,
            votes: BitSet,
        }

        // Discover the voted subgraph, counting child edges per vertex.
        let mut kahn: IndexMap<Id, Kahn> = IndexMap::new();
        let mut stack: Vec<Id> = Vec::new();
        for (vertex_id, responders) in votes.iter() {
            if !self.processing.contains_key(vertex_id) {
                continue;
            }
            let entry = kahn.entry(*vertex_id).or_insert_with(|| {
                stack.push(*vertex_id);
                Kahn {
                    in_degree: 0,
                    votes: BitSet::new(),
                }
            });
            entry.votes.union(responders);
        }
        while let Some(vertex_id) = stack.pop() {
            let Some(node) = self.processing.get(&vertex_id) else {
                continue;
            };
            for parent_id in &node.parent_ids {
                // The rollup stops at the accepted frontier.
                if !self.processing.contains_key(parent_id) {
                    continue;
                }
                match kahn.entry(*parent_id) {
                    Entry::Occupied(mut entry) => {
                        entry.get_mut().in_degree += 1;
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(Kahn {
                            in_degree: 1,
                            votes: BitSet::new(),
                        });
                        stack.push(*parent_id);
                    }
                }
            }
        }

        // Push responder sets upward in topological order and collect the
        // per-transaction votes.
        let mut leaves: VecDeque<Id> = kahn
            .iter()
            .filter(|(_, entry)| entry.in_degree == 0)
            .map(|(vertex_id, _)| *vertex_id)
            .collect();
        let mut tx_votes: UniqueBag<Id> = UniqueBag::new();
        while let Some(vertex_id) = leaves.pop_front() {
            let votes_here = kahn
                .get(&vertex_id)
                .map(|entry| entry.votes)
                .unwrap_or_default();
            let Some(node) = self.processing.get(&vertex_id) else {
                continue;
            };
            for tx_id in &node.tx_ids {
                tx_votes.union_set(*tx_id, votes_here);
            }
            for parent_id in &node.parent_ids {
                if let Some(entry) = kahn.get_mut(parent_id) {
                    entry.votes.union(votes_here);
                    entry.in_degree -= 1;
                    if entry.in_degree == 0 {
                        leaves.push_back(*parent_id);
                    }
                }
            }
        }

        self.cg.record_poll(tx_votes.bag(self.params.alpha))?;

        let events: VecDeque<VertexEvent> = self.drain_tx_decisions().into();
        self.process(events)?;

        self.update_frontiers();
        self.errs.check()
    }

    /// Ids of vertices whose transactions and ancestry are all virtuous.
    #[must_use]
    pub fn virtuous(&self) -> Set<Id> {
        self.virtuous.clone()
    }

    /// Ids of vertices whose transactions and ancestry are all preferred.
    #[must_use]
    pub fn preferences(&self) -> Set<Id> {
        self.preferred.clone()
    }

    /// Ids of virtuous transactions carried by no preferred vertex. These
    /// need re-batching into a new vertex to make progress.
    #[must_use]
    pub fn orphans(&self) -> Set<Id> {
        self.orphans.clone()
    }

    /// Accepted vertices with no accepted children.
    #[must_use]
    pub fn accepted_frontier(&self) -> Set<Id> {
        self.frontier.clone()
    }

    /// True when every non-decided vertex is rogue: further polls only
    /// arbitrate conflicts.
    ///
    /// The virtuous vertex set is rebuilt from the processing vertices on
    /// every frontier update, so an empty set means exactly that. A
    /// vertex whose virtuous tx crossed its threshold but is parked on an
    /// undecided dependency keeps this false.
    #[must_use]
    pub fn quiesce(&self) -> bool {
        self.virtuous.is_empty()
    }

    /// True when every submitted transaction and vertex has been decided.
    #[must_use]
    pub fn finalized(&self) -> bool {
        self.processing.is_empty() && self.cg.finalized()
    }

    /// Removes and returns the stored decision-callback error, if any.
    pub fn drain_error(&mut self) -> Option<ConsensusError> {
        self.errs.take().or_else(|| self.cg.drain_error())
    }

    /// Converts freshly decided transactions into vertex waiter signals.
    fn drain_tx_decisions(&mut self) -> Vec<VertexEvent> {
        let mut events = Vec::new();
        for (tx_id, status) in self.cg.take_decisions() {
            match status {
                Status::Accepted => events.extend(self.pending.fulfill(&tx_id)),
                Status::Rejected => events.extend(self.pending.abandon(&tx_id)),
                Status::Processing => {}
            }
        }
        events
    }

    /// Applies queued verdicts until none remain or an error is stored.
    fn process(&mut self, mut queue: VecDeque<VertexEvent>) -> Result<()> {
        while let Some(event) = queue.pop_front() {
            if self.errs.errored() {
                break;
            }
            match event {
                VertexEvent::Accept(id) => self.accept_vertex(&id, &mut queue),
                VertexEvent::Reject(id) => self.reject_vertex(&id, &mut queue),
            }
        }
        self.errs.check()
    }

    fn accept_vertex(&mut self, id: &Id, queue: &mut VecDeque<VertexEvent>) {
        let Some(node) = self.processing.shift_remove(id) else {
            return;
        };

        if self.errs.add_result(node.vtx.write().accept()) {
            return;
        }
        let bytes = node.vtx.read().bytes().to_vec();
        debug!(vertex = %id, "vertex accepted");
        self.ctx.dispatcher.accept(self.ctx.chain_id, *id, &bytes);
        self.ctx.metrics.accepted(*id);

        self.accepted.add(*id);
        self.frontier.add(*id);
        for parent_id in &node.parent_ids {
            self.frontier.remove(parent_id);
        }

        queue.extend(self.pending.fulfill(id));
    }

    fn reject_vertex(&mut self, id: &Id, queue: &mut VecDeque<VertexEvent>) {
        let Some(node) = self.processing.shift_remove(id) else {
            return;
        };

        if self.errs.add_result(node.vtx.write().reject()) {
            return;
        }
        let bytes = node.vtx.read().bytes().to_vec();
        debug!(vertex = %id, "vertex rejected");
        self.ctx.dispatcher.reject(self.ctx.chain_id, *id, &bytes);
        self.ctx.metrics.rejected(*id);

        // The carried txs are left alone: a tx rejected with its vertex
        // could never be re-batched, while one orphaned by a rejected
        // parent still can be.
        queue.extend(self.pending.abandon(id));
    }

    /// Recomputes the preferred and virtuous vertex sets and the orphan
    /// transactions.
    ///
    /// Vertices are visited in submission order, so a parent's verdict
    /// for this pass is always known before its children are visited.
    fn update_frontiers(&mut self) {
        let tx_preferences = self.cg.preferences();
        let tx_virtuous = self.cg.virtuous();

        self.preferred.clear();
        self.virtuous.clear();
        let mut preferred_txs: Set<Id> = Set::new();

        for (vertex_id, node) in &self.processing {
            let mut is_preferred = true;
            let mut is_virtuous = true;

            for tx in &node.txs {
                let t = tx.read();
                // Accepted txs won their conflict sets outright.
                if t.status() == Status::Accepted {
                    continue;
                }
                let tx_id = t.id();
                is_preferred &= tx_preferences.contains(&tx_id);
                is_virtuous &= tx_virtuous.contains(&tx_id);
            }
            for parent_id in &node.parent_ids {
                if self.accepted.contains(parent_id) {
                    continue;
                }
                is_preferred &= self.preferred.contains(parent_id);
                is_virtuous &= self.virtuous.contains(parent_id);
            }

            if is_preferred {
                self.preferred.add(*vertex_id);
                for tx_id in &node.tx_ids {
                    preferred_txs.add(*tx_id);
                }
            }
            if is_virtuous {
                self.virtuous.add(*vertex_id);
            }
        }

        let mut orphans = tx_virtuous;
        orphans.difference(&preferred_txs);
        self.orphans = orphans;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_id, TestTx, TestVertex};

    fn engine() -> Topological<TestVertex> {
        // K=2, Alpha=2, BetaVirtuous=1, BetaRogue=2
        let params = Parameters::new(2, 2, 1, 2);
        Topological::new(Context::new(test_id(0)), params).unwrap()
    }

    fn votes(entries: &[(Id, &[usize])]) -> UniqueBag<Id> {
        let mut bag = UniqueBag::new();
        for (vertex_id, responders) in entries {
            for responder in *responders {
                bag.add(*responder, *vertex_id);
            }
        }
        bag
    }

    #[test]
    fn test_vertex_accepted_with_txs() {
        let mut dag = engine();
        let t1 = TestTx::new(test_id(1), [test_id(100)]).shared();
        let t2 = TestTx::new(test_id(2), [test_id(101)]).shared();
        let v = TestVertex::new(test_id(10), [], [t1.clone(), t2.clone()]).shared();

        dag.add(v.clone()).unwrap();
        assert_eq!(dag.preferences().to_vec(), vec![test_id(10)]);
        assert_eq!(dag.virtuous().to_vec(), vec![test_id(10)]);
        assert!(!dag.finalized());
        assert!(!dag.quiesce());

        dag.record_poll(&votes(&[(test_id(10), &[0, 1])])).unwrap();

        assert_eq!(t1.read().status(), Status::Accepted);
        assert_eq!(t2.read().status(), Status::Accepted);
        assert_eq!(v.read().status(), Status::Accepted);
        assert_eq!(dag.accepted_frontier().to_vec(), vec![test_id(10)]);
        assert!(dag.finalized());
        assert!(dag.quiesce());
    }

    #[test]
    fn test_child_waits_for_parent() {
        let mut dag = engine();
        let t1 = TestTx::new(test_id(1), [test_id(100)]).shared();
        let parent = TestVertex::new(test_id(10), [], [t1.clone()]).shared();
        let t2 = TestTx::new(test_id(2), [test_id(101)]).shared();
        let child =
            TestVertex::new(test_id(11), [parent.clone()], [t2.clone()]).shared();

        dag.add(parent.clone()).unwrap();
        dag.add(child.clone()).unwrap();

        // Voting for the child endorses the parent too: the rollup
        // carries the responders up, so both txs win and both vertices
        // finalize, parent first.
        dag.record_poll(&votes(&[(test_id(11), &[0, 1])])).unwrap();
        assert_eq!(t1.read().status(), Status::Accepted);
        assert_eq!(t2.read().status(), Status::Accepted);
        assert_eq!(parent.read().status(), Status::Accepted);
        assert_eq!(child.read().status(), Status::Accepted);
        assert_eq!(dag.accepted_frontier().to_vec(), vec![test_id(11)]);
    }

    #[test]
    fn test_split_votes_accept_nothing() {
        let mut dag = engine();
        let t1 = TestTx::new(test_id(1), [test_id(100)]).shared();
        let t2 = TestTx::new(test_id(2), [test_id(100)]).shared();
        let v1 = TestVertex::new(test_id(10), [], [t1.clone()]).shared();
        let v2 = TestVertex::new(test_id(11), [], [t2.clone()]).shared();

        dag.add(v1).unwrap();
        dag.add(v2).unwrap();

        // One responder each: neither tx reaches the quorum of 2.
        dag.record_poll(&votes(&[(test_id(10), &[0]), (test_id(11), &[1])]))
            .unwrap();
        assert_eq!(t1.read().status(), Status::Processing);
        assert_eq!(t2.read().status(), Status::Processing);
        // Every processing vertex is rogue: quiescent.
        assert!(dag.quiesce());
    }

    #[test]
    fn test_conflicting_vertices() {
        let mut dag = engine();
        let t1 = TestTx::new(test_id(1), [test_id(100)]).shared();
        let t2 = TestTx::new(test_id(2), [test_id(100)]).shared();
        let v1 = TestVertex::new(test_id(10), [], [t1.clone()]).shared();
        let v2 = TestVertex::new(test_id(11), [], [t2.clone()]).shared();

        dag.add(v1.clone()).unwrap();
        dag.add(v2.clone()).unwrap();

        // v1 carries the incumbent spender: only it is preferred, and
        // nothing is virtuous.
        assert_eq!(dag.preferences().to_vec(), vec![test_id(10)]);
        assert!(dag.virtuous().is_empty());

        dag.record_poll(&votes(&[(test_id(10), &[0, 1])])).unwrap();
        dag.record_poll(&votes(&[(test_id(10), &[0, 1])])).unwrap();

        assert_eq!(t1.read().status(), Status::Accepted);
        assert_eq!(t2.read().status(), Status::Rejected);
        assert_eq!(v1.read().status(), Status::Accepted);
        assert_eq!(v2.read().status(), Status::Rejected);
        assert!(dag.finalized());
    }

    #[test]
    fn test_parent_rejection_spares_txs() {
        let mut dag = engine();
        let t1 = TestTx::new(test_id(1), [test_id(100)]).shared();
        let t2 = TestTx::new(test_id(2), [test_id(100)]).shared();
        // t3 is virtuous but rides on the losing vertex.
        let t3 = TestTx::new(test_id(3), [test_id(101)]).shared();
        let v1 = TestVertex::new(test_id(10), [], [t1.clone()]).shared();
        let v2 = TestVertex::new(test_id(11), [], [t2.clone()]).shared();
        let child =
            TestVertex::new(test_id(12), [v2.clone()], [t3.clone()]).shared();

        dag.add(v1.clone()).unwrap();
        dag.add(v2.clone()).unwrap();
        dag.add(child.clone()).unwrap();

        dag.record_poll(&votes(&[(test_id(10), &[0, 1])])).unwrap();
        dag.record_poll(&votes(&[(test_id(10), &[0, 1])])).unwrap();

        assert_eq!(v2.read().status(), Status::Rejected);
        assert_eq!(child.read().status(), Status::Rejected);
        // The virtuous tx survives its vertex and shows up as an orphan.
        assert_eq!(t3.read().status(), Status::Processing);
        assert_eq!(dag.orphans().to_vec(), vec![test_id(3)]);
        assert!(!dag.finalized());
    }

    #[test]
    fn test_orphan_rebatched_and_accepted() {
        let mut dag = engine();
        let t1 = TestTx::new(test_id(1), [test_id(100)]).shared();
        let t2 = TestTx::new(test_id(2), [test_id(100)]).shared();
        let t3 = TestTx::new(test_id(3), [test_id(101)]).shared();
        let v1 = TestVertex::new(test_id(10), [], [t1.clone()]).shared();
        let v2 = TestVertex::new(test_id(11), [], [t2.clone()]).shared();
        let child =
            TestVertex::new(test_id(12), [v2.clone()], [t3.clone()]).shared();

        dag.add(v1.clone()).unwrap();
        dag.add(v2).unwrap();
        dag.add(child).unwrap();
        dag.record_poll(&votes(&[(test_id(10), &[0, 1])])).unwrap();
        dag.record_poll(&votes(&[(test_id(10), &[0, 1])])).unwrap();
        assert_eq!(dag.orphans().to_vec(), vec![test_id(3)]);

        // Re-batch the orphan on the accepted frontier.
        let v3 = TestVertex::new(test_id(13), [v1.clone()], [t3.clone()]).shared();
        dag.add(v3.clone()).unwrap();
        assert!(dag.orphans().is_empty());

        dag.record_poll(&votes(&[(test_id(13), &[0, 1])])).unwrap();
        assert_eq!(t3.read().status(), Status::Accepted);
        assert_eq!(v3.read().status(), Status::Accepted);
        assert!(dag.finalized());
    }

    #[test]
    fn test_duplicate_responder_counted_once() {
        let mut dag = engine();
        let t1 = TestTx::new(test_id(1), [test_id(100)]).shared();
        let v1 = TestVertex::new(test_id(10), [], [t1.clone()]).shared();
        dag.add(v1).unwrap();

        // The same responder voting twice is still one vote: below quorum.
        let mut bag = UniqueBag::new();
        bag.add(0, test_id(10));
        bag.add(0, test_id(10));
        dag.record_poll(&bag).unwrap();
        assert_eq!(t1.read().status(), Status::Processing);
    }

    #[test]
    fn test_rollup_merges_paths() {
        // Diamond: two children sharing one parent; voting for both
        // children gives the parent the union of responders.
        let mut dag = engine();
        let t1 = TestTx::new(test_id(1), [test_id(100)]).shared();
        let t2 = TestTx::new(test_id(2), [test_id(101)]).shared();
        let t3 = TestTx::new(test_id(3), [test_id(102)]).shared();
        let parent = TestVertex::new(test_id(10), [], [t1.clone()]).shared();
        let left =
            TestVertex::new(test_id(11), [parent.clone()], [t2.clone()]).shared();
        let right =
            TestVertex::new(test_id(12), [parent.clone()], [t3.clone()]).shared();

        dag.add(parent.clone()).unwrap();
        dag.add(left).unwrap();
        dag.add(right).unwrap();

        // Each child gets one responder; only the shared parent's tx
        // reaches the quorum.
        dag.record_poll(&votes(&[(test_id(11), &[0]), (test_id(12), &[1])]))
            .unwrap();

        assert_eq!(t1.read().status(), Status::Accepted);
        assert_eq!(parent.read().status(), Status::Accepted);
        assert_eq!(t2.read().status(), Status::Processing);
        assert_eq!(t3.read().status(), Status::Processing);
    }

    #[test]
    fn test_vertex_with_rejected_tx_is_doomed_on_add() {
        let mut dag = engine();
        let t1 = TestTx::new(test_id(1), [test_id(100)]).shared();
        let t2 = TestTx::new(test_id(2), [test_id(100)]).shared();
        let v1 = TestVertex::new(test_id(10), [], [t1.clone()]).shared();
        let v2 = TestVertex::new(test_id(11), [], [t2.clone()]).shared();
        dag.add(v1).unwrap();
        dag.add(v2).unwrap();
        dag.record_poll(&votes(&[(test_id(10), &[0, 1])])).unwrap();
        dag.record_poll(&votes(&[(test_id(10), &[0, 1])])).unwrap();
        assert_eq!(t2.read().status(), Status::Rejected);

        // Re-batching a tx that already lost its conflict dooms the new
        // vertex immediately.
        let v3 = TestVertex::new(test_id(12), [], [t2.clone()]).shared();
        dag.add(v3.clone()).unwrap();
        assert_eq!(v3.read().status(), Status::Rejected);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut dag = engine();
        let t1 = TestTx::new(test_id(1), [test_id(100)]).shared();
        let v1 = TestVertex::new(test_id(10), [], [t1]).shared();
        dag.add(v1.clone()).unwrap();
        dag.add(v1.clone()).unwrap();
        assert_eq!(dag.preferences().len(), 1);
        assert!(dag.vertex_issued(&v1.read()));
    }
}
