//! Directed conflict-graph consensus over transactions.
//!
//! Every processing transaction is a node; two transactions consuming the
//! same UTXO are joined by a directed edge pointing at the currently
//! better-supported spender. Polls move bias and confidence, flip edges,
//! and eventually drive one spender of each UTXO to acceptance and the
//! rest to rejection.

use std::collections::VecDeque;
use std::fmt;

use indexmap::IndexMap;
use snow_ids::Id;
use snow_utils::errors::Errs;
use snow_utils::{Bag, Set};
use tracing::{debug, trace};

use super::{Decidable, Status, Tx, TxRef};
use crate::context::Context;
use crate::events::{Blockable, Blocker};
use crate::parameters::Parameters;
use crate::{ConsensusError, Result};

/// Conflict-graph state for one processing transaction.
struct DirectedTx<T: Tx> {
    tx: TxRef<T>,
    /// Total polls this tx has won.
    bias: u64,
    /// Consecutive polls won; reset by any gap.
    confidence: u64,
    /// Poll index of the most recent win.
    last_vote: u64,
    /// Whether this tx conflicts with any other submitted tx.
    rogue: bool,
    /// Whether an acceptor has been registered for this tx.
    pending_accept: bool,
    /// Conflicting txs whose edges point at this tx.
    ins: Set<Id>,
    /// Conflicting txs this tx's edges point at.
    outs: Set<Id>,
}

impl<T: Tx> DirectedTx<T> {
    fn new(tx: TxRef<T>, outs: Set<Id>) -> Self {
        let rogue = !outs.is_empty();
        Self {
            tx,
            bias: 0,
            confidence: 0,
            last_vote: 0,
            rogue,
            pending_accept: false,
            ins: Set::new(),
            outs,
        }
    }
}

/// Verdict the graph must apply for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxEvent {
    Accept(Id),
    Reject(Id),
}

/// Parked until every dependency of a threshold-crossing tx is accepted.
struct Acceptor {
    tx_id: Id,
    deps: Set<Id>,
    rejected: bool,
}

impl Blockable for Acceptor {
    type Event = TxEvent;

    fn dependencies(&self) -> &Set<Id> {
        &self.deps
    }

    fn fulfill(&mut self, id: &Id) -> Option<TxEvent> {
        self.deps.remove(id);
        self.update()
    }

    fn abandon(&mut self, _id: &Id) -> Option<TxEvent> {
        // A dependency was rejected; the accept will never fire. The
        // rejector cascade handles the tx itself.
        self.rejected = true;
        None
    }

    fn update(&mut self) -> Option<TxEvent> {
        if self.rejected || !self.deps.is_empty() {
            None
        } else {
            Some(TxEvent::Accept(self.tx_id))
        }
    }
}

/// Cascades rejection onto a tx the moment any dependency is rejected.
struct Rejector {
    tx_id: Id,
    deps: Set<Id>,
    rejected: bool,
}

impl Blockable for Rejector {
    type Event = TxEvent;

    fn dependencies(&self) -> &Set<Id> {
        &self.deps
    }

    fn fulfill(&mut self, _id: &Id) -> Option<TxEvent> {
        if self.rejected {
            return None;
        }
        self.rejected = true;
        Some(TxEvent::Reject(self.tx_id))
    }

    fn abandon(&mut self, _id: &Id) -> Option<TxEvent> {
        // Dependency accepted: one fewer thing to wait on.
        None
    }

    fn update(&mut self) -> Option<TxEvent> {
        None
    }
}

/// Multi-color, non-transitive conflict-graph consensus.
///
/// Submitted transactions are decided against each other per consumed
/// UTXO. The engine is single-threaded: `add`, `record_poll`, and the
/// queries must be driven from one dispatcher.
pub struct Directed<T: Tx> {
    ctx: Context,
    params: Parameters,

    /// Node representing each processing transaction.
    txs: IndexMap<Id, DirectedTx<T>>,

    /// UTXO id to the ids of processing transactions consuming it.
    utxos: IndexMap<Id, Set<Id>>,

    /// Conflict-free transactions.
    virtuous: Set<Id>,
    /// Conflict-free transactions still requiring polls.
    virtuous_voting: Set<Id>,
    /// Transactions with no outbound conflict edge.
    preferences: Set<Id>,

    /// Accepts parked on undecided dependencies. Fulfill means the
    /// dependency was accepted; abandon means it was rejected.
    pending_accept: Blocker<Acceptor>,
    /// Reject cascades parked on undecided dependencies. Fulfill means the
    /// dependency was rejected; abandon means it was accepted.
    pending_reject: Blocker<Rejector>,

    /// Index of the current poll.
    current_vote: u64,

    /// Decisions reached since the last drain, in the order they fired.
    decided: Vec<(Id, Status)>,

    errs: Errs<ConsensusError>,
}

impl<T: Tx> Directed<T> {
    /// Creates a conflict graph for the given chain and parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameters` when the parameters fail validation.
    pub fn new(ctx: Context, params: Parameters) -> Result<Self> {
        params
            .validate()
            .map_err(ConsensusError::InvalidParameters)?;
        Ok(Self {
            ctx,
            params,
            txs: IndexMap::new(),
            utxos: IndexMap::new(),
            virtuous: Set::new(),
            virtuous_voting: Set::new(),
            preferences: Set::new(),
            pending_accept: Blocker::new(),
            pending_reject: Blocker::new(),
            current_vote: 0,
            decided: Vec::new(),
            errs: Errs::new(),
        })
    }

    /// Returns the parameters this instance runs with.
    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    /// Returns true if no submitted transaction conflicts with `tx`.
    pub fn is_virtuous(&self, tx: &T) -> bool {
        if let Some(node) = self.txs.get(&tx.id()) {
            return !node.rogue;
        }
        !tx.input_ids()
            .iter()
            .any(|input| self.utxos.contains_key(input))
    }

    /// Returns the ids of every processing transaction conflicting with
    /// `tx`.
    pub fn conflicts(&self, tx: &T) -> Set<Id> {
        let mut conflicts = Set::new();
        if let Some(node) = self.txs.get(&tx.id()) {
            conflicts.union(&node.ins);
            conflicts.union(&node.outs);
        } else {
            for input in tx.input_ids().iter() {
                if let Some(spends) = self.utxos.get(input) {
                    conflicts.union(spends);
                }
            }
            conflicts.remove(&tx.id());
        }
        conflicts
    }

    /// Returns true if `tx` was decided or is in the graph.
    pub fn issued(&self, tx: &T) -> bool {
        tx.status().decided() || self.txs.contains_key(&tx.id())
    }

    /// Submits a transaction. Duplicate and already-decided submissions
    /// are no-ops.
    pub fn add(&mut self, tx: TxRef<T>) -> Result<()> {
        self.errs.check()?;

        let (tx_id, inputs, bytes) = {
            let t = tx.read();
            if t.status().decided() {
                return Ok(());
            }
            (t.id(), t.input_ids(), t.bytes().to_vec())
        };
        if self.txs.contains_key(&tx_id) {
            return Ok(());
        }

        self.ctx.dispatcher.issue(self.ctx.chain_id, tx_id, &bytes);

        // A transaction with no inputs conflicts with nothing: vacuously
        // accepted on submission.
        if inputs.is_empty() {
            if let Err(e) = tx.write().accept() {
                self.errs.add(e.clone());
                return Err(e);
            }
            debug!(tx = %tx_id, "vacuous transaction accepted");
            self.ctx.dispatcher.accept(self.ctx.chain_id, tx_id, &bytes);
            self.ctx.metrics.issued(tx_id);
            self.ctx.metrics.accepted(tx_id);
            self.decided.push((tx_id, Status::Accepted));
            return Ok(());
        }

        // Wire the conflict edges: the newcomer points at every existing
        // spender of each of its inputs.
        let mut outs = Set::new();
        for input in inputs.iter() {
            let spends = self.utxos.entry(*input).or_default();
            for conflict_id in spends.iter() {
                outs.add(*conflict_id);
            }
            spends.add(tx_id);
        }
        for conflict_id in outs.iter() {
            if let Some(conflict) = self.txs.get_mut(conflict_id) {
                conflict.rogue = true;
                conflict.ins.add(tx_id);
            }
            self.virtuous.remove(conflict_id);
            self.virtuous_voting.remove(conflict_id);
        }

        let node = DirectedTx::new(tx.clone(), outs);
        let rogue = node.rogue;
        self.txs.insert(tx_id, node);
        if !rogue {
            self.virtuous.add(tx_id);
            self.virtuous_voting.add(tx_id);
            // No conflicts means no out edges, which means preferred.
            self.preferences.add(tx_id);
        }
        self.ctx.metrics.issued(tx_id);

        // If any dependency ends up rejected this tx must follow it.
        let deps = self.undecided_deps(&tx);
        let events = self.pending_reject.register(Rejector {
            tx_id,
            deps,
            rejected: false,
        });
        self.process(events.into())?;

        self.debug_check_invariants();
        self.errs.check()
    }

    /// Applies the outcome of one network poll.
    ///
    /// The bag holds per-transaction vote counts; ids reaching the alpha
    /// quorum are winners, applied in the order they first entered the
    /// bag. Votes for unknown or already-decided transactions are dropped.
    pub fn record_poll(&mut self, mut votes: Bag<Id>) -> Result<()> {
        self.errs.check()?;

        self.current_vote += 1;
        let beta_virtuous = self.params.beta_virtuous as u64;
        let beta_rogue = self.params.beta_rogue as u64;

        votes.set_threshold(self.params.alpha);
        let winners = votes.threshold().to_vec();
        for tx_id in winners {
            let ready = {
                let Some(node) = self.txs.get_mut(&tx_id) else {
                    continue;
                };
                // Confidence only survives consecutive wins.
                if node.last_vote + 1 != self.current_vote {
                    node.confidence = 0;
                }
                node.last_vote = self.current_vote;
                node.bias += 1;
                node.confidence += 1;
                trace!(
                    tx = %tx_id,
                    bias = node.bias,
                    confidence = node.confidence,
                    "poll winner"
                );

                !node.pending_accept
                    && ((!node.rogue && node.confidence >= beta_virtuous)
                        || node.confidence >= beta_rogue)
            };

            if ready {
                self.defer_acceptance(tx_id)?;
            }
            // The cascade may have decided the winner already.
            if self.txs.contains_key(&tx_id) {
                self.redirect_edges(&tx_id);
            }
        }

        self.debug_check_invariants();
        self.errs.check()
    }

    /// Ids of conflict-free transactions.
    #[must_use]
    pub fn virtuous(&self) -> Set<Id> {
        self.virtuous.clone()
    }

    /// Ids of conflict-free transactions still requiring polls.
    #[must_use]
    pub fn virtuous_voting(&self) -> Set<Id> {
        self.virtuous_voting.clone()
    }

    /// Ids of transactions currently winning their conflict sets.
    #[must_use]
    pub fn preferences(&self) -> Set<Id> {
        self.preferences.clone()
    }

    /// True when no conflict-free transaction still needs polls; further
    /// polls only arbitrate conflicts.
    #[must_use]
    pub fn quiesce(&self) -> bool {
        self.virtuous_voting.is_empty()
    }

    /// True when every submitted transaction has been decided.
    #[must_use]
    pub fn finalized(&self) -> bool {
        self.txs.is_empty()
    }

    /// Removes and returns the stored decision-callback error, if any.
    pub fn drain_error(&mut self) -> Option<ConsensusError> {
        self.errs.take()
    }

    /// Removes and returns the decisions reached since the last call, in
    /// the order they fired.
    pub(crate) fn take_decisions(&mut self) -> Vec<(Id, Status)> {
        std::mem::take(&mut self.decided)
    }

    fn undecided_deps(&self, tx: &TxRef<T>) -> Set<Id> {
        let mut deps = Set::new();
        let dependencies = tx.read().dependencies();
        for dep in dependencies {
            let d = dep.read();
            if !d.status().decided() {
                deps.add(d.id());
            }
        }
        deps
    }

    /// Marks a threshold-crossing tx as pending accept and parks the
    /// accept on its undecided dependencies.
    fn defer_acceptance(&mut self, tx_id: Id) -> Result<()> {
        let tx = match self.txs.get_mut(&tx_id) {
            Some(node) => {
                node.pending_accept = true;
                node.tx.clone()
            }
            None => return Ok(()),
        };
        // No longer requires polls; only its dependencies hold it now.
        self.virtuous_voting.remove(&tx_id);

        let deps = self.undecided_deps(&tx);
        let events = self.pending_accept.register(Acceptor {
            tx_id,
            deps,
            rejected: false,
        });
        self.process(events.into())
    }

    /// Applies queued verdicts until none remain or an error is stored.
    fn process(&mut self, mut queue: VecDeque<TxEvent>) -> Result<()> {
        while let Some(event) = queue.pop_front() {
            if self.errs.errored() {
                break;
            }
            match event {
                TxEvent::Accept(id) => self.accept_tx(&id, &mut queue),
                TxEvent::Reject(id) => self.reject_tx(&id, &mut queue),
            }
        }
        self.errs.check()
    }

    fn accept_tx(&mut self, id: &Id, queue: &mut VecDeque<TxEvent>) {
        let Some(node) = self.txs.shift_remove(id) else {
            return;
        };

        // The conflict sets die with this accept: purge every consumed
        // UTXO outright.
        {
            let inputs = node.tx.read().input_ids();
            for input in inputs.iter() {
                self.utxos.shift_remove(input);
            }
        }
        self.virtuous.remove(id);
        self.preferences.remove(id);

        // Losing conflicts go first: ins, then outs (normally empty, as
        // accept requires no outbound edges).
        for conflict in node.ins.to_vec() {
            self.reject_tx(&conflict, queue);
        }
        for conflict in node.outs.to_vec() {
            self.reject_tx(&conflict, queue);
        }
        if self.errs.errored() {
            return;
        }

        if self.errs.add_result(node.tx.write().accept()) {
            return;
        }
        let bytes = node.tx.read().bytes().to_vec();
        debug!(tx = %id, "transaction accepted");
        self.ctx.dispatcher.accept(self.ctx.chain_id, *id, &bytes);
        self.ctx.metrics.accepted(*id);
        self.decided.push((*id, Status::Accepted));

        queue.extend(self.pending_accept.fulfill(id));
        queue.extend(self.pending_reject.abandon(id));
    }

    fn reject_tx(&mut self, id: &Id, queue: &mut VecDeque<TxEvent>) {
        let Some(node) = self.txs.shift_remove(id) else {
            return;
        };

        self.preferences.remove(id);
        // A dependency-rejected tx may have been virtuous.
        self.virtuous.remove(id);
        self.virtuous_voting.remove(id);

        // Drop this spender from its UTXO entries so future submissions
        // do not conflict with a ghost.
        {
            let inputs = node.tx.read().input_ids();
            for input in inputs.iter() {
                let emptied = match self.utxos.get_mut(input) {
                    Some(spends) => {
                        spends.remove(id);
                        spends.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    self.utxos.shift_remove(input);
                }
            }
        }

        self.remove_conflict(id, &node.ins);
        self.remove_conflict(id, &node.outs);

        if self.errs.add_result(node.tx.write().reject()) {
            return;
        }
        let bytes = node.tx.read().bytes().to_vec();
        debug!(tx = %id, "transaction rejected");
        self.ctx.dispatcher.reject(self.ctx.chain_id, *id, &bytes);
        self.ctx.metrics.rejected(*id);
        self.decided.push((*id, Status::Rejected));

        queue.extend(self.pending_accept.abandon(id));
        queue.extend(self.pending_reject.fulfill(id));
    }

    /// Detaches a removed node from its remaining neighbors; a neighbor
    /// left with no outbound edges becomes preferred.
    fn remove_conflict(&mut self, id: &Id, neighbors: &Set<Id>) {
        for neighbor_id in neighbors.iter() {
            let mut now_preferred = false;
            if let Some(neighbor) = self.txs.get_mut(neighbor_id) {
                neighbor.ins.remove(id);
                neighbor.outs.remove(id);
                now_preferred = neighbor.outs.is_empty();
            }
            if now_preferred {
                self.preferences.add(*neighbor_id);
            }
        }
    }

    fn redirect_edges(&mut self, id: &Id) {
        let outs = match self.txs.get(id) {
            Some(node) => node.outs.to_vec(),
            None => return,
        };
        for conflict_id in outs {
            self.redirect_edge(id, &conflict_id);
        }
    }

    /// Inverts the edge toward `conflict_id` when the winner has strictly
    /// higher bias; equal bias keeps the current direction.
    fn redirect_edge(&mut self, id: &Id, conflict_id: &Id) {
        let bias = match self.txs.get(id) {
            Some(node) => node.bias,
            None => return,
        };
        let flipped = match self.txs.get_mut(conflict_id) {
            Some(conflict) if bias > conflict.bias => {
                conflict.confidence = 0;
                conflict.ins.remove(id);
                conflict.outs.add(*id);
                true
            }
            _ => false,
        };
        if !flipped {
            return;
        }
        // The loser now has an outbound edge and cannot be preferred.
        self.preferences.remove(conflict_id);

        let now_preferred = match self.txs.get_mut(id) {
            Some(node) => {
                node.ins.add(*conflict_id);
                node.outs.remove(conflict_id);
                node.outs.is_empty()
            }
            None => return,
        };
        if now_preferred {
            self.preferences.add(*id);
        }
    }

    /// Structural checks for test builds; compiled out of release builds.
    fn debug_check_invariants(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        for (id, node) in &self.txs {
            debug_assert!(
                node.ins.is_empty() && node.outs.is_empty() || node.rogue,
                "tx {id} has conflict edges but is not rogue"
            );
            debug_assert_eq!(
                node.outs.is_empty(),
                self.preferences.contains(id),
                "preference set out of sync for {id}"
            );
            debug_assert_eq!(
                !node.rogue,
                self.virtuous.contains(id),
                "virtuous set out of sync for {id}"
            );
            debug_assert!(
                !self.virtuous_voting.contains(id) || !node.pending_accept,
                "tx {id} is pending accept but still voting"
            );
            for neighbor_id in node.outs.iter() {
                let symmetric = self
                    .txs
                    .get(neighbor_id)
                    .is_some_and(|neighbor| neighbor.ins.contains(id));
                debug_assert!(symmetric, "edge {id} -> {neighbor_id} is not symmetric");
            }
            for neighbor_id in node.ins.iter() {
                let symmetric = self
                    .txs
                    .get(neighbor_id)
                    .is_some_and(|neighbor| neighbor.outs.contains(id));
                debug_assert!(symmetric, "edge {neighbor_id} -> {id} is not symmetric");
            }
        }
        for id in self.virtuous_voting.iter() {
            debug_assert!(
                self.virtuous.contains(id),
                "voting tx {id} is not virtuous"
            );
        }
        for id in self.virtuous.iter() {
            debug_assert!(
                self.preferences.contains(id),
                "virtuous tx {id} is not preferred"
            );
        }
        for (utxo, spends) in &self.utxos {
            for id in spends.iter() {
                debug_assert!(
                    self.txs.contains_key(id),
                    "utxo {utxo} names unknown spender {id}"
                );
            }
        }
    }
}

impl<T: Tx> fmt::Display for Directed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rows: Vec<(&Id, &DirectedTx<T>)> = self.txs.iter().collect();
        rows.sort_by(|a, b| a.0.cmp(b.0));

        write!(f, "DG(")?;
        for (i, (id, node)) in rows.iter().enumerate() {
            // A stale last vote means the confidence streak is broken.
            let confidence = if node.last_vote != self.current_vote {
                0
            } else {
                node.confidence
            };
            write!(
                f,
                "\n    Choice[{i}] = ID: {id} Confidence: {confidence} Bias: {}",
                node.bias
            )?;
        }
        if !rows.is_empty() {
            writeln!(f)?;
        }
        write!(f, ")")
    }
}
