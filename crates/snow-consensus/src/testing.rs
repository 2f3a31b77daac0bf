//! Test doubles for exercising the consensus engines.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use snow_ids::Id;
use snow_utils::Set;

use crate::consensus::{Decidable, Status, Tx, TxRef, Vertex, VertexRef};
use crate::context::DecisionDispatcher;
use crate::{ConsensusError, Result};

/// Builds an id whose 32 bytes are all `byte`.
#[must_use]
pub fn test_id(byte: u8) -> Id {
    Id::from_bytes([byte; 32])
}

/// A scriptable transaction.
pub struct TestTx {
    id: Id,
    inputs: Set<Id>,
    deps: Vec<TxRef<TestTx>>,
    bytes: Vec<u8>,
    status: Status,
    fail_accept: bool,
}

impl TestTx {
    /// Creates a processing transaction consuming the given UTXOs.
    pub fn new(id: Id, inputs: impl IntoIterator<Item = Id>) -> Self {
        Self {
            id,
            inputs: Set::of(inputs),
            deps: Vec::new(),
            bytes: id.as_bytes().to_vec(),
            status: Status::Processing,
            fail_accept: false,
        }
    }

    /// Declares a transaction this one depends on.
    #[must_use]
    pub fn with_dependency(mut self, dep: TxRef<TestTx>) -> Self {
        self.deps.push(dep);
        self
    }

    /// Makes the accept callback fail.
    #[must_use]
    pub fn failing_accept(mut self) -> Self {
        self.fail_accept = true;
        self
    }

    /// Wraps the transaction in the shared handle the engines take.
    #[must_use]
    pub fn shared(self) -> TxRef<TestTx> {
        Arc::new(RwLock::new(self))
    }
}

impl Decidable for TestTx {
    fn id(&self) -> Id {
        self.id
    }

    fn status(&self) -> Status {
        self.status
    }

    fn accept(&mut self) -> Result<()> {
        if self.fail_accept {
            return Err(ConsensusError::DecisionFailed(format!(
                "{} refused accept",
                self.id
            )));
        }
        self.status = Status::Accepted;
        Ok(())
    }

    fn reject(&mut self) -> Result<()> {
        self.status = Status::Rejected;
        Ok(())
    }
}

impl Tx for TestTx {
    fn input_ids(&self) -> Set<Id> {
        self.inputs.clone()
    }

    fn dependencies(&self) -> Vec<TxRef<TestTx>> {
        self.deps.clone()
    }

    fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A scriptable vertex batching [`TestTx`]s.
pub struct TestVertex {
    id: Id,
    parents: Vec<VertexRef<TestVertex>>,
    txs: Vec<TxRef<TestTx>>,
    bytes: Vec<u8>,
    status: Status,
}

impl TestVertex {
    /// Creates a processing vertex with the given parents and batch.
    pub fn new(
        id: Id,
        parents: impl IntoIterator<Item = VertexRef<TestVertex>>,
        txs: impl IntoIterator<Item = TxRef<TestTx>>,
    ) -> Self {
        Self {
            id,
            parents: parents.into_iter().collect(),
            txs: txs.into_iter().collect(),
            bytes: id.as_bytes().to_vec(),
            status: Status::Processing,
        }
    }

    /// Wraps the vertex in the shared handle the engines take.
    #[must_use]
    pub fn shared(self) -> VertexRef<TestVertex> {
        Arc::new(RwLock::new(self))
    }
}

impl Decidable for TestVertex {
    fn id(&self) -> Id {
        self.id
    }

    fn status(&self) -> Status {
        self.status
    }

    fn accept(&mut self) -> Result<()> {
        self.status = Status::Accepted;
        Ok(())
    }

    fn reject(&mut self) -> Result<()> {
        self.status = Status::Rejected;
        Ok(())
    }
}

impl Vertex for TestVertex {
    type Tx = TestTx;

    fn parents(&self) -> Vec<VertexRef<TestVertex>> {
        self.parents.clone()
    }

    fn txs(&self) -> Vec<TxRef<TestTx>> {
        self.txs.clone()
    }

    fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// The kind of a recorded decision event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Issue,
    Accept,
    Reject,
}

/// Records every dispatched decision event, in order.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<(EventKind, Id)>>,
}

impl RecordingDispatcher {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded events in dispatch order.
    pub fn events(&self) -> Vec<(EventKind, Id)> {
        self.events.lock().clone()
    }

    /// Returns the recorded events of one kind, in dispatch order.
    pub fn of_kind(&self, kind: EventKind) -> Vec<Id> {
        self.events
            .lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, id)| *id)
            .collect()
    }
}

impl DecisionDispatcher for RecordingDispatcher {
    fn issue(&self, _chain_id: Id, id: Id, _bytes: &[u8]) {
        self.events.lock().push((EventKind::Issue, id));
    }

    fn accept(&self, _chain_id: Id, id: Id, _bytes: &[u8]) {
        self.events.lock().push((EventKind::Accept, id));
    }

    fn reject(&self, _chain_id: Id, id: Id, _bytes: &[u8]) {
        self.events.lock().push((EventKind::Reject, id));
    }
}
