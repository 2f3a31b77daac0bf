//! Consensus engines and the capability traits they consume.

pub mod avalanche;
pub mod snowstorm;

use std::sync::Arc;

use parking_lot::RwLock;
use snow_ids::Id;
use snow_utils::Set;

use crate::Result;

pub use avalanche::Topological;
pub use snowstorm::Directed;

/// Status of a decidable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Being processed.
    Processing,
    /// Accepted and finalized.
    Accepted,
    /// Rejected.
    Rejected,
}

impl Status {
    /// Returns true if decided (accepted or rejected).
    #[must_use]
    pub fn decided(&self) -> bool {
        matches!(self, Status::Accepted | Status::Rejected)
    }

    /// Returns true if the item was accepted.
    #[must_use]
    pub fn accepted(&self) -> bool {
        matches!(self, Status::Accepted)
    }
}

/// An item consensus can decide on.
///
/// `accept`/`reject` transition the status; their side effects belong to
/// the item's owner. The engines call each at most once per item.
pub trait Decidable: Send + Sync {
    /// Returns the unique identifier of this item.
    fn id(&self) -> Id;

    /// Returns the status of this item.
    fn status(&self) -> Status;

    /// Finalizes this item as accepted.
    fn accept(&mut self) -> Result<()>;

    /// Finalizes this item as rejected.
    fn reject(&mut self) -> Result<()>;
}

/// Shared handle to an externally owned transaction.
pub type TxRef<T> = Arc<RwLock<T>>;

/// Shared handle to an externally owned vertex.
pub type VertexRef<V> = Arc<RwLock<V>>;

/// A transaction over UTXOs.
pub trait Tx: Decidable {
    /// UTXO ids this transaction consumes. Two transactions sharing any
    /// input conflict.
    fn input_ids(&self) -> Set<Id>;

    /// Transactions that must be accepted before this one can be.
    fn dependencies(&self) -> Vec<TxRef<Self>>
    where
        Self: Sized;

    /// The transaction's serialization.
    fn bytes(&self) -> &[u8];
}

/// A batch of transactions with explicit parent references, forming a DAG.
pub trait Vertex: Decidable {
    /// The transaction type this vertex batches.
    type Tx: Tx;

    /// The vertices this vertex builds on.
    fn parents(&self) -> Vec<VertexRef<Self>>
    where
        Self: Sized;

    /// The transactions carried by this vertex, in batch order.
    fn txs(&self) -> Vec<TxRef<Self::Tx>>;

    /// The vertex's serialization.
    fn bytes(&self) -> &[u8];
}
