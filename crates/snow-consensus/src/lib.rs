//! Snow consensus engines.
//!
//! This crate implements the two tightly coupled layers a node uses to
//! decide conflicting transactions without a leader:
//!
//! - **Snowstorm** ([`Directed`]): conflict-graph consensus over
//!   transactions that consume UTXOs. Repeated network polls move bias
//!   and confidence until one spender of each UTXO is accepted and its
//!   conflicts are rejected.
//! - **Avalanche** ([`Topological`]): a vertex DAG atop Snowstorm. Each
//!   vertex batches transactions and references parent vertices; a vote
//!   for a vertex endorses its whole ancestry.
//!
//! The engines are single-threaded and poll-driven: the caller submits
//! items, runs the network polls itself (see [`poll`]), and feeds results
//! back in. Decisions surface through the externally supplied
//! [`DecisionDispatcher`] and the items' own accept/reject callbacks.
//!
//! # Example
//!
//! ```
//! use snow_consensus::testing::{test_id, TestTx, TestVertex};
//! use snow_consensus::{Context, Parameters, Topological};
//! use snow_utils::UniqueBag;
//!
//! let params = Parameters::new(2, 2, 1, 2);
//! let mut dag = Topological::new(Context::new(test_id(0)), params).unwrap();
//!
//! let tx = TestTx::new(test_id(1), [test_id(100)]).shared();
//! let vertex = TestVertex::new(test_id(10), [], [tx]).shared();
//! dag.add(vertex).unwrap();
//!
//! let mut votes = UniqueBag::new();
//! votes.add(0, test_id(10));
//! votes.add(1, test_id(10));
//! dag.record_poll(&votes).unwrap();
//!
//! assert!(dag.finalized());
//! ```

pub mod consensus;
pub mod context;
pub mod events;
pub mod metrics;
pub mod poll;
pub mod testing;

mod error;
mod parameters;

pub use consensus::{
    Decidable, Directed, Status, Topological, Tx, TxRef, Vertex, VertexRef,
};
pub use context::{Context, DecisionDispatcher, NoopDispatcher};
pub use error::{ConsensusError, Result};
pub use metrics::{ConsensusMetrics, Metrics, MetricsSnapshot};
pub use parameters::Parameters;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_default() {
        let params = Parameters::default();
        assert!(params.validate().is_ok());
        assert!(params.alpha * 2 > params.k);
        assert!(params.beta_rogue >= params.beta_virtuous);
    }
}
