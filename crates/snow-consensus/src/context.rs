//! Per-chain context handed to the consensus engines.

use std::fmt;
use std::sync::Arc;

use snow_ids::Id;

use crate::metrics::{ConsensusMetrics, Metrics};

/// Receives every decision event an engine emits.
///
/// For each transaction or vertex the engine calls `issue` exactly once at
/// submission and later exactly one of `accept` or `reject`. The bytes are
/// the item's opaque serialization.
pub trait DecisionDispatcher: Send + Sync {
    /// An item entered consensus.
    fn issue(&self, chain_id: Id, id: Id, bytes: &[u8]);

    /// An item was finalized as accepted.
    fn accept(&self, chain_id: Id, id: Id, bytes: &[u8]);

    /// An item was finalized as rejected.
    fn reject(&self, chain_id: Id, id: Id, bytes: &[u8]);
}

/// A dispatcher that drops every event.
#[derive(Debug, Default)]
pub struct NoopDispatcher;

impl DecisionDispatcher for NoopDispatcher {
    fn issue(&self, _chain_id: Id, _id: Id, _bytes: &[u8]) {}
    fn accept(&self, _chain_id: Id, _id: Id, _bytes: &[u8]) {}
    fn reject(&self, _chain_id: Id, _id: Id, _bytes: &[u8]) {}
}

/// Collaborator handles shared by every engine running for one chain.
#[derive(Clone)]
pub struct Context {
    /// The chain this engine instance decides for.
    pub chain_id: Id,
    /// Sink for issue/accept/reject events.
    pub dispatcher: Arc<dyn DecisionDispatcher>,
    /// Decision counters.
    pub metrics: Arc<dyn Metrics>,
}

impl Context {
    /// Creates a context with a no-op dispatcher and default counters.
    #[must_use]
    pub fn new(chain_id: Id) -> Self {
        Self {
            chain_id,
            dispatcher: Arc::new(NoopDispatcher),
            metrics: Arc::new(ConsensusMetrics::new()),
        }
    }

    /// Replaces the decision dispatcher.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn DecisionDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let chain = Id::from_bytes([1u8; 32]);
        let metrics = Arc::new(ConsensusMetrics::new());
        let ctx = Context::new(chain).with_metrics(metrics.clone());

        assert_eq!(ctx.chain_id, chain);
        ctx.metrics.issued(chain);
        assert_eq!(metrics.snapshot().issued, 1);
    }
}
