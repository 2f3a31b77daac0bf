//! Decision counters.

use std::sync::atomic::{AtomicU64, Ordering};

use snow_ids::Id;
use tracing::trace;

/// Monotone decision counters fed by the engines.
pub trait Metrics: Send + Sync {
    /// An item entered consensus.
    fn issued(&self, id: Id);

    /// An item was accepted.
    fn accepted(&self, id: Id);

    /// An item was rejected.
    fn rejected(&self, id: Id);
}

/// Default in-memory counters.
#[derive(Debug, Default)]
pub struct ConsensusMetrics {
    issued: AtomicU64,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub issued: u64,
    pub accepted: u64,
    pub rejected: u64,
}

impl MetricsSnapshot {
    /// Items issued but not yet decided.
    #[must_use]
    pub fn processing(&self) -> u64 {
        self.issued - self.accepted - self.rejected
    }
}

impl ConsensusMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            issued: self.issued.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

impl Metrics for ConsensusMetrics {
    fn issued(&self, id: Id) {
        self.issued.fetch_add(1, Ordering::Relaxed);
        trace!(%id, "issued");
    }

    fn accepted(&self, id: Id) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        trace!(%id, "accepted");
    }

    fn rejected(&self, id: Id) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        trace!(%id, "rejected");
    }
}
