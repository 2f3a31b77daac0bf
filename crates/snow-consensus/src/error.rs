//! Error types for consensus.

use thiserror::Error;

/// Result type for consensus operations.
pub type Result<T> = std::result::Result<T, ConsensusError>;

/// Errors that can occur during consensus operations.
///
/// The type is `Clone` because the engines park the first decision-callback
/// failure and keep returning it until the caller drains it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    /// Invalid consensus parameters; fatal for the engine instance.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// An externally supplied accept/reject callback failed.
    #[error("decision callback failed: {0}")]
    DecisionFailed(String),
}
