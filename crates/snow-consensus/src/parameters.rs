//! Consensus parameters.

/// Parameters for the snow consensus engines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    /// Sample size (k) - number of peers polled per round.
    pub k: usize,

    /// Quorum size (alpha) - votes needed for a poll to count for an item.
    /// Must be a strict majority of `k`.
    pub alpha: usize,

    /// Consecutive successes needed to accept a conflict-free transaction.
    pub beta_virtuous: usize,

    /// Consecutive successes needed to accept a transaction with conflicts.
    pub beta_rogue: usize,

    /// Maximum number of parent references per vertex.
    pub parents: usize,

    /// Maximum number of transactions batched into one vertex.
    pub batch_size: usize,

    /// Minimum number of polls kept outstanding while items are undecided.
    pub concurrent_repolls: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            k: 20,
            alpha: 15,
            beta_virtuous: 15,
            beta_rogue: 20,
            parents: 5,
            batch_size: 30,
            concurrent_repolls: 4,
        }
    }
}

impl Parameters {
    /// Creates new parameters with the given polling values, keeping the
    /// default DAG shape. `concurrent_repolls` is clamped to stay within
    /// `beta_rogue`.
    pub fn new(k: usize, alpha: usize, beta_virtuous: usize, beta_rogue: usize) -> Self {
        let defaults = Self::default();
        Self {
            k,
            alpha,
            beta_virtuous,
            beta_rogue,
            concurrent_repolls: defaults.concurrent_repolls.min(beta_rogue.max(1)),
            ..defaults
        }
    }

    /// Validates the parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.alpha * 2 <= self.k {
            return Err(format!(
                "alpha ({}) must be a strict majority of k ({})",
                self.alpha, self.k
            ));
        }
        if self.alpha > self.k {
            return Err(format!("alpha ({}) must be <= k ({})", self.alpha, self.k));
        }
        if self.beta_virtuous == 0 {
            return Err("beta_virtuous must be positive".to_string());
        }
        if self.beta_rogue < self.beta_virtuous {
            return Err(format!(
                "beta_rogue ({}) must be >= beta_virtuous ({})",
                self.beta_rogue, self.beta_virtuous
            ));
        }
        if self.parents < 2 {
            return Err(format!("parents ({}) must be >= 2", self.parents));
        }
        if self.batch_size == 0 {
            return Err("batch_size must be positive".to_string());
        }
        if self.concurrent_repolls == 0 || self.concurrent_repolls > self.beta_rogue {
            return Err(format!(
                "concurrent_repolls ({}) must be in [1, beta_rogue ({})]",
                self.concurrent_repolls, self.beta_rogue
            ));
        }
        Ok(())
    }
}
