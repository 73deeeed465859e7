//! Prover configuration.

use serde::{Deserialize, Serialize};

/// Tunables for the proving pipeline. Every field has a conservative
/// default; deserializing `{}` yields a usable configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverConfig {
    /// Proofs allowed to execute concurrently. Witness generation is
    /// memory-hungry, so the default serializes everything.
    pub max_concurrent_proofs: usize,

    /// Lower bound on the per-proof timeout, in milliseconds. The actual
    /// timeout is the larger of this and three times the estimated
    /// proving time.
    pub timeout_floor_ms: u64,

    /// Days after generation at which an exported proof is considered
    /// stale. `None` disables expiry.
    pub proof_ttl_days: Option<i64>,

    /// Constraints the estimator assumes the backend processes per
    /// millisecond.
    pub constraints_per_ms: u64,

    /// Verify every freshly generated proof against its own verification
    /// key before returning it.
    pub self_verify: bool,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            max_concurrent_proofs: 1,
            timeout_floor_ms: 180_000,
            proof_ttl_days: Some(30),
            constraints_per_ms: 10,
            self_verify: true,
        }
    }
}
