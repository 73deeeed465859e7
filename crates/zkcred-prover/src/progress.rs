//! Progress reporting for long-running proof generation.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Pipeline phase, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProofPhase {
    Validating,
    LoadingArtifacts,
    Proving,
    Verifying,
    Complete,
}

impl ProofPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofPhase::Validating => "validating",
            ProofPhase::LoadingArtifacts => "loading-artifacts",
            ProofPhase::Proving => "proving",
            ProofPhase::Verifying => "verifying",
            ProofPhase::Complete => "complete",
        }
    }
}

/// One progress update. `percent` is scoped to the phase for
/// [`ProofPhase::Proving`] (synthetic, capped below 100 until the backend
/// returns) and is otherwise 0 or 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofProgress {
    pub phase: ProofPhase,
    pub percent: u8,
}

/// Unbounded sender for progress updates. Unbounded so a slow consumer
/// never stalls the pipeline; dropped receivers are silently ignored.
pub type ProgressSender = mpsc::UnboundedSender<ProofProgress>;

pub(crate) fn emit(sender: &Option<ProgressSender>, phase: ProofPhase, percent: u8) {
    if let Some(tx) = sender {
        let _ = tx.send(ProofProgress { phase, percent });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        assert!(ProofPhase::Validating < ProofPhase::LoadingArtifacts);
        assert!(ProofPhase::Proving < ProofPhase::Verifying);
        assert!(ProofPhase::Verifying < ProofPhase::Complete);
    }

    #[test]
    fn test_emit_ignores_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        emit(&Some(tx), ProofPhase::Proving, 50);
    }
}
