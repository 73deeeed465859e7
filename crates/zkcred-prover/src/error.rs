//! Error taxonomy for the proving pipeline.
//!
//! Stage-specific errors ([`ArtifactLoadError`]) nest inside the pipeline
//! error ([`ProverError`]) so callers can match on the stage that failed
//! without string inspection.

use thiserror::Error;

use zkcred_circuits::{CircuitNotFound, InputValidationError, PrepareError};

/// Which proving artifact an operation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    WitnessGenerator,
    ProvingKey,
    VerificationKey,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::WitnessGenerator => "witness generator",
            ArtifactKind::ProvingKey => "proving key",
            ArtifactKind::VerificationKey => "verification key",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors while fetching or checking proving artifacts.
#[derive(Error, Debug)]
pub enum ArtifactLoadError {
    /// The artifact could not be fetched at all.
    #[error("failed to fetch {artifact} for circuit '{circuit_id}': {message}")]
    Transport {
        circuit_id: String,
        artifact: ArtifactKind,
        message: String,
    },

    /// The artifact arrived but its digest does not match the pinned one.
    /// Distinct from [`ArtifactLoadError::Transport`]: a mismatch is a
    /// security signal, not a retryable network fault.
    #[error(
        "integrity check failed for {artifact} of circuit '{circuit_id}': \
         expected sha256 {expected}, got {actual}"
    )]
    IntegrityMismatch {
        circuit_id: String,
        artifact: ArtifactKind,
        expected: String,
        actual: String,
    },

    /// The verification key fetched is not valid JSON.
    #[error("verification key for circuit '{circuit_id}' is not valid JSON: {message}")]
    MalformedVerificationKey { circuit_id: String, message: String },
}

/// Top-level error for proof generation and verification.
#[derive(Error, Debug)]
pub enum ProverError {
    /// The requested circuit id is not registered.
    #[error(transparent)]
    CircuitNotFound(#[from] CircuitNotFound),

    /// Input preparation or validation failed.
    #[error(transparent)]
    Prepare(#[from] PrepareError),

    /// Artifact loading failed.
    #[error(transparent)]
    ArtifactLoad(#[from] ArtifactLoadError),

    /// The proving backend failed or timed out.
    #[error("proof generation failed for circuit '{circuit_id}': {message}")]
    Generation { circuit_id: String, message: String },

    /// Self-verification of a freshly generated proof failed, either
    /// because the verifier rejected it or because the verifier itself
    /// errored. The proof is discarded; this is an internal fault, not a
    /// caller input problem.
    #[error("self-verification failed for circuit '{circuit_id}': {cause}")]
    SelfVerificationFailed { circuit_id: String, cause: String },

    /// The caller cancelled the operation.
    #[error("proof generation for circuit '{circuit_id}' was cancelled")]
    Cancelled { circuit_id: String },

    /// An imported proof document has the wrong shape.
    #[error("malformed proof document: {message}")]
    MalformedProof { message: String },
}

impl ProverError {
    /// Validation issues if this error carries any, for UI surfacing.
    pub fn validation_issues(&self) -> Option<&InputValidationError> {
        match self {
            ProverError::Prepare(PrepareError::Validation(err)) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_mismatch_is_not_transport() {
        let err = ArtifactLoadError::IntegrityMismatch {
            circuit_id: "activity-history".to_string(),
            artifact: ArtifactKind::ProvingKey,
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("integrity check failed"));
        assert!(msg.contains("proving key"));
        assert!(!msg.contains("fetch"));
    }

    #[test]
    fn test_validation_issues_accessor() {
        let err = ProverError::Prepare(PrepareError::Validation(InputValidationError {
            issues: vec![],
        }));
        assert!(err.validation_issues().is_some());
        let other = ProverError::Cancelled {
            circuit_id: "x".to_string(),
        };
        assert!(other.validation_issues().is_none());
    }
}
