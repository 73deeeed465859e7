//! # Proof Documents — Packaging, Export, Expiry
//!
//! The [`ZkProof`] document wraps a Groth16 proof with identity, status,
//! and lifecycle timestamps, and round-trips through JSON byte-for-byte
//! equal. Expiry is advisory: a stale proof still verifies, callers
//! decide whether to accept it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::Groth16Proof;
use crate::error::ProverError;
use zkcred_core::Timestamp;

/// Lifecycle status of a proof document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProofStatus {
    /// Generated; not verified locally.
    Ready,
    /// Generated and self-verified against the circuit's verification key.
    Verified,
}

/// A generated proof with its public signals and lifecycle metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkProof {
    pub id: Uuid,
    pub circuit_id: String,
    pub proof: Groth16Proof,
    pub public_signals: Vec<String>,
    pub status: ProofStatus,
    pub generated_at: Timestamp,
    /// Set only when self-verification ran and passed.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub verified_at: Option<Timestamp>,
    /// Advisory staleness deadline. `None` means the proof never expires.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expires_at: Option<Timestamp>,
}

impl ZkProof {
    /// Whether the proof is stale at `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        match self.expires_at {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}

/// Whether the proof is stale right now. Missing `expires_at` never
/// expires.
pub fn is_proof_expired(proof: &ZkProof) -> bool {
    proof.is_expired_at(Timestamp::now())
}

/// Serialize a proof document for storage or transfer.
pub fn export_proof_to_json(proof: &ZkProof) -> Result<String, ProverError> {
    serde_json::to_string_pretty(proof).map_err(|e| ProverError::MalformedProof {
        message: e.to_string(),
    })
}

/// Parse a proof document, rejecting anything without the minimal shape
/// (id, circuit id, proof object, public-signals array).
pub fn import_proof_from_json(json: &str) -> Result<ZkProof, ProverError> {
    let proof: ZkProof =
        serde_json::from_str(json).map_err(|e| ProverError::MalformedProof {
            message: e.to_string(),
        })?;
    if proof.circuit_id.is_empty() {
        return Err(ProverError::MalformedProof {
            message: "empty circuit_id".to_string(),
        });
    }
    Ok(proof)
}

/// Outcome of a local verification attempt. Never an error: faults are
/// folded into `is_valid: false` with `error` set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalVerification {
    pub is_valid: bool,
    pub checked_at: Timestamp,
    /// How the verdict was produced, e.g. `groth16-local`.
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_proof(expires_at: Option<Timestamp>) -> ZkProof {
        let point = |v: &str| [v.to_string(), v.to_string(), "1".to_string()];
        ZkProof {
            id: Uuid::new_v4(),
            circuit_id: "activity-history".to_string(),
            proof: Groth16Proof {
                pi_a: point("11"),
                pi_b: [
                    ["1".to_string(), "2".to_string()],
                    ["3".to_string(), "4".to_string()],
                    ["1".to_string(), "0".to_string()],
                ],
                pi_c: point("13"),
                protocol: "groth16".to_string(),
                curve: "bn128".to_string(),
            },
            public_signals: vec!["5".to_string(), "6".to_string()],
            status: ProofStatus::Verified,
            generated_at: Timestamp::from_epoch_secs(1_700_000_000).unwrap(),
            verified_at: Some(Timestamp::from_epoch_secs(1_700_000_001).unwrap()),
            expires_at,
        }
    }

    #[test]
    fn test_export_import_roundtrip_deep_equal() {
        let proof = sample_proof(Some(
            Timestamp::from_epoch_secs(1_702_592_000).unwrap(),
        ));
        let json = export_proof_to_json(&proof).unwrap();
        let back = import_proof_from_json(&json).unwrap();
        assert_eq!(back, proof);
        // And the serialized form is stable across a second round.
        assert_eq!(export_proof_to_json(&back).unwrap(), json);
    }

    #[test]
    fn test_import_rejects_malformed_documents() {
        for bad in [
            "not json",
            "{}",
            r#"{"id": "not-a-uuid", "circuit_id": "x"}"#,
            r#"{"id": "8c2f9d9e-7b4e-4f6a-9d2e-1a2b3c4d5e6f"}"#,
        ] {
            assert!(matches!(
                import_proof_from_json(bad),
                Err(ProverError::MalformedProof { .. })
            ));
        }
    }

    #[test]
    fn test_expiry_rules() {
        let never = sample_proof(None);
        assert!(!is_proof_expired(&never));

        let past = sample_proof(Some(Timestamp::from_epoch_secs(1_700_000_100).unwrap()));
        let now = Timestamp::from_epoch_secs(1_800_000_000).unwrap();
        assert!(past.is_expired_at(now));
        assert!(!past.is_expired_at(Timestamp::from_epoch_secs(1_700_000_099).unwrap()));
        // The deadline itself counts as expired.
        assert!(past.is_expired_at(Timestamp::from_epoch_secs(1_700_000_100).unwrap()));
    }

    #[test]
    fn test_optional_fields_omitted_when_absent() {
        let mut proof = sample_proof(None);
        proof.verified_at = None;
        proof.status = ProofStatus::Ready;
        let json = export_proof_to_json(&proof).unwrap();
        assert!(!json.contains("verified_at"));
        assert!(!json.contains("expires_at"));
        assert!(json.contains(r#""status": "ready""#));
    }
}
