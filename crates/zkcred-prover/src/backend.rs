//! # Proving Backend — Capability Trait and Mock
//!
//! The minimal surface a Groth16 engine must offer the pipeline:
//! `full_prove`, `verify`, `export_calldata`. Methods are synchronous and
//! CPU-bound; the execution bridge decides where they run.
//!
//! [`MockBackend`] is a deterministic stand-in for development and tests.
//! It derives every output from SHA-256 over its inputs, and binds proofs
//! to the proving key through a `mock_key_id` field the verification key
//! carries, so a proof made with one key pair fails verification against
//! another.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use zkcred_circuits::CircuitSignals;
use zkcred_core::FieldElement;

/// A Groth16 proof in the conventional three-point wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16Proof {
    pub pi_a: [String; 3],
    pub pi_b: [[String; 2]; 3],
    pub pi_c: [String; 3],
    pub protocol: String,
    pub curve: String,
}

/// Result of a successful proving run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProveOutput {
    pub proof: Groth16Proof,
    pub public_signals: Vec<String>,
}

/// Backend failure, opaque to the pipeline.
#[derive(Error, Debug)]
#[error("proving backend error: {0}")]
pub struct BackendError(pub String);

/// What a proving engine must be able to do.
pub trait ProvingBackend: Send + Sync {
    /// Generate witness and proof in one step.
    fn full_prove(
        &self,
        witness_generator: &[u8],
        proving_key: &[u8],
        signals: &CircuitSignals,
    ) -> Result<ProveOutput, BackendError>;

    /// Check a proof against a verification key. `Ok(false)` is a sound
    /// negative verdict, not an error.
    fn verify(
        &self,
        verification_key: &serde_json::Value,
        proof: &Groth16Proof,
        public_signals: &[String],
    ) -> Result<bool, BackendError>;

    /// Render proof plus public signals as contract-call calldata.
    fn export_calldata(
        &self,
        proof: &Groth16Proof,
        public_signals: &[String],
    ) -> Result<String, BackendError>;
}

/// Deterministic hash-based stand-in for a real Groth16 engine.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    delay: Option<Duration>,
    fail_prove: bool,
    reject_verify: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside `full_prove`, simulating real proving cost.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every `full_prove` call fails.
    pub fn failing() -> Self {
        Self {
            fail_prove: true,
            ..Self::default()
        }
    }

    /// Every `verify` call returns a negative verdict.
    pub fn rejecting() -> Self {
        Self {
            reject_verify: true,
            ..Self::default()
        }
    }

    /// Verification key matching a proving key, carrying the binding id.
    pub fn verification_key_for(proving_key: &[u8]) -> serde_json::Value {
        serde_json::json!({
            "protocol": "groth16",
            "curve": "bn128",
            "mock_key_id": hex_digest(&[proving_key]),
        })
    }

    fn expected_proof(public_signals: &[String], key_id: &str) -> Groth16Proof {
        let signals_blob = public_signals.join(",");
        let point = |tag: &str| {
            field_from_digest(&[tag.as_bytes(), key_id.as_bytes(), signals_blob.as_bytes()])
        };
        Groth16Proof {
            pi_a: [point("pi_a.x"), point("pi_a.y"), "1".to_string()],
            pi_b: [
                [point("pi_b.0.x"), point("pi_b.0.y")],
                [point("pi_b.1.x"), point("pi_b.1.y")],
                ["1".to_string(), "0".to_string()],
            ],
            pi_c: [point("pi_c.x"), point("pi_c.y"), "1".to_string()],
            protocol: "groth16".to_string(),
            curve: "bn128".to_string(),
        }
    }
}

impl ProvingBackend for MockBackend {
    fn full_prove(
        &self,
        witness_generator: &[u8],
        proving_key: &[u8],
        signals: &CircuitSignals,
    ) -> Result<ProveOutput, BackendError> {
        if self.fail_prove {
            return Err(BackendError("mock backend configured to fail".to_string()));
        }
        if witness_generator.is_empty() {
            return Err(BackendError("empty witness generator".to_string()));
        }
        if proving_key.is_empty() {
            return Err(BackendError("empty proving key".to_string()));
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let signals_json = signals.to_json();
        let public_signals = vec![
            field_from_digest(&[b"mock.signal.0", signals_json.as_bytes()]),
            field_from_digest(&[b"mock.signal.1", signals_json.as_bytes()]),
        ];
        let key_id = hex_digest(&[proving_key]);
        Ok(ProveOutput {
            proof: Self::expected_proof(&public_signals, &key_id),
            public_signals,
        })
    }

    fn verify(
        &self,
        verification_key: &serde_json::Value,
        proof: &Groth16Proof,
        public_signals: &[String],
    ) -> Result<bool, BackendError> {
        if self.reject_verify {
            return Ok(false);
        }
        let key_id = verification_key
            .get("mock_key_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                BackendError("verification key carries no mock_key_id binding".to_string())
            })?;
        Ok(*proof == Self::expected_proof(public_signals, key_id))
    }

    fn export_calldata(
        &self,
        proof: &Groth16Proof,
        public_signals: &[String],
    ) -> Result<String, BackendError> {
        // snarkjs-style: [a, b, c, publicSignals], coordinates without the
        // projective tail.
        let calldata = serde_json::json!([
            [proof.pi_a[0], proof.pi_a[1]],
            [
                [proof.pi_b[0][0], proof.pi_b[0][1]],
                [proof.pi_b[1][0], proof.pi_b[1][1]],
            ],
            [proof.pi_c[0], proof.pi_c[1]],
            public_signals,
        ]);
        serde_json::to_string(&calldata).map_err(|e| BackendError(e.to_string()))
    }
}

fn hex_digest(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

// 31 big-endian digest bytes always fit below the field prime.
fn field_from_digest(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    match FieldElement::from_bytes_be(&digest[..31]) {
        Ok(fe) => fe.as_str().to_string(),
        Err(_) => "0".to_string(),
    }
}
