//! # Circuit Registry — Descriptors and Lookup
//!
//! The registry maps a circuit identifier to its fixed-size parameters,
//! artifact locations, and expected constraint count. To the prover it is
//! a read-only lookup table; deployments extend it with `register()`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Registry miss.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown circuit: {0}")]
pub struct CircuitNotFound(pub String);

/// Which raw input shape a circuit consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitKind {
    /// Activity timestamps with one inclusion proof each.
    ActivityHistory,
    /// Grant records with a completion flag and two inclusion proofs each.
    GrantCompletion,
    /// Signed peer attestations with one inclusion proof each.
    PeerAttestation,
}

impl CircuitKind {
    /// Stable name used in errors and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitKind::ActivityHistory => "activity-history",
            CircuitKind::GrantCompletion => "grant-completion",
            CircuitKind::PeerAttestation => "peer-attestation",
        }
    }
}

/// Per-circuit fixed-size parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitParams {
    /// Maximum number of records the circuit accepts; shorter inputs are
    /// zero-padded to exactly this length.
    pub max_records: usize,
    /// Depth of the primary Merkle tree.
    pub tree_depth: u32,
    /// Depth of the secondary tree, for circuits that verify two proofs
    /// per record (grant tree vs program tree).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_tree_depth: Option<u32>,
}

/// Where the three proving artifacts live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocations {
    /// Witness generator binary.
    pub witness_generator: String,
    /// Proving key binary.
    pub proving_key: String,
    /// Verification key JSON document.
    pub verification_key: String,
}

/// Optional expected SHA-256 digests (lowercase hex) of each artifact.
///
/// An artifact with no configured digest skips integrity checking — not
/// every deployment publishes hashes, but the loader flags the gap in its
/// logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDigests {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness_generator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proving_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_key: Option<String>,
}

/// Everything the prover needs to know about one circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitDescriptor {
    /// Stable identifier, the registry key.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Circuit version string.
    pub version: String,
    /// Which raw input shape this circuit consumes.
    pub kind: CircuitKind,
    /// Fixed-size parameters.
    pub params: CircuitParams,
    /// Estimated constraint count, used for proving-time estimation.
    pub estimated_constraints: u64,
    /// Artifact locations.
    pub artifacts: ArtifactLocations,
    /// Optional integrity digests.
    #[serde(default)]
    pub digests: ArtifactDigests,
}

/// The circuit lookup table.
#[derive(Debug, Clone, Default)]
pub struct CircuitRegistry {
    circuits: BTreeMap<String, CircuitDescriptor>,
}

impl CircuitRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in circuit set shipped with the stack.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(CircuitDescriptor {
            id: "activity-history".to_string(),
            name: "Activity History".to_string(),
            version: "1.0.0".to_string(),
            kind: CircuitKind::ActivityHistory,
            params: CircuitParams {
                max_records: 32,
                tree_depth: 16,
                secondary_tree_depth: None,
            },
            estimated_constraints: 48_000,
            artifacts: artifact_locations("activity-history"),
            digests: ArtifactDigests::default(),
        });
        registry.register(CircuitDescriptor {
            id: "grant-completion".to_string(),
            name: "Grant Completion".to_string(),
            version: "1.0.0".to_string(),
            kind: CircuitKind::GrantCompletion,
            params: CircuitParams {
                max_records: 16,
                tree_depth: 16,
                secondary_tree_depth: Some(16),
            },
            estimated_constraints: 120_000,
            artifacts: artifact_locations("grant-completion"),
            digests: ArtifactDigests::default(),
        });
        registry.register(CircuitDescriptor {
            id: "peer-attestation".to_string(),
            name: "Peer Attestation".to_string(),
            version: "1.0.0".to_string(),
            kind: CircuitKind::PeerAttestation,
            params: CircuitParams {
                max_records: 8,
                tree_depth: 16,
                secondary_tree_depth: None,
            },
            estimated_constraints: 86_000,
            artifacts: artifact_locations("peer-attestation"),
            digests: ArtifactDigests::default(),
        });
        registry
    }

    /// Add or replace a descriptor, keyed by its id.
    pub fn register(&mut self, descriptor: CircuitDescriptor) {
        self.circuits.insert(descriptor.id.clone(), descriptor);
    }

    /// Look up a circuit's descriptor.
    pub fn circuit_config(&self, id: &str) -> Result<&CircuitDescriptor, CircuitNotFound> {
        self.circuits
            .get(id)
            .ok_or_else(|| CircuitNotFound(id.to_string()))
    }

    /// All registered identifiers.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.circuits.keys().map(String::as_str)
    }
}

fn artifact_locations(id: &str) -> ArtifactLocations {
    ArtifactLocations {
        witness_generator: format!("https://artifacts.zkcred.dev/{id}/witness.wasm"),
        proving_key: format!("https://artifacts.zkcred.dev/{id}/proving.zkey"),
        verification_key: format!("https://artifacts.zkcred.dev/{id}/verification_key.json"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_three_circuits() {
        let registry = CircuitRegistry::builtin();
        let ids: Vec<&str> = registry.ids().collect();
        assert_eq!(
            ids,
            vec!["activity-history", "grant-completion", "peer-attestation"]
        );
    }

    #[test]
    fn test_lookup_hit_and_miss() {
        let registry = CircuitRegistry::builtin();
        let descriptor = registry.circuit_config("grant-completion").unwrap();
        assert_eq!(descriptor.kind, CircuitKind::GrantCompletion);
        assert_eq!(descriptor.params.secondary_tree_depth, Some(16));

        let miss = registry.circuit_config("no-such-circuit").unwrap_err();
        assert_eq!(miss, CircuitNotFound("no-such-circuit".to_string()));
        assert_eq!(miss.to_string(), "unknown circuit: no-such-circuit");
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = CircuitRegistry::builtin();
        let mut descriptor = registry.circuit_config("peer-attestation").unwrap().clone();
        descriptor.version = "2.0.0".to_string();
        registry.register(descriptor);
        assert_eq!(
            registry.circuit_config("peer-attestation").unwrap().version,
            "2.0.0"
        );
    }

    #[test]
    fn test_descriptor_serde_roundtrip() {
        let registry = CircuitRegistry::builtin();
        let descriptor = registry.circuit_config("activity-history").unwrap();
        let json = serde_json::to_string(descriptor).unwrap();
        let back: CircuitDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, descriptor);
    }
}
