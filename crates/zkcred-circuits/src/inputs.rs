//! # Raw Circuit Data — Application Facts as They Arrive
//!
//! The three variable-cardinality input shapes callers submit, one per
//! circuit kind. Scalars are plain strings at this layer: canonicality is
//! enforced later by validation, which reports *every* violation at once
//! instead of failing on the first bad deserialization.

use serde::{Deserialize, Serialize};

use zkcred_crypto::MerkleProof;

/// A Merkle inclusion proof in wire form, as submitted by callers.
///
/// Structurally identical to [`zkcred_crypto::MerkleProof`] but with
/// unvalidated string scalars; validation happens with the rest of the
/// circuit input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProofInput {
    /// Root the proof commits to.
    pub root: String,
    /// The proven leaf value.
    pub leaf: String,
    /// Index of the leaf.
    pub leaf_index: u64,
    /// Sibling hash per level, leaf level first.
    pub siblings: Vec<String>,
    /// Direction bit per level: 0 = left child, 1 = right child.
    pub path_indices: Vec<u8>,
}

impl From<&MerkleProof> for MerkleProofInput {
    fn from(proof: &MerkleProof) -> Self {
        Self {
            root: proof.root.to_string(),
            leaf: proof.leaf.to_string(),
            leaf_index: proof.leaf_index as u64,
            siblings: proof.siblings.iter().map(|s| s.to_string()).collect(),
            path_indices: proof.path_indices.clone(),
        }
    }
}

/// Activity-history facts: timestamps with one inclusion proof each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityInputs {
    /// Root of the activity tree the proofs verify against.
    pub activity_root: String,
    /// Evaluation time (Unix seconds) the circuit compares against.
    pub current_time: u64,
    /// Activity timestamps (Unix seconds), most recent first by
    /// convention; order is preserved into the circuit.
    pub timestamps: Vec<u64>,
    /// One inclusion proof per timestamp, same order.
    pub inclusion_proofs: Vec<MerkleProofInput>,
}

/// One grant completion record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRecord {
    /// Application-level grant identifier; hashed before entering the
    /// circuit.
    pub grant_id: String,
    /// Identifier of the program the grant belongs to; hashed likewise.
    pub program_id: String,
    /// Whether the grant was completed.
    pub completed: bool,
    /// Inclusion proof in the grant tree.
    pub grant_proof: MerkleProofInput,
    /// Inclusion proof in the program tree.
    pub program_proof: MerkleProofInput,
}

/// Grant-completion facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantInputs {
    /// Root of the grant tree.
    pub grant_root: String,
    /// Root of the program tree.
    pub program_root: String,
    /// The grant records.
    pub grants: Vec<GrantRecord>,
}

/// One signed peer attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationRecord {
    /// Attester public key, x coordinate.
    pub attester_pub_x: String,
    /// Attester public key, y coordinate.
    pub attester_pub_y: String,
    /// Signature R8 point, x coordinate.
    pub sig_r8x: String,
    /// Signature R8 point, y coordinate.
    pub sig_r8y: String,
    /// Signature scalar S.
    pub sig_s: String,
    /// Attested message; hashed before entering the circuit.
    pub message: String,
    /// Inclusion proof of the attester in the attester tree.
    pub proof: MerkleProofInput,
}

/// Peer-attestation facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationInputs {
    /// Root of the attester tree.
    pub attestation_root: String,
    /// The attestations.
    pub attestations: Vec<AttestationRecord>,
}

/// Raw facts for any circuit, tagged by shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RawCircuitData {
    ActivityHistory(ActivityInputs),
    GrantCompletion(GrantInputs),
    PeerAttestation(AttestationInputs),
}

impl RawCircuitData {
    /// Number of variable records carried.
    pub fn record_count(&self) -> usize {
        match self {
            RawCircuitData::ActivityHistory(inputs) => inputs.timestamps.len(),
            RawCircuitData::GrantCompletion(inputs) => inputs.grants.len(),
            RawCircuitData::PeerAttestation(inputs) => inputs.attestations.len(),
        }
    }

    /// Stable shape name for errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RawCircuitData::ActivityHistory(_) => "activity-history",
            RawCircuitData::GrantCompletion(_) => "grant-completion",
            RawCircuitData::PeerAttestation(_) => "peer-attestation",
        }
    }
}
