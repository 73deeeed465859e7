//! # Input Preparation — Raw Facts to Circuit Signals
//!
//! Turns variable-cardinality application facts into the fixed-shape,
//! validated, circuit-named signal map a Groth16 witness generator
//! consumes. Three stages, in order:
//!
//! 1. **Pad** to the circuit's fixed sizes, hashing free-form identifiers
//!    and messages into field elements on the way in. Padding rows are
//!    zero scalars with zero-filled proof rows; a `count` signal tells the
//!    circuit how many leading rows are real.
//! 2. **Validate** every scalar, flag, and array length, collecting all
//!    violations (see [`crate::validate`]).
//! 3. **Map** internal names to the circuit's signal names, preserving
//!    declaration order.
//!
//! ## Design
//!
//! - Record-count overflow is rejected *before* padding; the error names
//!   the circuit and both numbers.
//! - Padding values never pass through the hash engine. Only real
//!   identifiers and messages are hashed.

use thiserror::Error;

use crate::inputs::{
    ActivityInputs, AttestationInputs, GrantInputs, MerkleProofInput, RawCircuitData,
};
use crate::registry::CircuitDescriptor;
use crate::signals::{CircuitSignals, SignalValue};
use crate::validate::{
    validate_activity_inputs, validate_attestation_inputs, validate_grant_inputs,
    InputValidationError,
};
use zkcred_crypto::{HashEngine, HashError};

/// Errors from input preparation.
#[derive(Error, Debug)]
pub enum PrepareError {
    /// More records than the circuit has slots for.
    #[error("circuit '{circuit_id}' accepts at most {max} records, got {got}")]
    TooManyRecords {
        circuit_id: String,
        max: usize,
        got: usize,
    },

    /// Raw data shape does not match the circuit kind.
    #[error("circuit '{circuit_id}' expects {expected} inputs, got {got}")]
    KindMismatch {
        circuit_id: String,
        expected: &'static str,
        got: &'static str,
    },

    /// Hashing an identifier or message failed.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// Structural validation of the padded inputs failed.
    #[error(transparent)]
    Validation(#[from] InputValidationError),
}

/// Activity inputs padded to fixed circuit sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedActivityInputs {
    pub activity_root: String,
    pub current_time: String,
    /// Number of real (non-padding) rows, as a decimal scalar.
    pub activity_count: String,
    pub timestamps: Vec<String>,
    pub activity_proof_siblings: Vec<Vec<String>>,
    pub activity_proof_path: Vec<Vec<u8>>,
}

/// Grant inputs padded to fixed circuit sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedGrantInputs {
    pub grant_root: String,
    pub program_root: String,
    pub grant_count: String,
    /// Grant identifiers hashed to field elements; padding rows are zero.
    pub grant_id_hashes: Vec<String>,
    pub program_id_hashes: Vec<String>,
    pub completion_flags: Vec<u8>,
    pub grant_proof_siblings: Vec<Vec<String>>,
    pub grant_proof_path: Vec<Vec<u8>>,
    pub program_proof_siblings: Vec<Vec<String>>,
    pub program_proof_path: Vec<Vec<u8>>,
}

/// Attestation inputs padded to fixed circuit sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedAttestationInputs {
    pub attestation_root: String,
    pub attestation_count: String,
    pub attester_pub_x: Vec<String>,
    pub attester_pub_y: Vec<String>,
    pub sig_r8x: Vec<String>,
    pub sig_r8y: Vec<String>,
    pub sig_s: Vec<String>,
    /// Messages hashed to field elements; padding rows are zero.
    pub message_hashes: Vec<String>,
    pub attestation_proof_siblings: Vec<Vec<String>>,
    pub attestation_proof_path: Vec<Vec<u8>>,
}

/// Prepare raw facts for the named circuit: pad, validate, map.
///
/// The returned [`CircuitSignals`] carries the circuit's own signal names
/// in declaration order and is ready for witness generation.
pub fn prepare_circuit_inputs(
    descriptor: &CircuitDescriptor,
    data: &RawCircuitData,
) -> Result<CircuitSignals, PrepareError> {
    let expected = descriptor.kind.as_str();
    let got = data.kind();
    if expected != got {
        return Err(PrepareError::KindMismatch {
            circuit_id: descriptor.id.clone(),
            expected,
            got,
        });
    }

    let count = data.record_count();
    let max = descriptor.params.max_records;
    if count > max {
        return Err(PrepareError::TooManyRecords {
            circuit_id: descriptor.id.clone(),
            max,
            got: count,
        });
    }

    match data {
        RawCircuitData::ActivityHistory(inputs) => {
            let padded = pad_activity_inputs(descriptor, inputs);
            validate_activity_inputs(descriptor, &padded)?;
            Ok(map_activity_signals(&padded))
        }
        RawCircuitData::GrantCompletion(inputs) => {
            let padded = pad_grant_inputs(descriptor, inputs)?;
            validate_grant_inputs(descriptor, &padded)?;
            Ok(map_grant_signals(&padded))
        }
        RawCircuitData::PeerAttestation(inputs) => {
            let padded = pad_attestation_inputs(descriptor, inputs)?;
            validate_attestation_inputs(descriptor, &padded)?;
            Ok(map_attestation_signals(&padded))
        }
    }
}

fn pad_scalars(mut values: Vec<String>, max: usize) -> Vec<String> {
    values.resize(max, "0".to_string());
    values
}

fn split_proofs(
    proofs: impl Iterator<Item = MerkleProofInput>,
    max: usize,
    depth: u32,
) -> (Vec<Vec<String>>, Vec<Vec<u8>>) {
    let mut siblings = Vec::with_capacity(max);
    let mut bits = Vec::with_capacity(max);
    for proof in proofs {
        siblings.push(proof.siblings);
        bits.push(proof.path_indices);
    }
    // Unused slots carry the synthetic empty proof so padding has a
    // single definition.
    let padding = MerkleProofInput::from(&zkcred_crypto::empty_proof(depth));
    siblings.resize(max, padding.siblings);
    bits.resize(max, padding.path_indices);
    (siblings, bits)
}

fn pad_activity_inputs(
    descriptor: &CircuitDescriptor,
    inputs: &ActivityInputs,
) -> PaddedActivityInputs {
    let max = descriptor.params.max_records;
    let depth = descriptor.params.tree_depth;

    let timestamps = inputs.timestamps.iter().map(|t| t.to_string()).collect();
    let (siblings, bits) = split_proofs(inputs.inclusion_proofs.iter().cloned(), max, depth);

    PaddedActivityInputs {
        activity_root: inputs.activity_root.clone(),
        current_time: inputs.current_time.to_string(),
        activity_count: inputs.timestamps.len().to_string(),
        timestamps: pad_scalars(timestamps, max),
        activity_proof_siblings: siblings,
        activity_proof_path: bits,
    }
}

fn pad_grant_inputs(
    descriptor: &CircuitDescriptor,
    inputs: &GrantInputs,
) -> Result<PaddedGrantInputs, HashError> {
    let max = descriptor.params.max_records;
    let depth = descriptor.params.tree_depth;
    let secondary = descriptor
        .params
        .secondary_tree_depth
        .unwrap_or(descriptor.params.tree_depth);
    let engine = HashEngine::global();

    let mut grant_id_hashes = Vec::with_capacity(max);
    let mut program_id_hashes = Vec::with_capacity(max);
    let mut completion_flags = Vec::with_capacity(max);
    for grant in &inputs.grants {
        grant_id_hashes.push(engine.hash_string(&grant.grant_id)?.as_str().to_string());
        program_id_hashes.push(engine.hash_string(&grant.program_id)?.as_str().to_string());
        completion_flags.push(u8::from(grant.completed));
    }
    completion_flags.resize(max, 0);

    let (grant_siblings, grant_bits) = split_proofs(
        inputs.grants.iter().map(|g| g.grant_proof.clone()),
        max,
        depth,
    );
    let (program_siblings, program_bits) = split_proofs(
        inputs.grants.iter().map(|g| g.program_proof.clone()),
        max,
        secondary,
    );

    Ok(PaddedGrantInputs {
        grant_root: inputs.grant_root.clone(),
        program_root: inputs.program_root.clone(),
        grant_count: inputs.grants.len().to_string(),
        grant_id_hashes: pad_scalars(grant_id_hashes, max),
        program_id_hashes: pad_scalars(program_id_hashes, max),
        completion_flags,
        grant_proof_siblings: grant_siblings,
        grant_proof_path: grant_bits,
        program_proof_siblings: program_siblings,
        program_proof_path: program_bits,
    })
}

fn pad_attestation_inputs(
    descriptor: &CircuitDescriptor,
    inputs: &AttestationInputs,
) -> Result<PaddedAttestationInputs, HashError> {
    let max = descriptor.params.max_records;
    let depth = descriptor.params.tree_depth;
    let engine = HashEngine::global();

    let mut attester_pub_x = Vec::with_capacity(max);
    let mut attester_pub_y = Vec::with_capacity(max);
    let mut sig_r8x = Vec::with_capacity(max);
    let mut sig_r8y = Vec::with_capacity(max);
    let mut sig_s = Vec::with_capacity(max);
    let mut message_hashes = Vec::with_capacity(max);
    for record in &inputs.attestations {
        attester_pub_x.push(record.attester_pub_x.clone());
        attester_pub_y.push(record.attester_pub_y.clone());
        sig_r8x.push(record.sig_r8x.clone());
        sig_r8y.push(record.sig_r8y.clone());
        sig_s.push(record.sig_s.clone());
        message_hashes.push(engine.hash_string(&record.message)?.as_str().to_string());
    }

    let (siblings, bits) = split_proofs(
        inputs.attestations.iter().map(|a| a.proof.clone()),
        max,
        depth,
    );

    Ok(PaddedAttestationInputs {
        attestation_root: inputs.attestation_root.clone(),
        attestation_count: inputs.attestations.len().to_string(),
        attester_pub_x: pad_scalars(attester_pub_x, max),
        attester_pub_y: pad_scalars(attester_pub_y, max),
        sig_r8x: pad_scalars(sig_r8x, max),
        sig_r8y: pad_scalars(sig_r8y, max),
        sig_s: pad_scalars(sig_s, max),
        message_hashes: pad_scalars(message_hashes, max),
        attestation_proof_siblings: siblings,
        attestation_proof_path: bits,
    })
}

fn map_activity_signals(padded: &PaddedActivityInputs) -> CircuitSignals {
    let mut signals = CircuitSignals::new();
    signals.push("root", SignalValue::Scalar(padded.activity_root.clone()));
    signals.push(
        "currentTime",
        SignalValue::Scalar(padded.current_time.clone()),
    );
    signals.push(
        "activityCount",
        SignalValue::Scalar(padded.activity_count.clone()),
    );
    signals.push("timestamps", SignalValue::Array(padded.timestamps.clone()));
    signals.push(
        "pathElements",
        SignalValue::Matrix(padded.activity_proof_siblings.clone()),
    );
    signals.push(
        "pathIndices",
        SignalValue::Matrix(bits_to_scalars(&padded.activity_proof_path)),
    );
    signals
}

fn map_grant_signals(padded: &PaddedGrantInputs) -> CircuitSignals {
    let mut signals = CircuitSignals::new();
    signals.push("grantRoot", SignalValue::Scalar(padded.grant_root.clone()));
    signals.push(
        "programRoot",
        SignalValue::Scalar(padded.program_root.clone()),
    );
    signals.push(
        "grantCount",
        SignalValue::Scalar(padded.grant_count.clone()),
    );
    signals.push(
        "grantIds",
        SignalValue::Array(padded.grant_id_hashes.clone()),
    );
    signals.push(
        "programIds",
        SignalValue::Array(padded.program_id_hashes.clone()),
    );
    signals.push(
        "completed",
        SignalValue::Array(
            padded
                .completion_flags
                .iter()
                .map(|f| f.to_string())
                .collect(),
        ),
    );
    signals.push(
        "grantPathElements",
        SignalValue::Matrix(padded.grant_proof_siblings.clone()),
    );
    signals.push(
        "grantPathIndices",
        SignalValue::Matrix(bits_to_scalars(&padded.grant_proof_path)),
    );
    signals.push(
        "programPathElements",
        SignalValue::Matrix(padded.program_proof_siblings.clone()),
    );
    signals.push(
        "programPathIndices",
        SignalValue::Matrix(bits_to_scalars(&padded.program_proof_path)),
    );
    signals
}

fn map_attestation_signals(padded: &PaddedAttestationInputs) -> CircuitSignals {
    let mut signals = CircuitSignals::new();
    signals.push(
        "root",
        SignalValue::Scalar(padded.attestation_root.clone()),
    );
    signals.push(
        "attestationCount",
        SignalValue::Scalar(padded.attestation_count.clone()),
    );
    signals.push(
        "attesterPubX",
        SignalValue::Array(padded.attester_pub_x.clone()),
    );
    signals.push(
        "attesterPubY",
        SignalValue::Array(padded.attester_pub_y.clone()),
    );
    signals.push("sigR8x", SignalValue::Array(padded.sig_r8x.clone()));
    signals.push("sigR8y", SignalValue::Array(padded.sig_r8y.clone()));
    signals.push("sigS", SignalValue::Array(padded.sig_s.clone()));
    signals.push(
        "messages",
        SignalValue::Array(padded.message_hashes.clone()),
    );
    signals.push(
        "pathElements",
        SignalValue::Matrix(padded.attestation_proof_siblings.clone()),
    );
    signals.push(
        "pathIndices",
        SignalValue::Matrix(bits_to_scalars(&padded.attestation_proof_path)),
    );
    signals
}

fn bits_to_scalars(rows: &[Vec<u8>]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|b| b.to_string()).collect())
        .collect()
}
