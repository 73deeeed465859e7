//! # Input Validation — All Violations, One Error
//!
//! Structural validation of padded circuit inputs, run *before* signal-name
//! mapping. A failed validation reports **every** violation as a
//! `(path, message)` pair inside one [`InputValidationError`] — callers
//! building UI feedback need the complete list, not one-at-a-time
//! discovery.
//!
//! ## Rules
//!
//! - Every purported field element is a canonical non-negative decimal
//!   strictly below the field prime (no sign, no hex, no leading zeros,
//!   no overflow).
//! - Every flag and path bit is exactly 0 or 1.
//! - Every array has *exactly* the circuit's fixed length — not at most.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prepare::{PaddedActivityInputs, PaddedAttestationInputs, PaddedGrantInputs};
use crate::registry::CircuitDescriptor;
use zkcred_core::FieldElement;

/// One violated rule, addressed by a dotted/indexed path into the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Where, e.g. `timestamps[3]` or `grant_proof_siblings[1]`.
    pub path: String,
    /// What rule was broken.
    pub message: String,
}

/// Validation failure carrying the complete issue list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct InputValidationError {
    /// Every violation found, in traversal order.
    pub issues: Vec<ValidationIssue>,
}

impl std::fmt::Display for InputValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "input validation failed with {} issue(s)", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "; {}: {}", issue.path, issue.message)?;
        }
        Ok(())
    }
}

/// Accumulates issues during a validation pass.
#[derive(Debug, Default)]
pub(crate) struct IssueCollector {
    issues: Vec<ValidationIssue>,
}

impl IssueCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
        });
    }

    /// A canonical field element: non-negative decimal below the prime.
    pub(crate) fn check_field(&mut self, path: &str, value: &str) {
        if let Err(e) = FieldElement::check_canonical(value) {
            self.push(path, e.to_string());
        }
    }

    /// A bit-valued flag.
    pub(crate) fn check_flag(&mut self, path: &str, value: u8) {
        if value > 1 {
            self.push(path, format!("flag must be 0 or 1, got {value}"));
        }
    }

    /// An exact-length array. Padding has already run, so anything else is
    /// a structural defect, too short or too long alike.
    pub(crate) fn check_exact_len(&mut self, path: &str, actual: usize, expected: usize) {
        if actual != expected {
            self.push(
                path,
                format!("expected exactly {expected} entries, got {actual}"),
            );
        }
    }

    pub(crate) fn finish(self) -> Result<(), InputValidationError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(InputValidationError { issues: self.issues })
        }
    }

    fn check_field_array(&mut self, path: &str, values: &[String], expected_len: usize) {
        self.check_exact_len(path, values.len(), expected_len);
        for (i, value) in values.iter().enumerate() {
            self.check_field(&format!("{path}[{i}]"), value);
        }
    }

    fn check_sibling_matrix(
        &mut self,
        path: &str,
        rows: &[Vec<String>],
        max_records: usize,
        depth: u32,
    ) {
        self.check_exact_len(path, rows.len(), max_records);
        for (i, row) in rows.iter().enumerate() {
            let row_path = format!("{path}[{i}]");
            self.check_exact_len(&row_path, row.len(), depth as usize);
            for (j, value) in row.iter().enumerate() {
                self.check_field(&format!("{row_path}[{j}]"), value);
            }
        }
    }

    fn check_bit_matrix(&mut self, path: &str, rows: &[Vec<u8>], max_records: usize, depth: u32) {
        self.check_exact_len(path, rows.len(), max_records);
        for (i, row) in rows.iter().enumerate() {
            let row_path = format!("{path}[{i}]");
            self.check_exact_len(&row_path, row.len(), depth as usize);
            for (j, bit) in row.iter().enumerate() {
                self.check_flag(&format!("{row_path}[{j}]"), *bit);
            }
        }
    }
}

/// Validate padded activity inputs against the circuit's fixed sizes.
pub fn validate_activity_inputs(
    descriptor: &CircuitDescriptor,
    padded: &PaddedActivityInputs,
) -> Result<(), InputValidationError> {
    let max = descriptor.params.max_records;
    let depth = descriptor.params.tree_depth;
    let mut issues = IssueCollector::new();

    issues.check_field("activity_root", &padded.activity_root);
    issues.check_field("current_time", &padded.current_time);
    issues.check_field("activity_count", &padded.activity_count);
    issues.check_field_array("timestamps", &padded.timestamps, max);
    issues.check_sibling_matrix(
        "activity_proof_siblings",
        &padded.activity_proof_siblings,
        max,
        depth,
    );
    issues.check_bit_matrix(
        "activity_proof_path",
        &padded.activity_proof_path,
        max,
        depth,
    );

    issues.finish()
}

/// Validate padded grant inputs against the circuit's fixed sizes.
pub fn validate_grant_inputs(
    descriptor: &CircuitDescriptor,
    padded: &PaddedGrantInputs,
) -> Result<(), InputValidationError> {
    let max = descriptor.params.max_records;
    let depth = descriptor.params.tree_depth;
    let secondary = descriptor
        .params
        .secondary_tree_depth
        .unwrap_or(descriptor.params.tree_depth);
    let mut issues = IssueCollector::new();

    issues.check_field("grant_root", &padded.grant_root);
    issues.check_field("program_root", &padded.program_root);
    issues.check_field("grant_count", &padded.grant_count);
    issues.check_field_array("grant_id_hashes", &padded.grant_id_hashes, max);
    issues.check_field_array("program_id_hashes", &padded.program_id_hashes, max);

    issues.check_exact_len("completion_flags", padded.completion_flags.len(), max);
    for (i, flag) in padded.completion_flags.iter().enumerate() {
        issues.check_flag(&format!("completion_flags[{i}]"), *flag);
    }

    issues.check_sibling_matrix(
        "grant_proof_siblings",
        &padded.grant_proof_siblings,
        max,
        depth,
    );
    issues.check_bit_matrix("grant_proof_path", &padded.grant_proof_path, max, depth);
    issues.check_sibling_matrix(
        "program_proof_siblings",
        &padded.program_proof_siblings,
        max,
        secondary,
    );
    issues.check_bit_matrix(
        "program_proof_path",
        &padded.program_proof_path,
        max,
        secondary,
    );

    issues.finish()
}

/// Validate padded attestation inputs against the circuit's fixed sizes.
pub fn validate_attestation_inputs(
    descriptor: &CircuitDescriptor,
    padded: &PaddedAttestationInputs,
) -> Result<(), InputValidationError> {
    let max = descriptor.params.max_records;
    let depth = descriptor.params.tree_depth;
    let mut issues = IssueCollector::new();

    issues.check_field("attestation_root", &padded.attestation_root);
    issues.check_field("attestation_count", &padded.attestation_count);
    issues.check_field_array("attester_pub_x", &padded.attester_pub_x, max);
    issues.check_field_array("attester_pub_y", &padded.attester_pub_y, max);
    issues.check_field_array("sig_r8x", &padded.sig_r8x, max);
    issues.check_field_array("sig_r8y", &padded.sig_r8y, max);
    issues.check_field_array("sig_s", &padded.sig_s, max);
    issues.check_field_array("message_hashes", &padded.message_hashes, max);
    issues.check_sibling_matrix(
        "attestation_proof_siblings",
        &padded.attestation_proof_siblings,
        max,
        depth,
    );
    issues.check_bit_matrix(
        "attestation_proof_path",
        &padded.attestation_proof_path,
        max,
        depth,
    );

    issues.finish()
}
