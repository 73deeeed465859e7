//! # zkcred-circuits — Circuit Inputs, Validation, and the Registry Surface
//!
//! Everything between raw application facts and the proving primitive's
//! named input signals.
//!
//! ## Architecture
//!
//! - **Registry** (`registry.rs`): `CircuitDescriptor` and the lookup table
//!   keyed by circuit identifier. The registry is an external collaborator
//!   to the prover; this crate owns its data shape and a built-in default
//!   set.
//!
//! - **Inputs** (`inputs.rs`): the three raw, variable-cardinality fact
//!   shapes — activity history, grant completion, peer attestation — as
//!   they arrive from callers.
//!
//! - **Preparation** (`prepare.rs`): zero-padding to each circuit's fixed
//!   sizes, identifier hashing through the hash engine, and the pure
//!   rename from internal field names to circuit signal names.
//!
//! - **Validation** (`validate.rs`): structural validation that runs
//!   *before* signal mapping and collects every violation at once.
//!
//! ## Crate Policy
//!
//! - Depends on `zkcred-core` and `zkcred-crypto` internally.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod inputs;
pub mod prepare;
pub mod registry;
pub mod signals;
pub mod validate;

pub use inputs::{
    ActivityInputs, AttestationInputs, AttestationRecord, GrantInputs, GrantRecord,
    MerkleProofInput, RawCircuitData,
};
pub use prepare::{prepare_circuit_inputs, PrepareError};
pub use registry::{
    ArtifactDigests, ArtifactLocations, CircuitDescriptor, CircuitKind, CircuitNotFound,
    CircuitParams, CircuitRegistry,
};
pub use signals::{CircuitSignals, SignalValue};
pub use validate::{InputValidationError, ValidationIssue};
