//! # zkcred-core — Foundational Types for the zkcred Proving Stack
//!
//! This crate is the bedrock of the zkcred workspace. It defines the
//! type-system primitives that every other crate builds on; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **`FieldElement` newtype for circuit scalars.** Every value that
//!    crosses into a circuit is a canonical decimal string strictly below
//!    the BN254 scalar field prime. Construction validates; no bare strings
//!    reach the prover.
//!
//! 2. **UTC-only timestamps.** The `Timestamp` type enforces UTC with Z
//!    suffix and seconds precision, so proof documents serialize
//!    deterministically.
//!
//! 3. **Structured errors.** All error types derive `thiserror::Error` and
//!    carry enough context to render actionable messages without
//!    re-deriving state.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `zkcred-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize`.

pub mod error;
pub mod field;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use error::{FieldError, TimestampError};
pub use field::{fr_modulus, FieldElement};
pub use temporal::Timestamp;
