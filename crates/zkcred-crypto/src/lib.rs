//! # zkcred-crypto — Hash Engine and Merkle Trees
//!
//! Cryptographic primitives sitting between the foundational types in
//! `zkcred-core` and the circuit/prover layers above.
//!
//! ## Architecture
//!
//! - **Hash engine** (`hash.rs`): a lazily-initialized, process-wide
//!   singleton hashing up to 16 field elements into one, plus a
//!   string-hashing convenience that chunks arbitrary byte strings into
//!   field-sized pieces.
//!
//! - **Merkle module** (`merkle.rs`): fixed-depth binary trees over padded
//!   leaves, inclusion proof generation, and standalone proof verification
//!   using the hash engine for node combination.
//!
//! ## Crate Policy
//!
//! - Depends only on `zkcred-core` internally.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod hash;
pub mod merkle;

pub use hash::{HashEngine, HashError, MAX_HASH_INPUTS, MAX_STRING_BYTES};
pub use merkle::{
    build_tree, empty_proof, generate_proof, verify_proof, MerkleError, MerkleProof, MerkleTree,
};
