//! # Hash Engine — Multi-Input Field Hashing
//!
//! A ZK-friendly hash over BN254 scalar field elements: an
//! add-round-constant x^5 sponge whose round constants are derived once
//! from SHA-256 in counter mode and reduced into the field.
//!
//! ## Contract
//!
//! - `hash(inputs)` accepts 1..=16 field elements and returns one.
//! - `hash_string(value)` splits the UTF-8 encoding into consecutive
//!   31-byte big-endian chunks and hashes the chunk list as one multi-input
//!   call. The empty string maps to `hash([0])` — a canonical sentinel, not
//!   the hash of an empty byte sequence. Strings longer than
//!   16 × 31 = 496 encoded bytes are rejected outright, never truncated.
//!
//! ## Singleton
//!
//! Round-constant derivation is paid once per process: `HashEngine::global()`
//! initializes on first call and hands out a shared handle. Initialization
//! is safe under concurrent first use; hashing afterwards is a pure
//! function of its inputs. `reset()` exists for test isolation only —
//! re-initialization derives identical constants, so hashes never change
//! across a reset.

use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use zkcred_core::{fr_modulus, FieldElement};

/// Maximum number of field elements one hash call accepts.
pub const MAX_HASH_INPUTS: usize = 16;

/// Maximum UTF-8 byte length `hash_string` accepts (16 chunks × 31 bytes).
pub const MAX_STRING_BYTES: usize = MAX_HASH_INPUTS * 31;

/// Rounds of the x^5 permutation.
const ROUNDS: usize = 64;

/// Domain tag mixed into round-constant derivation.
const CONSTANT_DOMAIN: &[u8] = b"zkcred.hash.v1";

/// Error from the hash engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// `hash` was called with no inputs.
    #[error("hash requires at least one input")]
    EmptyInput,

    /// `hash` was called with more inputs than the primitive supports.
    #[error("hash accepts at most {max} inputs, got {got}")]
    TooManyInputs {
        /// Number of inputs supplied.
        got: usize,
        /// The supported maximum.
        max: usize,
    },

    /// `hash_string` was called with an over-long string.
    #[error("string of {got} bytes exceeds the {max}-byte hashing ceiling")]
    StringTooLong {
        /// Encoded byte length of the input.
        got: usize,
        /// The hard ceiling.
        max: usize,
    },
}

/// The multi-input field hash engine.
///
/// Obtain via [`HashEngine::global()`]; direct construction is possible for
/// callers that want an unshared instance (tests, benchmarks).
#[derive(Debug)]
pub struct HashEngine {
    round_constants: Vec<BigUint>,
}

/// Process-wide engine handle. Guarded get-or-init rather than a bare
/// static so `reset()` can drop and re-derive deterministically.
static GLOBAL: Mutex<Option<Arc<HashEngine>>> = Mutex::new(None);

impl HashEngine {
    /// Derive a fresh engine. Pays the round-constant derivation cost.
    pub fn new() -> Self {
        let modulus = fr_modulus();
        let mut round_constants = Vec::with_capacity(ROUNDS);
        for index in 0..ROUNDS as u32 {
            let mut hasher = Sha256::new();
            hasher.update(CONSTANT_DOMAIN);
            hasher.update(index.to_be_bytes());
            let digest = hasher.finalize();
            round_constants.push(BigUint::from_bytes_be(&digest) % modulus);
        }
        Self { round_constants }
    }

    /// The shared process-wide engine, initializing it on first use.
    pub fn global() -> Arc<HashEngine> {
        let mut slot = match GLOBAL.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(engine) = slot.as_ref() {
            return Arc::clone(engine);
        }
        let engine = Arc::new(HashEngine::new());
        *slot = Some(Arc::clone(&engine));
        engine
    }

    /// Drop the shared engine so the next `global()` re-initializes.
    ///
    /// Test isolation only. Constants are re-derived identically, so hash
    /// outputs are unaffected.
    pub fn reset() {
        let mut slot = match GLOBAL.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = None;
    }

    /// Hash 1..=16 field elements into one.
    pub fn hash(&self, inputs: &[FieldElement]) -> Result<FieldElement, HashError> {
        if inputs.is_empty() {
            return Err(HashError::EmptyInput);
        }
        if inputs.len() > MAX_HASH_INPUTS {
            return Err(HashError::TooManyInputs {
                got: inputs.len(),
                max: MAX_HASH_INPUTS,
            });
        }
        let modulus = fr_modulus();
        // Length tag in the initial state keeps hash([x]) and
        // hash([x, 0]) distinct.
        let mut state = BigUint::from(inputs.len());
        for input in inputs {
            state = (state + input.to_biguint()) % modulus;
            state = self.permute(state);
        }
        FieldElement::from_biguint(state)
            .map_err(|_| unreachable!("permutation output is reduced mod the field prime"))
    }

    /// Hash an ordered pair. Node combination for the Merkle module.
    pub fn hash_pair(
        &self,
        left: &FieldElement,
        right: &FieldElement,
    ) -> Result<FieldElement, HashError> {
        self.hash(&[left.clone(), right.clone()])
    }

    /// Hash an arbitrary string by chunking its UTF-8 encoding into
    /// 31-byte big-endian field elements.
    ///
    /// # Errors
    ///
    /// [`HashError::StringTooLong`] when the encoding exceeds
    /// [`MAX_STRING_BYTES`]. This is a hard ceiling, not a truncation.
    pub fn hash_string(&self, value: &str) -> Result<FieldElement, HashError> {
        let bytes = value.as_bytes();
        if bytes.is_empty() {
            return self.hash(&[FieldElement::zero()]);
        }
        if bytes.len() > MAX_STRING_BYTES {
            return Err(HashError::StringTooLong {
                got: bytes.len(),
                max: MAX_STRING_BYTES,
            });
        }
        let chunks: Vec<FieldElement> = bytes
            .chunks(31)
            .map(|chunk| {
                FieldElement::from_bytes_be(chunk)
                    .unwrap_or_else(|_| unreachable!("chunks are at most 31 bytes"))
            })
            .collect();
        self.hash(&chunks)
    }

    /// The x^5 add-round-constant permutation.
    fn permute(&self, mut state: BigUint) -> BigUint {
        let modulus = fr_modulus();
        let exponent = BigUint::from(5u8);
        for constant in &self.round_constants {
            state = (state + constant) % modulus;
            state = state.modpow(&exponent, modulus);
        }
        state
    }
}

impl Default for HashEngine {
    fn default() -> Self {
        Self::new()
    }
}
