//! # Merkle Module — Fixed-Depth Trees and Inclusion Proofs
//!
//! Builds fixed-depth binary trees over zero-padded leaves and produces /
//! verifies inclusion proofs, using the hash engine for node combination.
//!
//! ## Algorithm
//!
//! Leaves are right-padded with the sentinel leaf `0` to exactly
//! `2^depth`, then adjacent pairs are hashed level by level until one root
//! remains. Sibling ordering is positional: for the pair at indices
//! `(2k, 2k+1)` the parent is `hash(left, right)` — the operands are never
//! swapped.
//!
//! ## Verification
//!
//! [`verify_proof`] folds from the leaf upward using only the proof's
//! siblings and path bits and compares against the stated root. It has no
//! dependency on the tree that produced the proof, so a verifier that
//! never saw the full leaf set can run it standalone.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hash::{HashEngine, HashError};
use zkcred_core::FieldElement;

/// Largest supported tree depth. `2^32` leaves is already far beyond any
/// circuit parameter in the registry.
pub const MAX_DEPTH: u32 = 32;

/// Error from tree construction or proof generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// Trees must have at least one level of hashing.
    #[error("tree depth must be at least 1, got {0}")]
    DepthTooSmall(u32),

    /// Depth beyond [`MAX_DEPTH`].
    #[error("tree depth {0} exceeds the supported maximum of {MAX_DEPTH}")]
    DepthTooLarge(u32),

    /// More leaves than the tree can hold. Never silently truncated.
    #[error("{count} leaves exceed the 2^{depth} = {capacity} capacity")]
    TooManyLeaves {
        /// Supplied leaf count.
        count: usize,
        /// Requested depth.
        depth: u32,
        /// `2^depth`.
        capacity: usize,
    },

    /// Leaf index outside the populated range `[0, leaves.len())`.
    #[error("leaf index {index} out of range for {count} leaves")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Populated leaf count.
        count: usize,
    },

    /// Hash engine failure while combining nodes.
    #[error("hash failure: {0}")]
    Hash(#[from] HashError),
}

/// A fully-built fixed-depth Merkle tree.
///
/// Built fresh per proof request; not persisted. `levels[0]` holds the
/// padded leaves, `levels[depth]` the single root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    /// The tree root.
    pub root: FieldElement,
    /// Tree depth (number of hashing levels).
    pub depth: u32,
    /// All node levels, leaves first. `levels[l].len() == 2^(depth - l)`.
    pub levels: Vec<Vec<FieldElement>>,
}

impl MerkleTree {
    /// The padded leaf level (`2^depth` entries).
    pub fn leaves(&self) -> &[FieldElement] {
        &self.levels[0]
    }
}

/// A Merkle inclusion proof, verifiable without the originating tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Root the proof commits to.
    pub root: FieldElement,
    /// The proven leaf value.
    pub leaf: FieldElement,
    /// Index of the leaf within the padded leaf level.
    pub leaf_index: usize,
    /// Sibling hash at each level, leaf level first. Length = depth.
    pub siblings: Vec<FieldElement>,
    /// Direction bit per level: 0 = the current node was a left child,
    /// 1 = a right child. Length = depth.
    pub path_indices: Vec<u8>,
}

impl MerkleProof {
    /// The depth this proof was generated for.
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }
}

/// Build a fixed-depth tree over `leaves`, right-padding with the zero
/// sentinel to exactly `2^depth`.
pub fn build_tree(leaves: &[FieldElement], depth: u32) -> Result<MerkleTree, MerkleError> {
    let capacity = tree_capacity(depth)?;
    if leaves.len() > capacity {
        return Err(MerkleError::TooManyLeaves {
            count: leaves.len(),
            depth,
            capacity,
        });
    }

    let engine = HashEngine::global();
    let mut level: Vec<FieldElement> = leaves.to_vec();
    level.resize(capacity, FieldElement::zero());

    let mut levels = vec![level];
    for _ in 0..depth {
        let current = levels.last().unwrap_or_else(|| unreachable!("levels is never empty"));
        let mut next = Vec::with_capacity(current.len() / 2);
        for pair in current.chunks(2) {
            next.push(engine.hash_pair(&pair[0], &pair[1])?);
        }
        levels.push(next);
    }

    let root = levels[depth as usize][0].clone();
    Ok(MerkleTree { root, depth, levels })
}

/// Build the tree and extract an inclusion proof for `leaf_index`.
///
/// The index must point at a caller-supplied leaf, not padding:
/// `leaf_index < leaves.len()`.
pub fn generate_proof(
    leaves: &[FieldElement],
    leaf_index: usize,
    depth: u32,
) -> Result<MerkleProof, MerkleError> {
    if leaf_index >= leaves.len() {
        return Err(MerkleError::IndexOutOfRange {
            index: leaf_index,
            count: leaves.len(),
        });
    }
    let tree = build_tree(leaves, depth)?;

    let mut siblings = Vec::with_capacity(depth as usize);
    let mut path_indices = Vec::with_capacity(depth as usize);
    let mut position = leaf_index;
    for level in &tree.levels[..depth as usize] {
        siblings.push(level[position ^ 1].clone());
        path_indices.push((position & 1) as u8);
        position >>= 1;
    }

    Ok(MerkleProof {
        root: tree.root,
        leaf: tree.levels[0][leaf_index].clone(),
        leaf_index,
        siblings,
        path_indices,
    })
}

/// Verify an inclusion proof against its stated root.
///
/// Returns `false` for malformed proofs rather than erroring; a verifier
/// wants a verdict, not a diagnosis.
pub fn verify_proof(proof: &MerkleProof) -> bool {
    if proof.siblings.len() != proof.path_indices.len() || proof.siblings.is_empty() {
        return false;
    }
    let engine = HashEngine::global();
    let mut current = proof.leaf.clone();
    for (sibling, bit) in proof.siblings.iter().zip(&proof.path_indices) {
        current = match bit {
            0 => match engine.hash_pair(&current, sibling) {
                Ok(h) => h,
                Err(_) => return false,
            },
            1 => match engine.hash_pair(sibling, &current) {
                Ok(h) => h,
                Err(_) => return false,
            },
            _ => return false,
        };
    }
    current == proof.root
}

/// A synthetic all-zero proof used to pad under-sized proof lists up to a
/// circuit's fixed maximum. Never verifies; circuits gate padded slots out
/// via their count signal.
pub fn empty_proof(depth: u32) -> MerkleProof {
    MerkleProof {
        root: FieldElement::zero(),
        leaf: FieldElement::zero(),
        leaf_index: 0,
        siblings: vec![FieldElement::zero(); depth as usize],
        path_indices: vec![0; depth as usize],
    }
}

fn tree_capacity(depth: u32) -> Result<usize, MerkleError> {
    if depth < 1 {
        return Err(MerkleError::DepthTooSmall(depth));
    }
    if depth > MAX_DEPTH {
        return Err(MerkleError::DepthTooLarge(depth));
    }
    Ok(1usize << depth)
}
