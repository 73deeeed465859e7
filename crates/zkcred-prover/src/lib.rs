//! # zkcred-prover — Proof Generation Pipeline
//!
//! Orchestrates Groth16 proof generation end to end: raw facts are
//! validated and mapped to circuit signals (`zkcred-circuits`), proving
//! artifacts are fetched with integrity checks and cached, a strict-FIFO
//! semaphore serializes the CPU-heavy work, and the execution bridge runs
//! the backend isolated with a one-way inline fallback.
//!
//! The proving engine itself is behind the [`ProvingBackend`] trait;
//! [`MockBackend`] is the deterministic development stand-in.

pub mod artifacts;
pub mod backend;
pub mod bridge;
pub mod config;
pub mod error;
pub mod generator;
pub mod progress;
pub mod proof;
pub mod semaphore;
pub mod transport;

pub use artifacts::{ArtifactLoader, LoadedArtifacts};
pub use backend::{BackendError, Groth16Proof, MockBackend, ProveOutput, ProvingBackend};
pub use bridge::{BridgeHealth, ExecutionBridge};
pub use config::ProverConfig;
pub use error::{ArtifactKind, ArtifactLoadError, ProverError};
pub use generator::{GenerateOptions, ProofGenerator};
pub use progress::{ProofPhase, ProofProgress, ProgressSender};
pub use proof::{
    export_proof_to_json, import_proof_from_json, is_proof_expired, LocalVerification,
    ProofStatus, ZkProof,
};
pub use semaphore::{FifoSemaphore, Permit};
pub use transport::{ArtifactFetcher, FetchError, FsFetcher, HttpFetcher, MapFetcher};
