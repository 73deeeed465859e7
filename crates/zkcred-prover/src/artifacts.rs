//! # Artifact Loader — Fetch, Check, Cache
//!
//! Loads the three proving artifacts of a circuit (witness generator,
//! proving key, verification key) through a pluggable transport, verifies
//! pinned SHA-256 digests, and caches per circuit.
//!
//! ## Security Invariants
//!
//! - A digest mismatch is reported as [`ArtifactLoadError::IntegrityMismatch`],
//!   never conflated with a transport failure. Mismatched bytes are
//!   discarded, not cached.
//! - A descriptor without a pinned digest loads anyway but logs a
//!   warning; unpinned artifacts are a configuration smell.
//! - The cache is written only after all three artifacts load and check
//!   clean. A partial failure leaves no trace.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{ArtifactKind, ArtifactLoadError};
use crate::progress::{emit, ProofPhase, ProgressSender};
use crate::transport::ArtifactFetcher;
use zkcred_circuits::CircuitDescriptor;

/// The in-memory artifacts of one circuit, ready for the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedArtifacts {
    /// Compiled witness-generator binary.
    pub witness_generator: Vec<u8>,
    /// Groth16 proving key.
    pub proving_key: Vec<u8>,
    /// Parsed verification key document.
    pub verification_key: serde_json::Value,
}

/// Fetches and caches proving artifacts.
pub struct ArtifactLoader {
    fetcher: Arc<dyn ArtifactFetcher>,
    cache: RwLock<HashMap<String, Arc<LoadedArtifacts>>>,
}

impl ArtifactLoader {
    pub fn new(fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        Self {
            fetcher,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Load the circuit's artifacts, cache-first.
    ///
    /// Emits [`ProofPhase::LoadingArtifacts`] progress across the three
    /// fetches when `progress` is set.
    pub async fn load(
        &self,
        descriptor: &CircuitDescriptor,
        progress: &Option<ProgressSender>,
    ) -> Result<Arc<LoadedArtifacts>, ArtifactLoadError> {
        if let Some(cached) = self.cached(&descriptor.id) {
            debug!(circuit_id = %descriptor.id, "artifact cache hit");
            emit(progress, ProofPhase::LoadingArtifacts, 100);
            return Ok(cached);
        }

        emit(progress, ProofPhase::LoadingArtifacts, 0);
        let witness_generator = self
            .fetch_checked(
                descriptor,
                ArtifactKind::WitnessGenerator,
                &descriptor.artifacts.witness_generator,
                descriptor.digests.witness_generator.as_deref(),
                progress,
                0,
            )
            .await?;
        let proving_key = self
            .fetch_checked(
                descriptor,
                ArtifactKind::ProvingKey,
                &descriptor.artifacts.proving_key,
                descriptor.digests.proving_key.as_deref(),
                progress,
                1,
            )
            .await?;
        // The verification key is digested over its canonical JSON text,
        // so whitespace differences at rest do not break the pin.
        let vkey_bytes = self
            .fetch_raw(
                descriptor,
                ArtifactKind::VerificationKey,
                &descriptor.artifacts.verification_key,
                progress,
                2,
            )
            .await?;
        let verification_key: serde_json::Value = serde_json::from_slice(&vkey_bytes)
            .map_err(|e| ArtifactLoadError::MalformedVerificationKey {
                circuit_id: descriptor.id.clone(),
                message: e.to_string(),
            })?;
        let canonical = serde_json::to_string(&verification_key).map_err(|e| {
            ArtifactLoadError::MalformedVerificationKey {
                circuit_id: descriptor.id.clone(),
                message: e.to_string(),
            }
        })?;
        self.check_digest(
            descriptor,
            ArtifactKind::VerificationKey,
            descriptor.digests.verification_key.as_deref(),
            canonical.as_bytes(),
        )?;

        let loaded = Arc::new(LoadedArtifacts {
            witness_generator,
            proving_key,
            verification_key,
        });
        self.write_cache()
            .insert(descriptor.id.clone(), Arc::clone(&loaded));
        emit(progress, ProofPhase::LoadingArtifacts, 100);
        debug!(circuit_id = %descriptor.id, "artifacts loaded and cached");
        Ok(loaded)
    }

    /// Whether the circuit's artifacts are already cached.
    pub fn is_cached(&self, circuit_id: &str) -> bool {
        self.read_cache().contains_key(circuit_id)
    }

    /// Evict one circuit's artifacts, or all of them.
    pub fn clear(&self, circuit_id: Option<&str>) {
        let mut cache = self.write_cache();
        match circuit_id {
            Some(id) => {
                cache.remove(id);
            }
            None => cache.clear(),
        }
    }

    fn cached(&self, circuit_id: &str) -> Option<Arc<LoadedArtifacts>> {
        self.read_cache().get(circuit_id).cloned()
    }

    async fn fetch_checked(
        &self,
        descriptor: &CircuitDescriptor,
        kind: ArtifactKind,
        location: &str,
        expected_digest: Option<&str>,
        progress: &Option<ProgressSender>,
        slot: u8,
    ) -> Result<Vec<u8>, ArtifactLoadError> {
        let bytes = self
            .fetch_raw(descriptor, kind, location, progress, slot)
            .await?;
        self.check_digest(descriptor, kind, expected_digest, &bytes)?;
        Ok(bytes)
    }

    async fn fetch_raw(
        &self,
        descriptor: &CircuitDescriptor,
        kind: ArtifactKind,
        location: &str,
        progress: &Option<ProgressSender>,
        slot: u8,
    ) -> Result<Vec<u8>, ArtifactLoadError> {
        let tx = progress.clone();
        let report = move |received: u64, total: Option<u64>| {
            let within = match total {
                Some(total) if total > 0 => {
                    ((received.min(total) * 100) / total) as u8
                }
                _ => 0,
            };
            // Each artifact owns one third of the phase.
            let overall = (u32::from(slot) * 100 + u32::from(within)) / 3;
            emit(&tx, ProofPhase::LoadingArtifacts, overall.min(99) as u8);
        };
        let bytes = self
            .fetcher
            .fetch(location, Some(&report))
            .await
            .map_err(|e| ArtifactLoadError::Transport {
                circuit_id: descriptor.id.clone(),
                artifact: kind,
                message: e.to_string(),
            })?;
        Ok(bytes)
    }

    fn check_digest(
        &self,
        descriptor: &CircuitDescriptor,
        kind: ArtifactKind,
        expected_digest: Option<&str>,
        bytes: &[u8],
    ) -> Result<(), ArtifactLoadError> {
        match expected_digest {
            Some(expected) => {
                let actual = sha256_hex(bytes);
                if !actual.eq_ignore_ascii_case(expected) {
                    return Err(ArtifactLoadError::IntegrityMismatch {
                        circuit_id: descriptor.id.clone(),
                        artifact: kind,
                        expected: expected.to_string(),
                        actual,
                    });
                }
                Ok(())
            }
            None => {
                warn!(
                    circuit_id = %descriptor.id,
                    artifact = %kind,
                    "no pinned digest; artifact integrity not verified"
                );
                Ok(())
            }
        }
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<LoadedArtifacts>>> {
        self.cache.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_cache(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<LoadedArtifacts>>> {
        self.cache.write().unwrap_or_else(|e| e.into_inner())
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
