//! # Proof Generator — End-to-End Orchestration
//!
//! Drives one proof request through the full pipeline: permit, validate,
//! load artifacts, prove, self-verify, package. The semaphore permit is
//! acquired before any work and held until the document is built, so
//! request order equals proving order.
//!
//! ## Design
//!
//! - Cancellation is checked between phases and raced inside the bridge;
//!   a cancelled request surfaces [`ProverError::Cancelled`] and holds no
//!   permit afterwards.
//! - `verify_proof_locally` never raises. Infrastructure faults fold into
//!   a negative [`LocalVerification`] with the error recorded.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::artifacts::ArtifactLoader;
use crate::backend::ProvingBackend;
use crate::bridge::ExecutionBridge;
use crate::config::ProverConfig;
use crate::error::ProverError;
use crate::progress::{emit, ProofPhase, ProgressSender};
use crate::proof::{LocalVerification, ProofStatus, ZkProof};
use crate::semaphore::FifoSemaphore;
use crate::transport::ArtifactFetcher;
use zkcred_circuits::{prepare_circuit_inputs, CircuitRegistry, RawCircuitData};
use zkcred_core::Timestamp;

/// Per-request knobs for [`ProofGenerator::generate_proof`].
#[derive(Debug, Default)]
pub struct GenerateOptions {
    /// Verify the proof against its verification key before returning.
    /// `None` follows [`ProverConfig::self_verify`]. Off, the resulting
    /// document is `Ready` instead of `Verified`.
    pub self_verify: Option<bool>,
    /// Receives phase/percent updates while the request runs.
    pub progress: Option<ProgressSender>,
    /// Cooperative cancellation for this request.
    pub cancel: Option<CancellationToken>,
}

/// The proving pipeline, fully assembled.
pub struct ProofGenerator {
    registry: CircuitRegistry,
    loader: ArtifactLoader,
    semaphore: FifoSemaphore,
    bridge: ExecutionBridge,
    config: ProverConfig,
}

impl ProofGenerator {
    pub fn new(
        registry: CircuitRegistry,
        fetcher: Arc<dyn ArtifactFetcher>,
        backend: Arc<dyn ProvingBackend>,
        config: ProverConfig,
    ) -> Self {
        Self {
            registry,
            loader: ArtifactLoader::new(fetcher),
            semaphore: FifoSemaphore::new(config.max_concurrent_proofs.max(1)),
            bridge: ExecutionBridge::new(backend, config.timeout_floor_ms),
            config,
        }
    }

    pub fn registry(&self) -> &CircuitRegistry {
        &self.registry
    }

    pub fn artifact_loader(&self) -> &ArtifactLoader {
        &self.loader
    }

    pub fn bridge(&self) -> &ExecutionBridge {
        &self.bridge
    }

    /// Expected proving time in milliseconds, monotonic in the circuit's
    /// constraint count, never below one second.
    pub fn estimate_proof_time(&self, circuit_id: &str) -> Result<u64, ProverError> {
        let descriptor = self.registry.circuit_config(circuit_id)?;
        let rate = self.config.constraints_per_ms.max(1);
        Ok((descriptor.estimated_constraints / rate).max(1_000))
    }

    /// Generate a proof for `circuit_id` from raw application facts.
    #[instrument(skip_all, fields(circuit_id = %circuit_id))]
    pub async fn generate_proof(
        &self,
        circuit_id: &str,
        data: &RawCircuitData,
        options: GenerateOptions,
    ) -> Result<ZkProof, ProverError> {
        let cancel = options.cancel.unwrap_or_default();
        let progress = options.progress;
        let started = Instant::now();

        // Held for the rest of the request; Drop releases on every path.
        let mut permit = self.semaphore.acquire().await;
        let self_verify = options.self_verify.unwrap_or(self.config.self_verify);
        let result = self
            .generate_inner(circuit_id, data, self_verify, &progress, &cancel)
            .await;
        permit.release();

        match &result {
            Ok(proof) => info!(
                circuit_id,
                proof_id = %proof.id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                status = ?proof.status,
                "proof generated"
            ),
            Err(e) => info!(circuit_id, error = %e, "proof generation failed"),
        }
        result
    }

    async fn generate_inner(
        &self,
        circuit_id: &str,
        data: &RawCircuitData,
        self_verify: bool,
        progress: &Option<ProgressSender>,
        cancel: &CancellationToken,
    ) -> Result<ZkProof, ProverError> {
        if cancel.is_cancelled() {
            return Err(ProverError::Cancelled {
                circuit_id: circuit_id.to_string(),
            });
        }

        emit(progress, ProofPhase::Validating, 0);
        let descriptor = self.registry.circuit_config(circuit_id)?;
        let signals = prepare_circuit_inputs(descriptor, data)?;
        emit(progress, ProofPhase::Validating, 100);

        let artifacts = self.loader.load(descriptor, progress).await?;
        if cancel.is_cancelled() {
            return Err(ProverError::Cancelled {
                circuit_id: circuit_id.to_string(),
            });
        }

        let estimate_ms = self.estimate_proof_time(circuit_id)?;
        let output = self
            .bridge
            .run_full_prove(
                circuit_id,
                Arc::clone(&artifacts),
                signals,
                estimate_ms,
                progress,
                cancel,
            )
            .await?;

        let mut status = ProofStatus::Ready;
        let mut verified_at = None;
        if self_verify {
            emit(progress, ProofPhase::Verifying, 0);
            let verdict = self
                .bridge
                .run_verify(
                    circuit_id,
                    artifacts.verification_key.clone(),
                    output.proof.clone(),
                    output.public_signals.clone(),
                    cancel,
                )
                .await;
            // A verifier that errors is the same outcome as one that
            // rejects: the fresh proof cannot be vouched for.
            match verdict {
                Ok(true) => {}
                Ok(false) => {
                    return Err(ProverError::SelfVerificationFailed {
                        circuit_id: circuit_id.to_string(),
                        cause: "proof rejected by the verification key".to_string(),
                    });
                }
                Err(cancelled @ ProverError::Cancelled { .. }) => return Err(cancelled),
                Err(e) => {
                    return Err(ProverError::SelfVerificationFailed {
                        circuit_id: circuit_id.to_string(),
                        cause: e.to_string(),
                    });
                }
            }
            status = ProofStatus::Verified;
            verified_at = Some(Timestamp::now());
            emit(progress, ProofPhase::Verifying, 100);
        }

        let generated_at = Timestamp::now();
        let proof = ZkProof {
            id: Uuid::new_v4(),
            circuit_id: circuit_id.to_string(),
            proof: output.proof,
            public_signals: output.public_signals,
            status,
            generated_at,
            verified_at,
            expires_at: self
                .config
                .proof_ttl_days
                .map(|days| generated_at.add_days(days)),
        };
        emit(progress, ProofPhase::Complete, 100);
        Ok(proof)
    }

    /// Re-check a proof against its circuit's verification key. Faults
    /// (unknown circuit, artifact failure, backend failure) produce a
    /// negative verdict with the error recorded, never a `Result` error.
    pub async fn verify_proof_locally(&self, proof: &ZkProof) -> LocalVerification {
        let verdict = self.try_verify(proof).await;
        let checked_at = Timestamp::now();
        match verdict {
            Ok(is_valid) => LocalVerification {
                is_valid,
                checked_at,
                method: "groth16-local".to_string(),
                error: None,
            },
            Err(e) => LocalVerification {
                is_valid: false,
                checked_at,
                method: "groth16-local".to_string(),
                error: Some(e.to_string()),
            },
        }
    }

    async fn try_verify(&self, proof: &ZkProof) -> Result<bool, ProverError> {
        let descriptor = self.registry.circuit_config(&proof.circuit_id)?;
        let artifacts = self.loader.load(descriptor, &None).await?;
        self.bridge
            .run_verify(
                &proof.circuit_id,
                artifacts.verification_key.clone(),
                proof.proof.clone(),
                proof.public_signals.clone(),
                &CancellationToken::new(),
            )
            .await
    }

    /// Contract-call calldata for a generated proof.
    pub fn export_proof_calldata(&self, proof: &ZkProof) -> Result<String, ProverError> {
        self.bridge
            .backend()
            .export_calldata(&proof.proof, &proof.public_signals)
            .map_err(|e| ProverError::Generation {
                circuit_id: proof.circuit_id.clone(),
                message: e.to_string(),
            })
    }
}
