//! End-to-end pipeline tests over the in-memory transport and the mock
//! proving backend.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use zkcred_circuits::{
    ActivityInputs, ArtifactDigests, ArtifactLocations, CircuitDescriptor, CircuitKind,
    CircuitParams, CircuitRegistry, MerkleProofInput, RawCircuitData,
};
use zkcred_core::FieldElement;
use zkcred_crypto::{build_tree, generate_proof};
use zkcred_prover::{
    export_proof_to_json, import_proof_from_json, ArtifactLoadError, GenerateOptions,
    MapFetcher, MockBackend, ProofGenerator, ProofPhase, ProofStatus, ProverConfig,
    ProverError, ProvingBackend,
};

const DEPTH: u32 = 3;

fn descriptor(digests: ArtifactDigests) -> CircuitDescriptor {
    CircuitDescriptor {
        id: "activity-history".to_string(),
        name: "activity history".to_string(),
        version: "0.0.1".to_string(),
        kind: CircuitKind::ActivityHistory,
        params: CircuitParams {
            max_records: 4,
            tree_depth: DEPTH,
            secondary_tree_depth: None,
        },
        estimated_constraints: 48_000,
        artifacts: ArtifactLocations {
            witness_generator: "mem://wasm".to_string(),
            proving_key: "mem://zkey".to_string(),
            verification_key: "mem://vkey".to_string(),
        },
        digests,
    }
}

fn fetcher() -> MapFetcher {
    let vkey = MockBackend::verification_key_for(b"zkey");
    MapFetcher::new()
        .with("mem://wasm", b"wasm-bytes".to_vec())
        .with("mem://zkey", b"zkey".to_vec())
        .with("mem://vkey", serde_json::to_vec(&vkey).unwrap())
}

fn stack_with(backend: Arc<dyn ProvingBackend>, digests: ArtifactDigests) -> ProofGenerator {
    let mut registry = CircuitRegistry::empty();
    registry.register(descriptor(digests));
    ProofGenerator::new(registry, Arc::new(fetcher()), backend, ProverConfig::default())
}

fn stack() -> ProofGenerator {
    stack_with(Arc::new(MockBackend::new()), ArtifactDigests::default())
}

fn activity_data() -> RawCircuitData {
    let leaves: Vec<FieldElement> = (0..3u64)
        .map(|i| FieldElement::from(1_700_000_000 + i))
        .collect();
    let tree = build_tree(&leaves, DEPTH).unwrap();
    let proofs = (0..3)
        .map(|i| MerkleProofInput::from(&generate_proof(&leaves, i, DEPTH).unwrap()))
        .collect();
    RawCircuitData::ActivityHistory(ActivityInputs {
        activity_root: tree.root.as_str().to_string(),
        current_time: 1_700_100_000,
        timestamps: (0..3u64).map(|i| 1_700_000_000 + i).collect(),
        inclusion_proofs: proofs,
    })
}

#[tokio::test]
async fn test_full_pipeline_generates_verified_proof() {
    let generator = stack();
    let proof = generator
        .generate_proof("activity-history", &activity_data(), GenerateOptions::default())
        .await
        .unwrap();

    assert_eq!(proof.circuit_id, "activity-history");
    assert_eq!(proof.status, ProofStatus::Verified);
    assert!(proof.verified_at.is_some());
    assert_eq!(proof.public_signals.len(), 2);
    // Default 30-day expiry.
    assert_eq!(
        proof.expires_at,
        Some(proof.generated_at.add_days(30))
    );

    let verdict = generator.verify_proof_locally(&proof).await;
    assert!(verdict.is_valid);
    assert_eq!(verdict.method, "groth16-local");
    assert!(verdict.error.is_none());

    let calldata = generator.export_proof_calldata(&proof).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&calldata).unwrap();
    assert_eq!(parsed.as_array().map(|a| a.len()), Some(4));
}

#[tokio::test]
async fn test_skipping_self_verify_yields_ready() {
    let generator = stack();
    let proof = generator
        .generate_proof(
            "activity-history",
            &activity_data(),
            GenerateOptions {
                self_verify: Some(false),
                ..GenerateOptions::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(proof.status, ProofStatus::Ready);
    assert!(proof.verified_at.is_none());
}

#[tokio::test]
async fn test_rejecting_backend_is_hard_error() {
    let generator = stack_with(Arc::new(MockBackend::rejecting()), ArtifactDigests::default());
    match generator
        .generate_proof("activity-history", &activity_data(), GenerateOptions::default())
        .await
    {
        Err(ProverError::SelfVerificationFailed { circuit_id, cause }) => {
            assert_eq!(circuit_id, "activity-history");
            assert!(cause.contains("rejected"), "unexpected cause: {cause}");
        }
        other => panic!("expected SelfVerificationFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_erroring_verifier_surfaces_as_verification_failure() {
    // A verification key without the backend's key binding makes the
    // verify call itself error. That still counts as a failed
    // self-verification, not a generic generation fault.
    let mut registry = CircuitRegistry::empty();
    registry.register(descriptor(ArtifactDigests::default()));
    let broken_vkey = serde_json::json!({ "protocol": "groth16", "curve": "bn128" });
    let fetcher = MapFetcher::new()
        .with("mem://wasm", b"wasm-bytes".to_vec())
        .with("mem://zkey", b"zkey".to_vec())
        .with("mem://vkey", serde_json::to_vec(&broken_vkey).unwrap());
    let generator = ProofGenerator::new(
        registry,
        Arc::new(fetcher),
        Arc::new(MockBackend::new()),
        ProverConfig::default(),
    );

    match generator
        .generate_proof("activity-history", &activity_data(), GenerateOptions::default())
        .await
    {
        Err(ProverError::SelfVerificationFailed { circuit_id, cause }) => {
            assert_eq!(circuit_id, "activity-history");
            assert!(cause.contains("mock_key_id"), "unexpected cause: {cause}");
        }
        other => panic!("expected SelfVerificationFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_export_import_roundtrip() {
    let generator = stack();
    let proof = generator
        .generate_proof("activity-history", &activity_data(), GenerateOptions::default())
        .await
        .unwrap();
    let json = export_proof_to_json(&proof).unwrap();
    let back = import_proof_from_json(&json).unwrap();
    assert_eq!(back, proof);

    // The re-imported document still verifies.
    assert!(generator.verify_proof_locally(&back).await.is_valid);
}

#[tokio::test]
async fn test_tampered_proof_fails_local_verification() {
    let generator = stack();
    let mut proof = generator
        .generate_proof("activity-history", &activity_data(), GenerateOptions::default())
        .await
        .unwrap();
    proof.public_signals[0] = "1".to_string();
    let verdict = generator.verify_proof_locally(&proof).await;
    assert!(!verdict.is_valid);
    // A clean negative verdict, not an infrastructure fault.
    assert!(verdict.error.is_none());
}

#[tokio::test]
async fn test_local_verification_never_raises() {
    let generator = stack();
    let mut proof = generator
        .generate_proof("activity-history", &activity_data(), GenerateOptions::default())
        .await
        .unwrap();
    proof.circuit_id = "no-such-circuit".to_string();
    let verdict = generator.verify_proof_locally(&proof).await;
    assert!(!verdict.is_valid);
    assert!(verdict.error.is_some());
}

#[tokio::test]
async fn test_integrity_mismatch_surfaces_as_artifact_error() {
    let mut digests = ArtifactDigests::default();
    digests.proving_key = Some("ab".repeat(32));
    let generator = stack_with(Arc::new(MockBackend::new()), digests);
    match generator
        .generate_proof("activity-history", &activity_data(), GenerateOptions::default())
        .await
    {
        Err(ProverError::ArtifactLoad(ArtifactLoadError::IntegrityMismatch {
            expected, ..
        })) => assert_eq!(expected, "ab".repeat(32)),
        other => panic!("expected IntegrityMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_circuit() {
    let generator = stack();
    assert!(matches!(
        generator
            .generate_proof("no-such-circuit", &activity_data(), GenerateOptions::default())
            .await,
        Err(ProverError::CircuitNotFound(_))
    ));
}

#[tokio::test]
async fn test_pre_cancelled_request_releases_permit() {
    let generator = Arc::new(stack());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = generator
        .generate_proof(
            "activity-history",
            &activity_data(),
            GenerateOptions {
                cancel: Some(cancel),
                ..GenerateOptions::default()
            },
        )
        .await;
    assert!(matches!(result, Err(ProverError::Cancelled { .. })));

    // The permit is free again: a follow-up request completes.
    let proof = generator
        .generate_proof("activity-history", &activity_data(), GenerateOptions::default())
        .await
        .unwrap();
    assert_eq!(proof.status, ProofStatus::Verified);
}

#[tokio::test]
async fn test_concurrent_requests_prove_in_request_order() {
    let backend = Arc::new(MockBackend::new().with_delay(Duration::from_millis(50)));
    let generator = Arc::new(stack_with(backend, ArtifactDigests::default()));
    let (order_tx, mut order_rx) = mpsc::unbounded_channel();

    let mut handles = Vec::new();
    for i in 0..3u32 {
        let generator = Arc::clone(&generator);
        let order_tx = order_tx.clone();
        handles.push(tokio::spawn(async move {
            generator
                .generate_proof("activity-history", &activity_data(), GenerateOptions::default())
                .await
                .unwrap();
            order_tx.send(i).ok();
        }));
        // Let request i reach the semaphore before request i+1 starts.
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(order_rx.recv().await, Some(0));
    assert_eq!(order_rx.recv().await, Some(1));
    assert_eq!(order_rx.recv().await, Some(2));
}

#[tokio::test]
async fn test_progress_phases_in_order() {
    let generator = stack();
    let (tx, mut rx) = mpsc::unbounded_channel();
    generator
        .generate_proof(
            "activity-history",
            &activity_data(),
            GenerateOptions {
                progress: Some(tx),
                ..GenerateOptions::default()
            },
        )
        .await
        .unwrap();

    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    assert!(!updates.is_empty());
    // Phases never move backwards and the run ends complete.
    for pair in updates.windows(2) {
        assert!(pair[0].phase <= pair[1].phase, "{pair:?}");
    }
    let last = updates.last().unwrap();
    assert_eq!(last.phase, ProofPhase::Complete);
    assert_eq!(last.percent, 100);

    let phases: Vec<ProofPhase> = updates.iter().map(|u| u.phase).collect();
    assert!(phases.contains(&ProofPhase::Validating));
    assert!(phases.contains(&ProofPhase::LoadingArtifacts));
    assert!(phases.contains(&ProofPhase::Proving));
    assert!(phases.contains(&ProofPhase::Verifying));
}

#[tokio::test]
async fn test_artifacts_cached_after_first_run() {
    let generator = stack();
    assert!(!generator.artifact_loader().is_cached("activity-history"));
    generator
        .generate_proof("activity-history", &activity_data(), GenerateOptions::default())
        .await
        .unwrap();
    assert!(generator.artifact_loader().is_cached("activity-history"));
}
