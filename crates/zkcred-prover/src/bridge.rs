//! # Execution Bridge — Isolated Proving With Inline Fallback
//!
//! Proving and verification are CPU-bound, so they normally run on the
//! blocking thread pool (`tokio::task::spawn_blocking`). When the
//! isolated run fails for infrastructure reasons (the task panics, is
//! torn down, or exceeds its deadline) the bridge re-runs the call inline
//! on the caller's task and flips a one-way `Healthy -> Degraded` state.
//! Degraded persists for the process lifetime and skips the isolated
//! context entirely.
//!
//! ## Design
//!
//! - Deadline = `max(3 x estimated_proving_time_ms, timeout floor)`.
//!   The floor defaults to three minutes.
//! - A backend *proving* error is a real failure and propagates; only
//!   infrastructure faults trigger fallback.
//! - Cancellation is checked before dispatch and raced against the
//!   isolated run. It produces a distinct error and never triggers
//!   fallback. A blocking task cannot be killed, so an abandoned run is
//!   told to stop and then awaited; the bridge never leaves a backend
//!   call computing behind a request that has already returned, and the
//!   inline fallback never overlaps an isolated run.
//! - `run_full_prove` emits synthetic progress: linear in
//!   elapsed/estimate, capped at 90 until the backend returns, then 100.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::artifacts::LoadedArtifacts;
use crate::backend::{ProveOutput, ProvingBackend};
use crate::error::ProverError;
use crate::progress::{emit, ProofPhase, ProgressSender};
use zkcred_circuits::CircuitSignals;

/// Bridge health. Degraded is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeHealth {
    Healthy,
    Degraded,
}

/// Runs backend calls in an isolated context when it can.
pub struct ExecutionBridge {
    backend: Arc<dyn ProvingBackend>,
    health: Mutex<BridgeHealth>,
    timeout_floor: Duration,
}

impl ExecutionBridge {
    pub fn new(backend: Arc<dyn ProvingBackend>, timeout_floor_ms: u64) -> Self {
        Self {
            backend,
            health: Mutex::new(BridgeHealth::Healthy),
            timeout_floor: Duration::from_millis(timeout_floor_ms),
        }
    }

    pub fn health(&self) -> BridgeHealth {
        *self.health.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn backend(&self) -> &Arc<dyn ProvingBackend> {
        &self.backend
    }

    fn deadline(&self, estimate_ms: u64) -> Duration {
        Duration::from_millis(estimate_ms.saturating_mul(3)).max(self.timeout_floor)
    }

    fn degrade(&self, reason: &str) {
        let mut health = self.health.lock().unwrap_or_else(|e| e.into_inner());
        if *health == BridgeHealth::Healthy {
            *health = BridgeHealth::Degraded;
            warn!(reason, "isolated proving context degraded; running inline from now on");
        }
    }

    /// Generate a proof, with synthetic progress and cancellation.
    pub async fn run_full_prove(
        &self,
        circuit_id: &str,
        artifacts: Arc<LoadedArtifacts>,
        signals: CircuitSignals,
        estimate_ms: u64,
        progress: &Option<ProgressSender>,
        cancel: &CancellationToken,
    ) -> Result<ProveOutput, ProverError> {
        if cancel.is_cancelled() {
            return Err(ProverError::Cancelled {
                circuit_id: circuit_id.to_string(),
            });
        }

        let ticker = spawn_progress_ticker(progress.clone(), estimate_ms);
        let backend = Arc::clone(&self.backend);
        let result = self
            .dispatch(circuit_id, cancel, estimate_ms, move || {
                backend.full_prove(
                    &artifacts.witness_generator,
                    &artifacts.proving_key,
                    &signals,
                )
            })
            .await;
        ticker.abort();

        match result {
            Ok(output) => {
                emit(progress, ProofPhase::Proving, 100);
                Ok(output)
            }
            Err(e) => Err(e),
        }
    }

    /// Verify a proof under the same isolation and deadline policy.
    pub async fn run_verify(
        &self,
        circuit_id: &str,
        verification_key: serde_json::Value,
        proof: crate::backend::Groth16Proof,
        public_signals: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<bool, ProverError> {
        if cancel.is_cancelled() {
            return Err(ProverError::Cancelled {
                circuit_id: circuit_id.to_string(),
            });
        }
        let backend = Arc::clone(&self.backend);
        self.dispatch(circuit_id, cancel, 0, move || {
            backend.verify(&verification_key, &proof, &public_signals)
        })
        .await
    }

    /// Run `call` isolated if healthy, inline otherwise. Infrastructure
    /// faults degrade and fall back to one inline attempt.
    async fn dispatch<T, F>(
        &self,
        circuit_id: &str,
        cancel: &CancellationToken,
        estimate_ms: u64,
        call: F,
    ) -> Result<T, ProverError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, crate::backend::BackendError> + Clone + Send + 'static,
    {
        if self.health() == BridgeHealth::Healthy {
            // The worker checks this token once before touching the
            // backend, so a run abandoned below never starts computing
            // after this request has moved on.
            let work = cancel.child_token();
            let worker = {
                let work = work.clone();
                let call = call.clone();
                move || {
                    if work.is_cancelled() {
                        return Err(crate::backend::BackendError(
                            "run abandoned before start".to_string(),
                        ));
                    }
                    call()
                }
            };
            let mut handle = tokio::task::spawn_blocking(worker);
            let deadline = self.deadline(estimate_ms);
            tokio::select! {
                joined = &mut handle => match joined {
                    Ok(Ok(value)) => return Ok(value),
                    Ok(Err(e)) => {
                        return Err(ProverError::Generation {
                            circuit_id: circuit_id.to_string(),
                            message: e.to_string(),
                        })
                    }
                    Err(join_err) => {
                        self.degrade(&format!("isolated task failed: {join_err}"));
                    }
                },
                _ = cancel.cancelled() => {
                    // The child token is already cancelled; drain the
                    // worker before returning so no backend call outlives
                    // the request that started it.
                    let _ = handle.await;
                    return Err(ProverError::Cancelled {
                        circuit_id: circuit_id.to_string(),
                    })
                }
                _ = tokio::time::sleep(deadline) => {
                    work.cancel();
                    let _ = handle.await;
                    self.degrade(&format!(
                        "isolated task exceeded deadline of {deadline:?}"
                    ));
                }
            }
        }

        // Inline path: Degraded from the start, or isolated run fell over.
        if cancel.is_cancelled() {
            return Err(ProverError::Cancelled {
                circuit_id: circuit_id.to_string(),
            });
        }
        debug!(circuit_id, "running backend call inline");
        call().map_err(|e| ProverError::Generation {
            circuit_id: circuit_id.to_string(),
            message: e.to_string(),
        })
    }
}

fn spawn_progress_ticker(
    progress: Option<ProgressSender>,
    estimate_ms: u64,
) -> tokio::task::JoinHandle<()> {
    let estimate = estimate_ms.max(1);
    tokio::spawn(async move {
        let started = Instant::now();
        let mut interval = tokio::time::interval(Duration::from_millis(250));
        loop {
            interval.tick().await;
            let elapsed = started.elapsed().as_millis() as u64;
            let percent = ((elapsed * 90) / estimate).min(90) as u8;
            emit(&progress, ProofPhase::Proving, percent);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, Groth16Proof, MockBackend};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::mpsc;
    use zkcred_circuits::SignalValue;

    fn artifacts() -> Arc<LoadedArtifacts> {
        Arc::new(LoadedArtifacts {
            witness_generator: b"wasm".to_vec(),
            proving_key: b"zkey".to_vec(),
            verification_key: MockBackend::verification_key_for(b"zkey"),
        })
    }

    fn signals() -> CircuitSignals {
        let mut s = CircuitSignals::new();
        s.push("root", SignalValue::Scalar("7".to_string()));
        s
    }

    /// Panics on the first call only; later calls delegate to the mock.
    struct FlakyBackend {
        tripped: AtomicBool,
        inner: MockBackend,
    }

    impl ProvingBackend for FlakyBackend {
        fn full_prove(
            &self,
            wg: &[u8],
            pk: &[u8],
            signals: &CircuitSignals,
        ) -> Result<ProveOutput, BackendError> {
            if !self.tripped.swap(true, Ordering::SeqCst) {
                panic!("simulated isolated-context crash");
            }
            self.inner.full_prove(wg, pk, signals)
        }

        fn verify(
            &self,
            vkey: &serde_json::Value,
            proof: &Groth16Proof,
            public_signals: &[String],
        ) -> Result<bool, BackendError> {
            self.inner.verify(vkey, proof, public_signals)
        }

        fn export_calldata(
            &self,
            proof: &Groth16Proof,
            public_signals: &[String],
        ) -> Result<String, BackendError> {
            self.inner.export_calldata(proof, public_signals)
        }
    }

    #[tokio::test]
    async fn test_healthy_prove_succeeds() {
        let bridge = ExecutionBridge::new(Arc::new(MockBackend::new()), 180_000);
        let out = bridge
            .run_full_prove(
                "activity-history",
                artifacts(),
                signals(),
                1_000,
                &None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(out.public_signals.len(), 2);
        assert_eq!(bridge.health(), BridgeHealth::Healthy);
    }

    #[tokio::test]
    async fn test_backend_error_propagates_without_degrading() {
        let bridge = ExecutionBridge::new(Arc::new(MockBackend::failing()), 180_000);
        let result = bridge
            .run_full_prove(
                "activity-history",
                artifacts(),
                signals(),
                1_000,
                &None,
                &CancellationToken::new(),
            )
            .await;
        match result {
            Err(ProverError::Generation { circuit_id, .. }) => {
                assert_eq!(circuit_id, "activity-history")
            }
            other => panic!("expected Generation, got {other:?}"),
        }
        assert_eq!(bridge.health(), BridgeHealth::Healthy);
    }

    #[tokio::test]
    async fn test_panicking_task_falls_back_inline_and_degrades() {
        let backend = Arc::new(FlakyBackend {
            tripped: AtomicBool::new(false),
            inner: MockBackend::new(),
        });
        let bridge = ExecutionBridge::new(backend, 180_000);
        let out = bridge
            .run_full_prove(
                "activity-history",
                artifacts(),
                signals(),
                1_000,
                &None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(out.public_signals.len(), 2);
        assert_eq!(bridge.health(), BridgeHealth::Degraded);

        // Degraded persists; the next call goes straight inline and works.
        let again = bridge
            .run_full_prove(
                "activity-history",
                artifacts(),
                signals(),
                1_000,
                &None,
                &CancellationToken::new(),
            )
            .await;
        assert!(again.is_ok());
        assert_eq!(bridge.health(), BridgeHealth::Degraded);
    }

    /// Counts concurrent and total `full_prove` runs around a fixed delay.
    struct TrackingBackend {
        inner: MockBackend,
        current: AtomicUsize,
        max_seen: AtomicUsize,
        started: AtomicUsize,
        finished: AtomicUsize,
    }

    impl TrackingBackend {
        fn new(delay: Duration) -> Self {
            Self {
                inner: MockBackend::new().with_delay(delay),
                current: AtomicUsize::new(0),
                max_seen: AtomicUsize::new(0),
                started: AtomicUsize::new(0),
                finished: AtomicUsize::new(0),
            }
        }
    }

    impl ProvingBackend for TrackingBackend {
        fn full_prove(
            &self,
            wg: &[u8],
            pk: &[u8],
            signals: &CircuitSignals,
        ) -> Result<ProveOutput, BackendError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            let result = self.inner.full_prove(wg, pk, signals);
            self.current.fetch_sub(1, Ordering::SeqCst);
            self.finished.fetch_add(1, Ordering::SeqCst);
            result
        }

        fn verify(
            &self,
            vkey: &serde_json::Value,
            proof: &Groth16Proof,
            public_signals: &[String],
        ) -> Result<bool, BackendError> {
            self.inner.verify(vkey, proof, public_signals)
        }

        fn export_calldata(
            &self,
            proof: &Groth16Proof,
            public_signals: &[String],
        ) -> Result<String, BackendError> {
            self.inner.export_calldata(proof, public_signals)
        }
    }

    #[tokio::test]
    async fn test_deadline_fallback_never_overlaps_isolated_run() {
        let backend = Arc::new(TrackingBackend::new(Duration::from_millis(200)));
        // Floor of 50 ms: the isolated run exceeds its deadline, is
        // drained, and only then does the inline attempt start.
        let bridge = ExecutionBridge::new(
            Arc::clone(&backend) as Arc<dyn ProvingBackend>,
            50,
        );
        let out = bridge
            .run_full_prove(
                "activity-history",
                artifacts(),
                signals(),
                1,
                &None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(out.public_signals.len(), 2);
        assert_eq!(bridge.health(), BridgeHealth::Degraded);
        assert_eq!(backend.max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(
            backend.started.load(Ordering::SeqCst),
            backend.finished.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn test_cancellation_leaves_no_run_behind() {
        let backend = Arc::new(TrackingBackend::new(Duration::from_millis(200)));
        let bridge = ExecutionBridge::new(
            Arc::clone(&backend) as Arc<dyn ProvingBackend>,
            180_000,
        );
        let cancel = CancellationToken::new();
        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            })
        };
        let result = bridge
            .run_full_prove("activity-history", artifacts(), signals(), 1_000, &None, &cancel)
            .await;
        canceller.await.unwrap();
        assert!(matches!(result, Err(ProverError::Cancelled { .. })));
        // By the time Cancelled surfaces the backend run has wound down.
        assert_eq!(
            backend.started.load(Ordering::SeqCst),
            backend.finished.load(Ordering::SeqCst)
        );
        assert_eq!(backend.current.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_deadline_exceeded_falls_back_inline() {
        let backend = Arc::new(MockBackend::new().with_delay(Duration::from_millis(300)));
        // Floor of 50 ms, estimate 1 ms: deadline well under the delay.
        let bridge = ExecutionBridge::new(backend, 50);
        let out = bridge
            .run_full_prove(
                "activity-history",
                artifacts(),
                signals(),
                1,
                &None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(out.public_signals.len(), 2);
        assert_eq!(bridge.health(), BridgeHealth::Degraded);
    }

    #[tokio::test]
    async fn test_pre_cancelled_returns_immediately() {
        let bridge = ExecutionBridge::new(Arc::new(MockBackend::new()), 180_000);
        let cancel = CancellationToken::new();
        cancel.cancel();
        match bridge
            .run_full_prove("activity-history", artifacts(), signals(), 1_000, &None, &cancel)
            .await
        {
            Err(ProverError::Cancelled { circuit_id }) => {
                assert_eq!(circuit_id, "activity-history")
            }
            other => panic!("expected Cancelled, got {other:?}"),
        }
        assert_eq!(bridge.health(), BridgeHealth::Healthy);
    }

    #[tokio::test]
    async fn test_mid_flight_cancellation_is_not_fallback() {
        let backend = Arc::new(MockBackend::new().with_delay(Duration::from_millis(300)));
        let bridge = ExecutionBridge::new(backend, 180_000);
        let cancel = CancellationToken::new();
        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            })
        };
        let result = bridge
            .run_full_prove("activity-history", artifacts(), signals(), 1_000, &None, &cancel)
            .await;
        canceller.await.unwrap();
        assert!(matches!(result, Err(ProverError::Cancelled { .. })));
        assert_eq!(bridge.health(), BridgeHealth::Healthy);
    }

    #[tokio::test]
    async fn test_progress_reaches_completion() {
        let bridge = ExecutionBridge::new(Arc::new(MockBackend::new()), 180_000);
        let (tx, mut rx) = mpsc::unbounded_channel();
        bridge
            .run_full_prove(
                "activity-history",
                artifacts(),
                signals(),
                1_000,
                &Some(tx),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        let last = updates.last().unwrap();
        assert_eq!(last.phase, ProofPhase::Proving);
        assert_eq!(last.percent, 100);
        // Synthetic ticks never claim completion on their own.
        for update in &updates[..updates.len() - 1] {
            assert!(update.percent <= 90);
        }
    }

    #[tokio::test]
    async fn test_run_verify_roundtrip() {
        let backend = Arc::new(MockBackend::new());
        let bridge = ExecutionBridge::new(Arc::clone(&backend) as Arc<dyn ProvingBackend>, 180_000);
        let out = backend.full_prove(b"wasm", b"zkey", &signals()).unwrap();
        let ok = bridge
            .run_verify(
                "activity-history",
                MockBackend::verification_key_for(b"zkey"),
                out.proof,
                out.public_signals,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(ok);
    }
}
