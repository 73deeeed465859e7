//! # FIFO Concurrency Semaphore
//!
//! A counting semaphore with strict arrival-order granting. Proof
//! generation holds a permit for its whole lifetime, so with the default
//! single permit the proving order equals the request order.
//!
//! ## Design
//!
//! - Release hands the permit *directly* to the oldest waiter through its
//!   oneshot channel; the free count only grows when the queue is empty.
//!   A freed permit can never be barged by a later arrival.
//! - A waiter that gave up (dropped its `acquire` future) has a dead
//!   channel; release skips it and tries the next. If the hand-off wins
//!   the race but the receiver is dropped before reading, the in-flight
//!   [`Permit`] drops and re-releases itself.
//! - [`Permit::release`] is idempotent and dropping an unreleased permit
//!   releases it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tracing::debug;

struct State {
    free: usize,
    waiters: VecDeque<oneshot::Sender<Permit>>,
}

struct Inner {
    state: Mutex<State>,
}

impl Inner {
    // Invariant: free > 0 implies waiters is empty.
    fn release(self: &Arc<Self>) {
        let mut state = self.lock();
        loop {
            match state.waiters.pop_front() {
                Some(tx) => {
                    let permit = Permit {
                        inner: Some(Arc::clone(self)),
                    };
                    match tx.send(permit) {
                        Ok(()) => return,
                        Err(mut dead) => {
                            // Waiter abandoned the queue. Defuse the
                            // undelivered permit so its Drop does not
                            // re-enter this lock, and try the next.
                            dead.inner = None;
                        }
                    }
                }
                None => {
                    state.free += 1;
                    return;
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A held slot. Dropping it releases; [`Permit::release`] releases
/// eagerly and is a no-op the second time.
pub struct Permit {
    inner: Option<Arc<Inner>>,
}

impl Permit {
    pub fn release(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.release();
        }
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Permit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Permit")
            .field("released", &self.inner.is_none())
            .finish()
    }
}

/// Counting semaphore granting permits in strict arrival order.
#[derive(Clone)]
pub struct FifoSemaphore {
    inner: Arc<Inner>,
}

impl FifoSemaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    free: permits,
                    waiters: VecDeque::new(),
                }),
            }),
        }
    }

    /// Wait for a permit. Arrival order is grant order.
    pub async fn acquire(&self) -> Permit {
        let rx = {
            let mut state = self.inner.lock();
            if state.free > 0 {
                state.free -= 1;
                return Permit {
                    inner: Some(Arc::clone(&self.inner)),
                };
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            debug!(queue_depth = state.waiters.len(), "waiting for proving permit");
            rx
        };
        match rx.await {
            Ok(permit) => permit,
            // The sender lives in the shared queue, which outlives this
            // borrow of the semaphore.
            Err(_) => unreachable!("semaphore dropped with waiter pending"),
        }
    }

    /// Take a permit only if one is free right now.
    pub fn try_acquire(&self) -> Option<Permit> {
        let mut state = self.inner.lock();
        if state.free > 0 {
            state.free -= 1;
            Some(Permit {
                inner: Some(Arc::clone(&self.inner)),
            })
        } else {
            None
        }
    }

    /// Currently free permits (waiters pending means zero).
    pub fn available(&self) -> usize {
        self.inner.lock().free
    }
}

impl std::fmt::Debug for FifoSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("FifoSemaphore")
            .field("free", &state.free)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_immediate_grant_and_try_acquire() {
        let sem = FifoSemaphore::new(1);
        let permit = sem.try_acquire();
        assert!(permit.is_some());
        assert!(sem.try_acquire().is_none());
        drop(permit);
        assert_eq!(sem.available(), 1);
        assert!(sem.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let sem = FifoSemaphore::new(1);
        let mut permit = sem.acquire().await;
        permit.release();
        assert_eq!(sem.available(), 1);
        permit.release();
        assert_eq!(sem.available(), 1);
        drop(permit);
        assert_eq!(sem.available(), 1);
    }

    #[tokio::test]
    async fn test_waiters_served_in_arrival_order() {
        let sem = FifoSemaphore::new(1);
        let first = sem.acquire().await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut handles = Vec::new();
        for i in 0..3u32 {
            let sem = sem.clone();
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                let mut permit = sem.acquire().await;
                tx.send(i).ok();
                permit.release();
            }));
            // Let this waiter enqueue before spawning the next.
            tokio::task::yield_now().await;
        }

        drop(first);
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(rx.recv().await, Some(0));
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
    }

    #[tokio::test]
    async fn test_abandoned_waiter_skipped() {
        let sem = FifoSemaphore::new(1);
        let first = sem.acquire().await;

        // Enqueue a waiter, then abandon it.
        let abandoned = {
            let sem = sem.clone();
            tokio::spawn(async move {
                let _permit = sem.acquire().await;
            })
        };
        tokio::task::yield_now().await;
        abandoned.abort();
        let _ = abandoned.await;

        // A live waiter behind the abandoned one still gets the permit.
        let live = {
            let sem = sem.clone();
            tokio::spawn(async move { sem.acquire().await })
        };
        tokio::task::yield_now().await;

        drop(first);
        let permit = live.await.unwrap();
        drop(permit);
        assert_eq!(sem.available(), 1);
    }

    #[tokio::test]
    async fn test_free_count_only_grows_when_queue_empty() {
        let sem = FifoSemaphore::new(2);
        let a = sem.acquire().await;
        let b = sem.acquire().await;
        assert_eq!(sem.available(), 0);
        drop(a);
        assert_eq!(sem.available(), 1);
        drop(b);
        assert_eq!(sem.available(), 2);
    }
}
