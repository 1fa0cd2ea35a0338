//! Batch processing over a bounded, process-wide worker pool.
//!
//! The pool is created once at process start and injected; it is never
//! rebuilt per call. Its size is one less than the shared backend pool so a
//! unit always stays reserved for coordination. Results come back in input
//! order via index-keyed collection, never append-on-completion.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, warn};

use centime_core::errors::ConfigError;
use centime_core::result::CategorizationResult;
use centime_core::transaction::Transaction;

use crate::engine::CategorizationEngine;

type BoxedJob = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Cooperative batch-level cancellation. Cancelling stops new dispatch;
/// in-flight items finish or hit their own timeout.
#[derive(Debug, Clone, Default)]
pub struct BatchCancellation(Arc<AtomicBool>);

impl BatchCancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Long-lived worker pool. `permits` is the single global bound on
/// concurrent categorizations; both dispatch paths acquire from it, so
/// overlapping batches can never exceed the shared-resource budget.
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
    queue: mpsc::Sender<BoxedJob>,
}

impl WorkerPool {
    /// Size the pool from the shared backend pool (e.g. database
    /// connections): always `shared_pool_size - 1`, reserving one unit.
    pub fn new(shared_pool_size: usize) -> Result<Self, ConfigError> {
        if shared_pool_size < 2 {
            return Err(ConfigError::PoolTooSmall(shared_pool_size));
        }
        let size = shared_pool_size - 1;
        let permits = Arc::new(Semaphore::new(size));
        let (tx, rx) = mpsc::channel::<BoxedJob>(size * 2);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        for worker in 0..size {
            let rx = rx.clone();
            let permits = permits.clone();
            tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = rx.lock().await;
                        rx.recv().await
                    };
                    let Some(job) = job else {
                        debug!(worker, "worker pool queue closed; worker exiting");
                        break;
                    };
                    // Workers respect the same global bound as direct dispatch.
                    let Ok(_permit) = permits.acquire().await else {
                        break;
                    };
                    job.await;
                }
            });
        }

        Ok(Self {
            permits,
            size,
            queue: tx,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    async fn submit(&self, job: BoxedJob) -> bool {
        self.queue.send(job).await.is_ok()
    }
}

/// Fans a batch out across the pool and reassembles ordered results.
pub struct ConcurrentProcessor {
    engine: Arc<CategorizationEngine>,
    pool: Arc<WorkerPool>,
}

impl ConcurrentProcessor {
    pub fn new(engine: Arc<CategorizationEngine>, pool: Arc<WorkerPool>) -> Self {
        Self { engine, pool }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Categorize a batch, results in input order.
    pub async fn categorize_batch(
        &self,
        transactions: Vec<Transaction>,
    ) -> Vec<CategorizationResult> {
        self.categorize_batch_with(transactions, None, &BatchCancellation::new())
            .await
    }

    /// Batch entry point with an optional concurrency override (never
    /// exceeding the pool bound) and a cancellation signal.
    pub async fn categorize_batch_with(
        &self,
        transactions: Vec<Transaction>,
        concurrency: Option<usize>,
        cancel: &BatchCancellation,
    ) -> Vec<CategorizationResult> {
        let total = transactions.len();
        if total == 0 {
            return Vec::new();
        }

        let effective = concurrency
            .map(|n| n.clamp(1, self.pool.size()))
            .unwrap_or(self.pool.size());
        let small_batch = total <= self.engine.config().small_batch_limit;

        let batch_gate = Arc::new(Semaphore::new(effective));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<(usize, CategorizationResult)>();

        let mut results: Vec<Option<CategorizationResult>> = Vec::with_capacity(total);
        results.resize_with(total, || None);
        // Correlation ids by index, so every error path reports the real id.
        let ids: Vec<String> = transactions.iter().map(|t| t.id.clone()).collect();
        let mut dispatched = 0usize;
        let mut cancel_logged = false;

        for (index, txn) in transactions.into_iter().enumerate() {
            if cancel.is_cancelled() {
                if !cancel_logged {
                    warn!(
                        remaining = total - index,
                        "batch cancelled; skipping undispatched items"
                    );
                    cancel_logged = true;
                }
                results[index] = Some(CategorizationResult::error(&txn.id, "batch cancelled"));
                continue;
            }

            let engine = self.engine.clone();
            let gate = batch_gate.clone();
            let tx = result_tx.clone();
            let job: BoxedJob = Box::pin(async move {
                let Ok(_permit) = gate.acquire().await else {
                    let _ = tx.send((index, CategorizationResult::error(&txn.id, "batch gate closed")));
                    return;
                };
                let result = engine.categorize(&txn).await;
                let _ = tx.send((index, result));
            });

            if small_batch {
                // Light-weight direct dispatch, still under the global bound.
                dispatched += 1;
                let permits = self.pool.permits.clone();
                tokio::spawn(async move {
                    let Ok(_permit) = permits.acquire().await else {
                        return;
                    };
                    job.await;
                });
            } else if self.pool.submit(job).await {
                dispatched += 1;
            } else {
                results[index] =
                    Some(CategorizationResult::error(&ids[index], "worker pool shut down"));
            }
        }
        drop(result_tx);

        let mut collected = 0usize;
        while collected < dispatched {
            match result_rx.recv().await {
                Some((index, result)) => {
                    results[index] = Some(result);
                    collected += 1;
                }
                None => break,
            }
        }

        // Index-keyed reassembly: original input order regardless of
        // completion order.
        results
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    CategorizationResult::error(&ids[index], "result never arrived")
                })
            })
            .collect()
    }
}
