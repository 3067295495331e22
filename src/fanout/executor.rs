// ABOUTME: FanOutExecutor - runs a batch with one worker per task and joins all.
// ABOUTME: Supports fail-fast and collect-all result policies.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::Instrument;

use super::{FanOutBatch, FanOutOutcome, FanOutReport};
use crate::config::FanOutConfig;
use crate::error::{FanOutError, TaskError};

/// How a batch's outcomes are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOutPolicy {
    /// Surface the first failure, but only after every task has finished.
    FailFast,
    /// Return every outcome keyed by target.
    CollectAll,
}

/// Bounded-parallelism runner for independent per-device operations.
///
/// Each task in a batch is spawned as its own worker and every worker is
/// joined before the executor returns. Nothing is cancelled and no deadline
/// is imposed, so one hung task holds up the whole batch.
#[derive(Debug, Clone)]
pub struct FanOutExecutor {
    max_batch_size: usize,
    spawned: Arc<AtomicUsize>,
}

impl Default for FanOutExecutor {
    fn default() -> Self {
        Self::new(&FanOutConfig::default())
    }
}

impl FanOutExecutor {
    pub fn new(config: &FanOutConfig) -> Self {
        Self {
            max_batch_size: config.max_batch_size,
            spawned: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Total workers spawned by this executor and its clones.
    pub fn spawned_workers(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    /// Run every task and return all outcomes.
    ///
    /// Only fails when the batch is rejected before anything is spawned.
    pub async fn collect_all<T>(&self, batch: FanOutBatch<T>) -> Result<FanOutReport<T>, FanOutError>
    where
        T: Send + 'static,
    {
        self.check_size(&batch)?;
        Ok(self.drain(batch).await)
    }

    /// Run every task and return their values, or the first failure in
    /// submission order once all tasks have finished.
    pub async fn fail_fast<T>(&self, batch: FanOutBatch<T>) -> Result<Vec<(String, T)>, FanOutError>
    where
        T: Send + 'static,
    {
        self.check_size(&batch)?;
        Ok(self.drain(batch).await.into_values()?)
    }

    /// Run a batch under `policy`. Under fail-fast a returned report holds
    /// only successes.
    pub async fn run<T>(
        &self,
        batch: FanOutBatch<T>,
        policy: FanOutPolicy,
    ) -> Result<FanOutReport<T>, FanOutError>
    where
        T: Send + 'static,
    {
        let report = self.collect_all(batch).await?;
        match policy {
            FanOutPolicy::CollectAll => Ok(report),
            FanOutPolicy::FailFast => {
                let outcomes = report
                    .into_values()?
                    .into_iter()
                    .map(|(target, value)| FanOutOutcome {
                        target,
                        result: Ok(value),
                    })
                    .collect();
                Ok(FanOutReport::new(outcomes))
            }
        }
    }

    fn check_size<T>(&self, batch: &FanOutBatch<T>) -> Result<(), FanOutError> {
        if batch.len() > self.max_batch_size {
            return Err(FanOutError::BatchTooLarge {
                size: batch.len(),
                limit: self.max_batch_size,
            });
        }
        Ok(())
    }

    async fn drain<T>(&self, batch: FanOutBatch<T>) -> FanOutReport<T>
    where
        T: Send + 'static,
    {
        if batch.is_empty() {
            return FanOutReport::default();
        }

        tracing::debug!(workers = batch.len(), targets = ?batch.targets(), "dispatching fan-out batch");

        let (targets, handles): (Vec<_>, Vec<_>) = batch
            .tasks
            .into_iter()
            .map(|task| {
                self.spawned.fetch_add(1, Ordering::SeqCst);
                let span = tracing::debug_span!("fanout_task", device = %task.target);
                let handle = tokio::spawn(task.future.instrument(span));
                (task.target, handle)
            })
            .unzip();

        let joined = futures::future::join_all(handles).await;

        let outcomes = targets
            .into_iter()
            .zip(joined)
            .map(|(target, joined)| {
                let result = match joined {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(source)) => Err(TaskError {
                        target: target.clone(),
                        source,
                    }),
                    Err(join_err) => Err(TaskError {
                        target: target.clone(),
                        source: anyhow::anyhow!("task did not complete: {}", join_err),
                    }),
                };
                if let Err(e) = &result {
                    tracing::warn!(device = %e.target, error = %e.source, "fan-out task failed");
                }
                FanOutOutcome { target, result }
            })
            .collect();

        FanOutReport::new(outcomes)
    }
}
