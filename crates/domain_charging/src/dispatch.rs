//! CDR dispatch
//!
//! Hands finished batches to the settlement system without making the
//! charging caller wait. `QueuedDispatcher::dispatch` pushes onto a bounded
//! queue; a background worker drains the queue and runs deliveries with
//! bounded concurrency. A batch the queue cannot take is parked before
//! `dispatch` returns, so it survives the runtime shutting down.
//!
//! # Delivery
//!
//! Each attempt is cut off after `RetryPolicy::attempt_timeout_ms`. Transient
//! failures (connection, timeout, rate limit, unavailable) are retried with
//! exponential backoff up to `RetryPolicy::max_attempts`. Anything else is a
//! rejection and is not retried. Batches that are rejected, run out of
//! attempts, or find the queue full or closed are parked in the dead-letter
//! store with their correlation numbers intact.
//!
//! Every batch ends in exactly one [`DispatchOutcome`], published on a
//! broadcast channel and logged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, oneshot, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use core_kernel::{BatchId, PortError};

use crate::cdr::CdrBatch;
use crate::dead_letter::DeadLetterStore;
use crate::error::DispatchError;
use crate::settlement::SettlementPort;

/// Hand-off of finished batches
///
/// Implementations must never wait on the settlement system or report
/// delivery failures to the caller. Returning means the batch is owned by
/// the dispatcher: queued for delivery or durably parked.
#[async_trait]
pub trait CdrDispatcher: Send + Sync {
    async fn dispatch(&self, batch: CdrBatch);
}

/// Retry behavior for settlement delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts per batch, the first one included
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on every further attempt
    pub base_delay_ms: u64,
    /// Upper bound for any single delay
    pub max_delay_ms: u64,
    /// Time allowed for one settlement call
    pub attempt_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            attempt_timeout_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    fn attempt_limit(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Queue and worker sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Batches that can wait for a worker before new ones are parked
    pub queue_capacity: usize,
    /// Deliveries allowed in flight at once
    pub max_concurrent_deliveries: usize,
    /// Outcomes buffered per subscriber before slow subscribers lag
    pub outcome_buffer: usize,
    pub retry: RetryPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            max_concurrent_deliveries: 8,
            outcome_buffer: 256,
            retry: RetryPolicy::default(),
        }
    }
}

/// Final state of one dispatched batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The settlement system accepted the batch
    Delivered { batch_id: BatchId, attempts: u32 },
    /// The batch was parked in the dead-letter store
    DeadLettered {
        batch_id: BatchId,
        attempts: u32,
        reason: String,
    },
    /// Parking failed too; the batch only survives in the logs
    Dropped { batch_id: BatchId, reason: String },
}

impl DispatchOutcome {
    pub fn batch_id(&self) -> BatchId {
        match self {
            DispatchOutcome::Delivered { batch_id, .. }
            | DispatchOutcome::DeadLettered { batch_id, .. }
            | DispatchOutcome::Dropped { batch_id, .. } => *batch_id,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered { .. })
    }
}

/// Dispatcher backed by a bounded queue and a background worker
///
/// ```rust,ignore
/// let (dispatcher, handle) = QueuedDispatcher::spawn(
///     DispatcherConfig::default(),
///     Arc::new(RevenueSharingAdapter::new(settlement_config)?),
///     Arc::new(InMemoryDeadLetterStore::new()),
/// );
/// let dispatcher = Arc::new(dispatcher);
///
/// // ... hand `dispatcher` to every CdrManager ...
///
/// handle.shutdown().await;
/// ```
pub struct QueuedDispatcher {
    queue: mpsc::Sender<CdrBatch>,
    capacity: usize,
    delivery: Arc<Delivery>,
}

/// Controls the lifetime of a dispatcher's worker
///
/// Dropping the handle without calling [`DispatchHandle::shutdown`] also
/// closes the queue; batches already queued are still delivered in the
/// background.
pub struct DispatchHandle {
    shutdown: oneshot::Sender<()>,
    worker: JoinHandle<()>,
}

impl DispatchHandle {
    /// Closes the queue and waits until every queued and in-flight batch
    /// has reached its outcome
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.worker.await {
            error!(error = %e, "Dispatch worker terminated abnormally");
        }
    }
}

impl QueuedDispatcher {
    /// Starts the worker on the current Tokio runtime
    pub fn spawn(
        config: DispatcherConfig,
        settlement: Arc<dyn SettlementPort>,
        dead_letters: Arc<dyn DeadLetterStore>,
    ) -> (Self, DispatchHandle) {
        let capacity = config.queue_capacity.max(1);
        let (queue, rx) = mpsc::channel(capacity);
        let (outcomes, _) = broadcast::channel(config.outcome_buffer.max(1));
        let (shutdown, shutdown_rx) = oneshot::channel();

        let delivery = Arc::new(Delivery {
            settlement,
            dead_letters,
            retry: config.retry,
            outcomes,
        });

        let worker = Worker {
            rx,
            delivery: Arc::clone(&delivery),
            permits: Arc::new(Semaphore::new(config.max_concurrent_deliveries.max(1))),
        };
        let worker = tokio::spawn(worker.run(shutdown_rx));

        info!(
            queue_capacity = capacity,
            max_concurrent = config.max_concurrent_deliveries,
            "CDR dispatcher started"
        );

        (
            Self {
                queue,
                capacity,
                delivery,
            },
            DispatchHandle { shutdown, worker },
        )
    }

    /// Receives the outcome of every batch dispatched after this call
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchOutcome> {
        self.delivery.outcomes.subscribe()
    }

    /// Parks a batch that never reached the queue
    async fn park_unqueued(&self, batch: CdrBatch, reason: DispatchError) {
        warn!(
            batch_id = %batch.id(),
            records = batch.len(),
            reason = %reason,
            "Batch not queued, parking it"
        );
        self.delivery.park(batch, reason).await;
    }
}

#[async_trait]
impl CdrDispatcher for QueuedDispatcher {
    async fn dispatch(&self, batch: CdrBatch) {
        match self.queue.try_send(batch) {
            Ok(()) => debug!("Batch queued for settlement"),
            Err(TrySendError::Full(batch)) => {
                let reason = DispatchError::QueueFull {
                    capacity: self.capacity,
                };
                self.park_unqueued(batch, reason).await
            }
            Err(TrySendError::Closed(batch)) => {
                self.park_unqueued(batch, DispatchError::QueueClosed).await
            }
        }
    }
}

struct Worker {
    rx: mpsc::Receiver<CdrBatch>,
    delivery: Arc<Delivery>,
    permits: Arc<Semaphore>,
}

impl Worker {
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let mut in_flight = JoinSet::new();
        let mut draining = false;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown, if !draining => {
                    info!("CDR dispatcher draining");
                    self.rx.close();
                    draining = true;
                }

                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Delivery task failed");
                    }
                }

                batch = self.rx.recv() => {
                    let Some(batch) = batch else {
                        break;
                    };

                    let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                        break;
                    };
                    let delivery = Arc::clone(&self.delivery);
                    in_flight.spawn(async move {
                        let _permit = permit;
                        delivery.deliver(batch).await;
                    });
                }
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Delivery task failed");
            }
        }
        info!("CDR dispatcher stopped");
    }
}

struct Delivery {
    settlement: Arc<dyn SettlementPort>,
    dead_letters: Arc<dyn DeadLetterStore>,
    retry: RetryPolicy,
    outcomes: broadcast::Sender<DispatchOutcome>,
}

impl Delivery {
    #[instrument(skip_all, fields(batch_id = %batch.id(), records = batch.len()))]
    async fn deliver(&self, batch: CdrBatch) {
        match self.submit_with_retry(&batch).await {
            Ok(attempts) => {
                info!(attempts, "Batch delivered to settlement");
                self.publish(DispatchOutcome::Delivered {
                    batch_id: batch.id(),
                    attempts,
                });
            }
            Err(e) => {
                error!(error = %e, attempts = e.attempts(), "Batch delivery failed");
                self.park(batch, e).await;
            }
        }
    }

    async fn submit_with_retry(&self, batch: &CdrBatch) -> Result<u32, DispatchError> {
        let limit = self.retry.attempt_limit();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = match tokio::time::timeout(
                self.retry.attempt_timeout(),
                self.settlement.submit(batch),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(PortError::Timeout {
                    operation: "submit_batch".to_string(),
                    duration_ms: self.retry.attempt_timeout_ms,
                }),
            };

            let error = match result {
                Ok(()) => return Ok(attempt),
                Err(e) if !e.is_transient() => {
                    return Err(DispatchError::Rejected {
                        attempts: attempt,
                        source: e,
                    })
                }
                Err(e) if attempt >= limit => {
                    return Err(DispatchError::RetriesExhausted {
                        attempts: attempt,
                        last_error: e,
                    })
                }
                Err(e) => e,
            };

            let mut delay = self.retry.delay_for(attempt);
            if let PortError::RateLimited { retry_after_secs } = &error {
                let requested = Duration::from_secs(*retry_after_secs)
                    .min(Duration::from_millis(self.retry.max_delay_ms));
                delay = delay.max(requested);
            }

            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Settlement attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn park(&self, batch: CdrBatch, reason: DispatchError) {
        let batch_id = batch.id();
        let attempts = reason.attempts();
        let correlation_range = batch.correlation_range();
        let reason = reason.to_string();

        let outcome = match self.dead_letters.park(batch, reason.clone(), attempts).await {
            Ok(()) => {
                info!(batch_id = %batch_id, attempts, "Batch parked in dead-letter store");
                DispatchOutcome::DeadLettered {
                    batch_id,
                    attempts,
                    reason,
                }
            }
            Err(e) => {
                error!(
                    batch_id = %batch_id,
                    correlation_range = ?correlation_range,
                    error = %e,
                    reason = %reason,
                    "Failed to park batch, records dropped"
                );
                DispatchOutcome::Dropped {
                    batch_id,
                    reason: format!("{}; parking failed: {}", reason, e),
                }
            }
        };
        self.publish(outcome);
    }

    fn publish(&self, outcome: DispatchOutcome) {
        // No subscribers is fine
        let _ = self.outcomes.send(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
            attempt_timeout_ms: 50,
        };

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
        assert_eq!(policy.delay_for(5), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(64), Duration::from_millis(1_000));
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(policy.attempt_limit(), 1);
    }

    #[test]
    fn test_config_defaults() {
        let config = DispatcherConfig::default();
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.retry.max_attempts, 5);
    }
}
