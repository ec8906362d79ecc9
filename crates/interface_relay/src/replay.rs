//! Dead-letter replay
//!
//! Resends parked batches to the settlement system exactly as they were
//! built. A delivered batch is flagged in the store; a failed one gets its
//! attempt count and reason updated and stays pending for the next pass.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use domain_charging::{DeadLetterStore, SettlementPort};

use crate::config::ReplayConfig;
use crate::error::RelayError;

/// Counts of one replay pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    /// The pass ended early because the settlement system looked down
    pub interrupted: bool,
}

/// Replays dead-lettered batches through a settlement port
pub struct Relay {
    settlement: Arc<dyn SettlementPort>,
    dead_letters: Arc<dyn DeadLetterStore>,
    config: ReplayConfig,
}

impl Relay {
    pub fn new(
        settlement: Arc<dyn SettlementPort>,
        dead_letters: Arc<dyn DeadLetterStore>,
        config: ReplayConfig,
    ) -> Self {
        Self {
            settlement,
            dead_letters,
            config,
        }
    }

    /// Replays up to `batch_limit` pending batches, oldest first
    ///
    /// A transient failure ends the pass: the remaining batches would meet
    /// the same outage. A rejection only affects its own batch.
    ///
    /// # Errors
    ///
    /// Only dead-letter store failures are returned. Settlement failures
    /// are recorded against the batch.
    #[instrument(skip(self), fields(limit = self.config.batch_limit))]
    pub async fn replay_once(&self) -> Result<ReplaySummary, RelayError> {
        let pending = self.dead_letters.pending(self.config.batch_limit).await?;
        let mut summary = ReplaySummary::default();

        if pending.is_empty() {
            debug!("No dead letters pending");
            return Ok(summary);
        }

        for letter in pending {
            let batch_id = letter.batch.id();
            summary.attempted += 1;

            match self.settlement.submit(&letter.batch).await {
                Ok(()) => {
                    self.dead_letters.mark_delivered(batch_id).await?;
                    summary.delivered += 1;
                    info!(
                        batch_id = %batch_id,
                        records = letter.batch.len(),
                        previous_attempts = letter.attempts,
                        "Dead letter delivered"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(batch_id = %batch_id, error = %e, "Dead letter replay failed");
                    self.dead_letters
                        .record_failure(batch_id, e.to_string())
                        .await?;

                    if e.is_transient() {
                        summary.interrupted = true;
                        break;
                    }
                }
            }
        }

        info!(
            attempted = summary.attempted,
            delivered = summary.delivered,
            failed = summary.failed,
            interrupted = summary.interrupted,
            "Replay pass finished"
        );
        Ok(summary)
    }

    /// Runs replay passes until `shutdown` resolves, or once if configured
    ///
    /// A failed pass is logged and retried on the next interval; in
    /// single-pass mode its error is returned instead.
    pub async fn run<F>(&self, shutdown: F) -> Result<(), RelayError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            match self.replay_once().await {
                Ok(_) => {}
                Err(e) if self.config.run_once => return Err(e),
                Err(e) => error!(error = %e, "Replay pass failed"),
            }

            if self.config.run_once {
                return Ok(());
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Relay stopping");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.interval()) => {}
            }
        }
    }
}
