//! Status Poller
//!
//! Background worker that lists recent transmissions from the carrier
//! on a fixed cadence and replays each snapshot through the
//! reconciliation engine. A delivery report whose webhook was lost in
//! transit is picked up here on the next sweep.

use std::sync::Arc;

use tokio::time::{Duration, sleep};
use tracing::{debug, error, info, warn};

use crate::carrier::CarrierClient;
use crate::config::PollConfig;
use crate::fax::error::FaxError;

use super::engine::{ReconcileEngine, Reconciled};

/// Counters for one reconciliation sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepStats {
    /// Snapshots returned by the carrier listing
    pub fetched: usize,
    /// Transitions accepted and written
    pub applied: usize,
    /// Replayed webhook event ids acknowledged without reapplying
    pub duplicates: usize,
    /// Records already terminal locally
    pub terminal_skips: usize,
    /// Signals discarded by the rank guard
    pub conflicts: usize,
    /// Records whose store write errored
    pub failures: usize,
}

impl SweepStats {
    pub fn record(&mut self, outcome: Reconciled) {
        match outcome {
            Reconciled::Applied => self.applied += 1,
            Reconciled::Duplicate => self.duplicates += 1,
            Reconciled::AlreadyTerminal => self.terminal_skips += 1,
            Reconciled::Superseded => self.conflicts += 1,
            // Untracked ids are expected when the carrier account is shared
            Reconciled::Unknown => {}
        }
    }
}

impl std::fmt::Display for SweepStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "fetched={}, applied={}, duplicates={}, terminal_skips={}, conflicts={}, failures={}",
            self.fetched,
            self.applied,
            self.duplicates,
            self.terminal_skips,
            self.conflicts,
            self.failures
        )
    }
}

/// Polling worker
///
/// Runs forever, sweeping the carrier's recent-transmission listing at
/// `interval` and pushing every snapshot through the engine.
pub struct StatusPoller {
    carrier: Arc<dyn CarrierClient>,
    engine: ReconcileEngine,
    interval: Duration,
    lookback: chrono::Duration,
    per_record_delay: Duration,
}

impl StatusPoller {
    pub fn new(
        carrier: Arc<dyn CarrierClient>,
        engine: ReconcileEngine,
        config: &PollConfig,
    ) -> Self {
        Self {
            carrier,
            engine,
            interval: Duration::from_secs(config.interval_secs),
            lookback: chrono::Duration::seconds(config.lookback_secs as i64),
            per_record_delay: Duration::from_millis(config.per_record_delay_ms),
        }
    }

    /// Run the sweep loop
    ///
    /// A sweep that fails wholesale (carrier listing unreachable) is
    /// logged and the loop carries on at the next tick.
    pub async fn run(&self) -> ! {
        info!(
            carrier = %self.carrier.kind(),
            interval_secs = self.interval.as_secs(),
            lookback_secs = self.lookback.num_seconds(),
            "Starting status poller"
        );

        loop {
            match self.sweep().await {
                Ok(stats) => info!("Sweep complete: {}", stats),
                Err(e) => error!(error = %e, "Sweep failed"),
            }

            sleep(self.interval).await;
        }
    }

    /// Run a single sweep cycle
    pub async fn sweep(&self) -> Result<SweepStats, FaxError> {
        let snapshots = self.carrier.list_recent(self.lookback).await?;

        if snapshots.is_empty() {
            debug!("No recent transmissions to reconcile");
            return Ok(SweepStats::default());
        }

        let mut stats = SweepStats {
            fetched: snapshots.len(),
            ..Default::default()
        };

        for (i, snapshot) in snapshots.iter().enumerate() {
            match self.engine.apply_polled(snapshot).await {
                Ok(outcome) => stats.record(outcome),
                Err(e) => {
                    warn!(
                        external_id = %snapshot.external_id,
                        raw_status = %snapshot.raw_status,
                        error = %e,
                        "Skipping polled record"
                    );
                    stats.failures += 1;
                }
            }

            if i + 1 < snapshots.len() && !self.per_record_delay.is_zero() {
                sleep(self.per_record_delay).await;
            }
        }

        Ok(stats)
    }
}
