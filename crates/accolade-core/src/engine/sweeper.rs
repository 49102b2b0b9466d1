//! Periodic sweeper for timed-criteria expiry.
//!
//! Uses tokio-cron-scheduler to run the engine's timed sweep at regular
//! intervals and hand pending updates to the snapshot store afterwards.
//! Deadlines are polled on this coarse tick; no per-deadline timers exist.

use std::sync::Arc;

use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{debug, error, warn};

use super::Engine;

/// Configuration for the timed sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Interval between sweeps in seconds (default: 30).
    ///
    /// Keep this at or below the shortest configured timed window divided by
    /// the engine's safety factor so expiry detection stays timely.
    pub interval_secs: u64,
    /// Whether each sweep also flushes pending updates to the snapshot
    /// store (default: true).
    pub flush_after_sweep: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            flush_after_sweep: true,
        }
    }
}

impl SweeperConfig {
    /// Create config with custom interval.
    pub fn with_interval(interval_secs: u64) -> Self {
        Self {
            interval_secs: interval_secs.max(1), // Minimum 1 second
            ..Default::default()
        }
    }

    /// Disable the flush that normally follows each sweep.
    pub fn without_flush(mut self) -> Self {
        self.flush_after_sweep = false;
        self
    }
}

/// Scheduler for periodic timed-expiry sweeps.
///
/// Wraps tokio-cron-scheduler to run [`Engine::sweep_timed`] at regular
/// intervals. The sweep itself is callable directly; tests never need this
/// wrapper.
///
/// # Example
///
/// ```ignore
/// use accolade_core::engine::{Engine, SweeperConfig, TimedSweeper};
/// use std::sync::Arc;
///
/// # async fn example(engine: Arc<Engine>) -> Result<(), Box<dyn std::error::Error>> {
/// let config = SweeperConfig::with_interval(10); // Every 10 seconds
/// let sweeper = TimedSweeper::new(engine, config).await?;
/// sweeper.start().await?;
/// # Ok(())
/// # }
/// ```
pub struct TimedSweeper {
    scheduler: JobScheduler,
    engine: Arc<Engine>,
    config: SweeperConfig,
}

impl TimedSweeper {
    /// Create a new TimedSweeper.
    ///
    /// Note: Call `start()` to begin periodic execution.
    pub async fn new(engine: Arc<Engine>, config: SweeperConfig) -> Result<Self, JobSchedulerError> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            engine,
            config,
        })
    }

    /// Create a sweeper with default configuration (30 second interval).
    pub async fn with_defaults(engine: Arc<Engine>) -> Result<Self, JobSchedulerError> {
        Self::new(engine, SweeperConfig::default()).await
    }

    /// Get the sweeper configuration.
    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Start the sweeper.
    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        if let Some(shortest) = self.engine.defs().shortest_timed_window_secs() {
            let factor = self.engine.config().timed_safety_factor.max(1);
            if self.config.interval_secs > (shortest / factor).max(1) {
                warn!(
                    interval_secs = self.config.interval_secs,
                    shortest_window_secs = shortest,
                    "sweep interval too coarse for the shortest timed window"
                );
            }
        }

        let engine = self.engine.clone();
        let flush_after_sweep = self.config.flush_after_sweep;
        let interval = std::time::Duration::from_secs(self.config.interval_secs);

        let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
            let engine = engine.clone();
            Box::pin(async move {
                let expired = engine.sweep_timed(Utc::now());
                if !expired.is_empty() {
                    debug!(count = expired.len(), "timed sweep produced transitions");
                }

                if flush_after_sweep {
                    if let Err(e) = engine.flush().await {
                        // In-memory state stays authoritative; the store is
                        // expected to catch up on a later flush.
                        error!(error = %e, "flush after sweep failed");
                    }
                }
            })
        })?;

        self.scheduler.add(job).await?;
        self.scheduler.start().await?;
        Ok(())
    }

    /// Stop the sweeper.
    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        self.scheduler.shutdown().await
    }
}
