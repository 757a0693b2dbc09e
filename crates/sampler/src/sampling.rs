//! The timed sampling loop.
//!
//! ```text
//! Idle ──start──► Sampling(0) ──tick──► Sampling(1) ── … ──► Finished
//!                      │                                    ▲
//!                      └──── shutdown / feed lost ──────────┘
//! ```
//!
//! Ticks fire every `interval` starting at `start`, and none fires at or
//! past `start + duration`. Cancellation is only observed between ticks.

use chrono::Utc;
use market_data::MarketSnapshotStore;
use observability::SamplerMetrics;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{Result, SamplerError};
use crate::record::{RunReport, RunStatus};
use crate::reporter::ComparisonReporter;
use crate::sink::ReportSink;

/// Run length and sampling period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub duration: Duration,
    pub interval: Duration,
}

impl Schedule {
    pub fn new(duration: Duration, interval: Duration) -> Self {
        Self { duration, interval }
    }

    /// `ceil(duration / interval)`; zero for an empty schedule.
    pub fn tick_count(&self) -> u64 {
        let interval = self.interval.as_millis();
        if interval == 0 {
            return 0;
        }
        self.duration.as_millis().div_ceil(interval) as u64
    }
}

pub struct SamplingLoop {
    schedule: Schedule,
    reporter: ComparisonReporter,
    store: MarketSnapshotStore,
    metrics: SamplerMetrics,
}

impl SamplingLoop {
    pub fn new(
        schedule: Schedule,
        reporter: ComparisonReporter,
        store: MarketSnapshotStore,
        metrics: SamplerMetrics,
    ) -> Self {
        Self {
            schedule,
            reporter,
            store,
            metrics,
        }
    }

    /// Sample until the schedule is exhausted, `shutdown` fires or the feed
    /// is lost. The run report reaches the sink in every case; a feed lost
    /// before the last tick is then returned as the run's error.
    #[tracing::instrument(skip_all, fields(ticks = self.schedule.tick_count()))]
    pub async fn run(
        &self,
        sink: &mut dyn ReportSink,
        shutdown: CancellationToken,
        mut run: RunReport,
    ) -> Result<RunReport> {
        let total = self.schedule.tick_count();
        if total == 0 {
            warn!("Empty schedule, nothing to sample");
            run.finish(RunStatus::Completed);
            sink.finish(&run).await?;
            return Ok(run);
        }

        let start = Instant::now();
        let deadline = start + self.schedule.duration;

        let mut ticker = interval(self.schedule.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            duration_secs = self.schedule.duration.as_secs(),
            interval_secs = self.schedule.interval.as_secs(),
            targets = self.reporter.targets().len(),
            "Sampling started"
        );

        let mut status = RunStatus::Completed;
        for tick in 0..total {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!(tick, "Shutdown requested, stopping sampling");
                    status = RunStatus::Interrupted;
                    break;
                }
                _ = self.store.feed_lost() => {
                    status = RunStatus::FeedLost;
                    break;
                }
                fired = ticker.tick() => {
                    if fired >= deadline {
                        break;
                    }
                    let evaluated = Instant::now();
                    let offset_ms = fired.duration_since(start).as_millis() as u64;
                    let report = self.reporter.evaluate(tick, offset_ms, &self.store, Utc::now());

                    sink.write_tick(&report).await?;
                    self.metrics.record_tick(evaluated.elapsed());
                    info!(tick, offset_ms, "Tick sampled");
                    run.ticks.push(report);
                }
            }
        }

        run.finish(status);
        sink.finish(&run).await?;
        info!(ticks = run.ticks.len(), status = ?status, "Sampling finished");

        // A loss after the last tick does not fail a completed run
        if status == RunStatus::FeedLost {
            if let Err(e) = self.store.ensure_connected() {
                warn!(error = %e, "Run ended by feed loss");
                return Err(SamplerError::from(e));
            }
        }
        Ok(run)
    }
}
