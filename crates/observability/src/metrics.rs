//! Prometheus metrics
//!
//! The exporter is optional; without it the `metrics` macros record into a
//! no-op recorder, so `SamplerMetrics` is always safe to use.

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Initialize the Prometheus metrics exporter
///
/// Starts an HTTP listener on `port` that serves `/metrics`.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Metrics for one sampling run
///
/// # Metrics
///
/// * `sampler_ticks_total` - Completed ticks
/// * `sampler_tick_duration_seconds` - Time spent evaluating a tick
/// * `sampler_estimates_total{method}` - Available estimates by method tier
/// * `sampler_unavailable_total{reason}` - Unavailable estimates by reason
/// * `sampler_feed_updates_total` - Ticker notifications applied to the store
/// * `sampler_tracked_targets` - Resolved (strike, side) targets
#[derive(Clone)]
pub struct SamplerMetrics {
    ticks_total: Counter,
    tick_duration: Histogram,
    feed_updates: Counter,
    tracked_targets: Gauge,
    run_label: String,
}

impl SamplerMetrics {
    /// Create metrics labelled with the run's expiry code
    pub fn new(expiry: &str) -> Self {
        let label = expiry.to_string();

        Self {
            ticks_total: counter!("sampler_ticks_total", "expiry" => label.clone()),
            tick_duration: histogram!("sampler_tick_duration_seconds", "expiry" => label.clone()),
            feed_updates: counter!("sampler_feed_updates_total", "expiry" => label.clone()),
            tracked_targets: gauge!("sampler_tracked_targets", "expiry" => label.clone()),
            run_label: label,
        }
    }

    pub fn record_tick(&self, duration: Duration) {
        self.ticks_total.increment(1);
        self.tick_duration.record(duration.as_secs_f64());
    }

    pub fn record_estimate(&self, method: &'static str) {
        counter!("sampler_estimates_total", "expiry" => self.run_label.clone(), "method" => method)
            .increment(1);
    }

    pub fn record_unavailable(&self, reason: &'static str) {
        counter!(
            "sampler_unavailable_total",
            "expiry" => self.run_label.clone(),
            "reason" => reason
        )
        .increment(1);
    }

    pub fn record_feed_update(&self) {
        self.feed_updates.increment(1);
    }

    pub fn set_tracked_targets(&self, count: usize) {
        self.tracked_targets.set(count as f64);
    }

    pub fn run_label(&self) -> &str {
        &self.run_label
    }
}
