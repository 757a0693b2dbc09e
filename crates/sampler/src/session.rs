//! One end-to-end sampling run against the exchange.

use chrono::Utc;
use common::ExpiryCode;
use config::{EstimatorKind, SamplerConfig};
use feed::{ticker_channel, DeribitClient};
use instrument::{InstrumentCatalog, ListedInstrument, ResolvedTarget};
use market_data::{Black76Settings, MarkPriceEstimator, MarketSnapshotStore};
use observability::SamplerMetrics;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{error, info};

use crate::error::Result;
use crate::record::{RunReport, RunStatus};
use crate::reporter::ComparisonReporter;
use crate::sampling::{SamplingLoop, Schedule};
use crate::shutdown::ShutdownController;
use crate::sink::ReportSink;

/// The estimator a configuration selects for the whole run.
pub fn estimator_for(config: &SamplerConfig) -> MarkPriceEstimator {
    match config.run.estimator {
        EstimatorKind::FallbackChain => MarkPriceEstimator::FallbackChain,
        EstimatorKind::Black76 => MarkPriceEstimator::Black76(Black76Settings {
            min_time_years: config.pricing.min_time_to_expiry_years,
            quote_in_underlying: config.pricing.quote_in_underlying,
        }),
    }
}

/// Bind every requested strike, both sides, to a listed instrument.
///
/// Fails if the expiry has no listing at all, or none for one side.
pub fn resolve_targets(
    expiry: &ExpiryCode,
    listing: Vec<ListedInstrument>,
    strikes: &[f64],
) -> Result<Vec<ResolvedTarget>> {
    let catalog = InstrumentCatalog::new(expiry.clone(), listing);
    Ok(catalog.resolve_all(strikes)?)
}

/// Ticker channels for the distinct instruments behind `targets`.
pub fn ticker_channels(targets: &[ResolvedTarget], interval: &str) -> Vec<String> {
    targets
        .iter()
        .map(|t| t.instrument_id().as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|name| ticker_channel(name, interval))
        .collect()
}

pub struct SamplerSession {
    config: SamplerConfig,
    metrics: SamplerMetrics,
}

impl SamplerSession {
    pub fn new(config: SamplerConfig) -> Self {
        let metrics = SamplerMetrics::new(&config.run.expiry);
        Self { config, metrics }
    }

    fn idle_timeout(&self) -> Option<Duration> {
        match self.config.exchange.heartbeat_interval_seconds {
            0 => None,
            secs => Some(
                Duration::from_secs(secs * 2) + self.config.exchange.request_timeout(),
            ),
        }
    }

    /// Connect, resolve, subscribe, then sample until the run ends.
    #[tracing::instrument(
        skip_all,
        fields(expiry = %self.config.run.expiry, network = %self.config.exchange.network)
    )]
    pub async fn run(
        self,
        sink: &mut dyn ReportSink,
        shutdown: &ShutdownController,
    ) -> Result<RunReport> {
        let exchange = &self.config.exchange;
        let run_config = &self.config.run;
        let expiry = ExpiryCode::new(run_config.expiry.as_str());

        let mut client =
            DeribitClient::connect(exchange.endpoint_url(), exchange.request_timeout()).await?;
        let listing = client.load_instruments(&exchange.currency, &expiry).await?;

        // Resolution failures end the run before any tick
        let targets = match resolve_targets(&expiry, listing, &run_config.strikes) {
            Ok(targets) => targets,
            Err(e) => {
                client.close().await.ok();
                return Err(e);
            }
        };

        if exchange.heartbeat_interval_seconds > 0 {
            client
                .set_heartbeat(Duration::from_secs(exchange.heartbeat_interval_seconds))
                .await?;
        }
        let channels = ticker_channels(&targets, &exchange.ticker_interval);
        client.subscribe(&channels).await?;
        info!(
            targets = targets.len(),
            channels = channels.len(),
            "Subscribed to ticker channels"
        );

        let store = MarketSnapshotStore::new();
        let feed_token = shutdown.child_token();
        let feed = client.into_feed(self.idle_timeout());
        let feed_task =
            tokio::spawn(feed.run(store.clone(), feed_token.clone(), self.metrics.clone()));

        let estimator = estimator_for(&self.config);
        let testnet = exchange.network.is_testnet();
        let reporter = ComparisonReporter::new(
            targets,
            estimator,
            self.config.pricing.round_decimals,
            testnet,
            self.metrics.clone(),
        );
        let schedule = Schedule::new(run_config.duration(), run_config.interval());
        let sampling = SamplingLoop::new(schedule, reporter, store, self.metrics.clone());

        let report = RunReport {
            expiry: expiry.to_string(),
            testnet,
            estimator: estimator.name().to_string(),
            duration_seconds: run_config.duration_seconds,
            interval_seconds: run_config.interval_seconds,
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
            ticks: Vec::new(),
        };
        let result = sampling.run(sink, shutdown.token(), report).await;

        feed_token.cancel();
        match feed_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Ticker feed failed"),
            Err(e) => error!(error = %e, "Ticker feed task panicked"),
        }

        result
    }
}
