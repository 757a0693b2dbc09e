//! Turns estimates into comparison records.

use chrono::{DateTime, Utc};
use instrument::ResolvedTarget;
use market_data::{MarkPriceEstimator, MarketSnapshot, MarketSnapshotStore, PriceEstimate};
use observability::SamplerMetrics;
use std::collections::BTreeMap;
use tracing::debug;

use crate::record::{Comparison, SampleRecord, StrikeKey, StrikeRecords, TickReport};

/// Round to `decimals` places; `None` keeps full precision.
pub fn round_price(price: f64, decimals: Option<u32>) -> f64 {
    match decimals {
        Some(decimals) => {
            let scale = 10f64.powi(decimals as i32);
            (price * scale).round() / scale
        }
        None => price,
    }
}

pub struct ComparisonReporter {
    targets: Vec<ResolvedTarget>,
    estimator: MarkPriceEstimator,
    round_decimals: Option<u32>,
    testnet: bool,
    metrics: SamplerMetrics,
}

impl ComparisonReporter {
    pub fn new(
        targets: Vec<ResolvedTarget>,
        estimator: MarkPriceEstimator,
        round_decimals: Option<u32>,
        testnet: bool,
        metrics: SamplerMetrics,
    ) -> Self {
        metrics.set_tracked_targets(targets.len());
        Self {
            targets,
            estimator,
            round_decimals,
            testnet,
            metrics,
        }
    }

    pub fn targets(&self) -> &[ResolvedTarget] {
        &self.targets
    }

    pub fn estimator(&self) -> &MarkPriceEstimator {
        &self.estimator
    }

    /// Build the record for one target from the snapshot seen this tick.
    pub fn record(
        &self,
        target: &ResolvedTarget,
        snapshot: Option<&MarketSnapshot>,
        now: DateTime<Utc>,
    ) -> SampleRecord {
        let estimate = self.estimator.estimate(&target.instrument, snapshot, now);

        let (computed_mark, method, unavailable_reason) = match estimate {
            PriceEstimate::Available { price, method } => {
                self.metrics.record_estimate(method.as_str());
                (Some(round_price(price, self.round_decimals)), Some(method), None)
            }
            PriceEstimate::Unavailable(reason) => {
                self.metrics.record_unavailable(reason.code());
                debug!(
                    instrument = %target.instrument.id,
                    %reason,
                    "No estimate this tick"
                );
                (None, None, Some(reason.to_string()))
            }
        };

        let comparison = if target.is_standard {
            Comparison::Standard {
                instrument: target.instrument.id.clone(),
                exchange_mark: snapshot.and_then(|s| s.fields.exchange_mark_price),
            }
        } else {
            Comparison::Closest {
                closest_instrument: target.instrument.id.clone(),
            }
        };

        SampleRecord {
            computed_mark,
            is_standard: target.is_standard,
            comparison,
            method,
            unavailable_reason,
            testnet: self.testnet,
        }
    }

    /// Evaluate every target against one consistent read of the store.
    pub fn evaluate(
        &self,
        tick: u64,
        offset_ms: u64,
        store: &MarketSnapshotStore,
        now: DateTime<Utc>,
    ) -> TickReport {
        let snapshots = store.read_many(self.targets.iter().map(|t| t.instrument_id()));

        let mut strikes: BTreeMap<StrikeKey, StrikeRecords> = BTreeMap::new();
        for (target, snapshot) in self.targets.iter().zip(snapshots.iter()) {
            let record = self.record(target, snapshot.as_ref(), now);
            strikes
                .entry(StrikeKey::from(target.requested_strike))
                .or_default()
                .set(target.option_type, record);
        }

        TickReport {
            tick,
            timestamp: now.timestamp(),
            offset_ms,
            strikes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use instrument::{InstrumentCatalog, ListedInstrument, OptionType};
    use market_data::{Black76Settings, EstimateMethod, FieldUpdate, MarketFields};

    fn listing() -> Vec<ListedInstrument> {
        let expiry = Utc.with_ymd_and_hms(2025, 6, 27, 8, 0, 0).unwrap();
        [
            "BTC-27JUN25-95000-C",
            "BTC-27JUN25-95000-P",
            "BTC-27JUN25-97000-C",
            "BTC-27JUN25-97000-P",
        ]
        .iter()
        .map(|name| ListedInstrument::from_symbol(name, expiry).unwrap())
        .collect()
    }

    fn reporter(strikes: &[f64], estimator: MarkPriceEstimator) -> ComparisonReporter {
        let catalog = InstrumentCatalog::new("27JUN25".into(), listing());
        let targets = catalog.resolve_all(strikes).unwrap();
        ComparisonReporter::new(
            targets,
            estimator,
            Some(4),
            false,
            SamplerMetrics::new("27JUN25"),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_round_price() {
        assert_eq!(round_price((0.077 + 0.0778) / 2.0, Some(4)), 0.0774);
        assert_eq!(round_price(0.123456, None), 0.123456);
        assert_eq!(round_price(0.12346, Some(2)), 0.12);
    }

    #[test]
    fn test_standard_target_carries_exchange_mark() {
        let reporter = reporter(&[95000.0], MarkPriceEstimator::FallbackChain);
        let store = MarketSnapshotStore::new();
        store.update(FieldUpdate::new(
            "BTC-27JUN25-95000-C",
            MarketFields {
                best_bid: Some(0.077),
                best_ask: Some(0.0778),
                exchange_mark_price: Some(0.0775),
                ..Default::default()
            },
        ));

        let report = reporter.evaluate(0, 0, &store, now());
        let call = report.record(95000.0, OptionType::Call).unwrap();
        assert!(call.is_standard);
        assert_eq!(call.computed_mark, Some(0.0774));
        assert_eq!(call.method, Some(EstimateMethod::MidPrice));
        assert_eq!(call.exchange_mark(), Some(0.0775));

        // Never observed: standard record still carries the null mark
        let put = report.record(95000.0, OptionType::Put).unwrap();
        assert_eq!(put.computed_mark, None);
        assert_eq!(put.unavailable_reason.as_deref(), Some("no market data received"));
        assert!(matches!(put.comparison, Comparison::Standard { exchange_mark: None, .. }));
    }

    #[test]
    fn test_unlisted_strike_reports_closest_instrument() {
        let reporter = reporter(&[96000.0], MarkPriceEstimator::FallbackChain);
        let store = MarketSnapshotStore::new();
        store.update(FieldUpdate::new(
            "BTC-27JUN25-95000-C",
            MarketFields {
                last_price: Some(0.08),
                exchange_mark_price: Some(0.0801),
                ..Default::default()
            },
        ));

        let report = reporter.evaluate(3, 15_000, &store, now());
        let call = report.record(96000.0, OptionType::Call).unwrap();
        assert!(!call.is_standard);
        assert_eq!(call.instrument().as_str(), "BTC-27JUN25-95000-C");
        assert_eq!(call.computed_mark, Some(0.08));
        assert_eq!(call.exchange_mark(), None);

        let value = serde_json::to_value(call).unwrap();
        assert!(value.get("deribit_mark").is_none());
        assert_eq!(report.tick, 3);
        assert_eq!(report.offset_ms, 15_000);
    }

    #[test]
    fn test_black76_without_volatility_is_unavailable() {
        let reporter = reporter(
            &[95000.0],
            MarkPriceEstimator::Black76(Black76Settings::default()),
        );
        let store = MarketSnapshotStore::new();
        store.update(FieldUpdate::new(
            "BTC-27JUN25-95000-C",
            MarketFields {
                best_bid: Some(0.077),
                best_ask: Some(0.0778),
                underlying_price: Some(100000.0),
                ..Default::default()
            },
        ));

        let report = reporter.evaluate(0, 0, &store, now());
        let call = report.record(95000.0, OptionType::Call).unwrap();
        assert_eq!(call.computed_mark, None);
        assert_eq!(
            call.unavailable_reason.as_deref(),
            Some("theoretical pricing unavailable: missing volatility")
        );
    }

    #[test]
    fn test_every_strike_has_both_sides() {
        let reporter = reporter(&[95000.0, 96000.0, 97000.0], MarkPriceEstimator::FallbackChain);
        let report = reporter.evaluate(0, 0, &MarketSnapshotStore::new(), now());

        assert_eq!(report.strikes.len(), 3);
        assert_eq!(report.records().count(), 6);
        assert!(report.records().all(|r| r.computed_mark.is_none()));
    }
}
