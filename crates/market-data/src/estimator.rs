//! Mark price estimation.
//!
//! Two estimators exist and a run uses exactly one of them:
//!
//! - the fallback chain, which walks [`FALLBACK_CHAIN`] in order and takes the
//!   first tier able to produce a price from the snapshot
//! - Black-76, which prices the option from the underlying, rate and mark
//!   implied volatility carried by the same snapshot

use chrono::{DateTime, Utc};
use instrument::ListedInstrument;
use tracing::trace;

use crate::black76::{black76_price, forward_from_spot, MIN_TIME};
use crate::types::{
    Black76Inputs, EstimateMethod, MarketFields, MarketSnapshot, MissingInput, PriceEstimate,
    Unavailable,
};

/// Extracts a price from market fields when the tier applies.
pub type TierRule = fn(&MarketFields) -> Option<f64>;

/// The fallback chain, highest priority first.
///
/// A price from an earlier tier always wins, however implausible.
pub const FALLBACK_CHAIN: [(EstimateMethod, TierRule); 5] = [
    (EstimateMethod::MidPrice, mid_price as TierRule),
    (EstimateMethod::OneSided, one_sided as TierRule),
    (EstimateMethod::LastPrice, last_price as TierRule),
    (EstimateMethod::SettlementPrice, settlement_price as TierRule),
    (EstimateMethod::MinMaxAverage, min_max_average as TierRule),
];

/// Zero quotes are artifacts, not prices.
fn quoted(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

fn mid_price(fields: &MarketFields) -> Option<f64> {
    let bid = quoted(fields.best_bid)?;
    let ask = quoted(fields.best_ask)?;
    Some((bid + ask) / 2.0)
}

fn one_sided(fields: &MarketFields) -> Option<f64> {
    match (quoted(fields.best_bid), quoted(fields.best_ask)) {
        (Some(bid), None) => Some(bid),
        (None, Some(ask)) => Some(ask),
        _ => None,
    }
}

fn last_price(fields: &MarketFields) -> Option<f64> {
    fields.last_price
}

fn settlement_price(fields: &MarketFields) -> Option<f64> {
    fields.settlement_price
}

fn min_max_average(fields: &MarketFields) -> Option<f64> {
    Some((fields.min_price? + fields.max_price?) / 2.0)
}

/// Run the fallback chain over a set of fields.
pub fn estimate_from_fields(fields: &MarketFields) -> PriceEstimate {
    FALLBACK_CHAIN
        .iter()
        .find_map(|(method, rule)| {
            rule(fields).map(|price| PriceEstimate::Available {
                price,
                method: *method,
            })
        })
        .unwrap_or(PriceEstimate::Unavailable(Unavailable::EstimationUnavailable))
}

/// Settings for the Black-76 estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Black76Settings {
    /// Floor for the time to expiry, in years
    pub min_time_years: f64,
    /// Divide the model price by the underlying price, so that it is quoted
    /// in units of the underlying like the exchange's own option prices
    pub quote_in_underlying: bool,
}

impl Default for Black76Settings {
    fn default() -> Self {
        Self {
            min_time_years: MIN_TIME,
            quote_in_underlying: true,
        }
    }
}

/// Black-76 estimate from the model inputs carried by a snapshot.
pub fn estimate_black76(
    instrument: &ListedInstrument,
    fields: &MarketFields,
    settings: &Black76Settings,
    now: DateTime<Utc>,
) -> PriceEstimate {
    let unavailable =
        |missing| PriceEstimate::Unavailable(Unavailable::TheoreticalPricingUnavailable(missing));

    let Some(spot) = fields.underlying_price.filter(|s| *s > 0.0) else {
        return unavailable(MissingInput::UnderlyingPrice);
    };
    // Mark IV arrives in percent
    let Some(vol) = fields.mark_iv.map(|iv| iv / 100.0).filter(|v| *v > 0.0) else {
        return unavailable(MissingInput::Volatility);
    };
    let rate = fields.interest_rate.unwrap_or(0.0);
    let time = instrument
        .time_to_expiry_years(now)
        .max(settings.min_time_years);

    let forward = forward_from_spot(spot, rate, time);
    let price = black76_price(Black76Inputs {
        forward,
        strike: instrument.strike,
        time,
        vol,
        rate,
        option_type: instrument.option_type,
    });

    let price = if settings.quote_in_underlying {
        price / spot
    } else {
        price
    };

    trace!(
        instrument = %instrument.id,
        forward, vol, rate, time, price,
        "Black-76 estimate"
    );

    PriceEstimate::Available {
        price,
        method: EstimateMethod::Black76,
    }
}

/// The estimator selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MarkPriceEstimator {
    #[default]
    FallbackChain,
    Black76(Black76Settings),
}

impl MarkPriceEstimator {
    /// Estimate the mark price of `instrument` from its latest snapshot.
    ///
    /// A missing snapshot is reported as unavailable, never waited for.
    pub fn estimate(
        &self,
        instrument: &ListedInstrument,
        snapshot: Option<&MarketSnapshot>,
        now: DateTime<Utc>,
    ) -> PriceEstimate {
        let Some(snapshot) = snapshot else {
            return PriceEstimate::Unavailable(Unavailable::NoMarketData);
        };

        match self {
            MarkPriceEstimator::FallbackChain => estimate_from_fields(&snapshot.fields),
            MarkPriceEstimator::Black76(settings) => {
                estimate_black76(instrument, &snapshot.fields, settings, now)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MarkPriceEstimator::FallbackChain => "fallback_chain",
            MarkPriceEstimator::Black76(_) => "black76",
        }
    }
}
