//! Shared types for Market Data

use chrono::{DateTime, Utc};
use instrument::{InstrumentId, OptionType};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Market fields known for one instrument.
///
/// Every field is independently present or absent. The same shape carries
/// a partial feed update and the merged latest state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketFields {
    pub best_bid: Option<f64>,
    pub best_ask: Option<f64>,
    pub last_price: Option<f64>,
    pub settlement_price: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Mark price computed by the exchange itself
    pub exchange_mark_price: Option<f64>,
    /// Underlying (index or future) price used as pricing reference
    pub underlying_price: Option<f64>,
    /// Continuously compounded rate, as a decimal
    pub interest_rate: Option<f64>,
    /// Exchange mark implied volatility, in percent
    pub mark_iv: Option<f64>,
}

fn overwrite(slot: &mut Option<f64>, value: Option<f64>) {
    if value.is_some() {
        *slot = value;
    }
}

impl MarketFields {
    /// Overwrite the fields present in `update`, leaving the others untouched.
    pub fn merge(&mut self, update: &MarketFields) {
        overwrite(&mut self.best_bid, update.best_bid);
        overwrite(&mut self.best_ask, update.best_ask);
        overwrite(&mut self.last_price, update.last_price);
        overwrite(&mut self.settlement_price, update.settlement_price);
        overwrite(&mut self.min_price, update.min_price);
        overwrite(&mut self.max_price, update.max_price);
        overwrite(&mut self.exchange_mark_price, update.exchange_mark_price);
        overwrite(&mut self.underlying_price, update.underlying_price);
        overwrite(&mut self.interest_rate, update.interest_rate);
        overwrite(&mut self.mark_iv, update.mark_iv);
    }

    pub fn is_empty(&self) -> bool {
        *self == MarketFields::default()
    }
}

/// A partial field set for one instrument, as received from the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub instrument_id: InstrumentId,
    pub fields: MarketFields,
    /// Exchange-side time of the update, when the feed provides one
    pub exchange_time: Option<DateTime<Utc>>,
}

impl FieldUpdate {
    pub fn new(instrument_id: impl Into<InstrumentId>, fields: MarketFields) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            fields,
            exchange_time: None,
        }
    }

    pub fn with_exchange_time(mut self, time: DateTime<Utc>) -> Self {
        self.exchange_time = Some(time);
        self
    }
}

/// Latest known state of one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub instrument_id: InstrumentId,
    pub fields: MarketFields,
    pub exchange_time: Option<DateTime<Utc>>,
    pub received_at: DateTime<Utc>,
    /// Number of updates merged into this snapshot
    pub updates: u64,
}

impl MarketSnapshot {
    pub fn new(instrument_id: InstrumentId, fields: MarketFields) -> Self {
        Self {
            instrument_id,
            fields,
            exchange_time: None,
            received_at: Utc::now(),
            updates: 1,
        }
    }
}

/// Tier of the fallback chain, or the model, that produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateMethod {
    /// Midpoint of best bid and best ask
    MidPrice,
    /// Only one side of the book quoted
    OneSided,
    LastPrice,
    SettlementPrice,
    /// Mean of the exchange price band
    MinMaxAverage,
    /// Black-76 theoretical price
    Black76,
}

impl EstimateMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimateMethod::MidPrice => "mid_price",
            EstimateMethod::OneSided => "one_sided",
            EstimateMethod::LastPrice => "last_price",
            EstimateMethod::SettlementPrice => "settlement_price",
            EstimateMethod::MinMaxAverage => "min_max_average",
            EstimateMethod::Black76 => "black76",
        }
    }
}

impl fmt::Display for EstimateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model input missing for a theoretical price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissingInput {
    Volatility,
    UnderlyingPrice,
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingInput::Volatility => f.write_str("volatility"),
            MissingInput::UnderlyingPrice => f.write_str("underlying price"),
        }
    }
}

/// Why no estimate could be produced for a target on a tick.
///
/// These are recorded in the output, never raised.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unavailable {
    /// The feed has not delivered anything for the instrument yet
    #[error("no market data received")]
    NoMarketData,

    /// Market data exists but no tier of the fallback chain applies
    #[error("estimation unavailable: no usable market field")]
    EstimationUnavailable,

    /// A Black-76 input is missing or unusable
    #[error("theoretical pricing unavailable: missing {0}")]
    TheoreticalPricingUnavailable(MissingInput),
}

impl Unavailable {
    /// Short label for metrics and logs
    pub fn code(&self) -> &'static str {
        match self {
            Unavailable::NoMarketData => "no_market_data",
            Unavailable::EstimationUnavailable => "estimation_unavailable",
            Unavailable::TheoreticalPricingUnavailable(_) => "theoretical_pricing_unavailable",
        }
    }
}

/// Output of the estimator for one instrument at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceEstimate {
    Available { price: f64, method: EstimateMethod },
    Unavailable(Unavailable),
}

impl PriceEstimate {
    pub fn price(&self) -> Option<f64> {
        match self {
            PriceEstimate::Available { price, .. } => Some(*price),
            PriceEstimate::Unavailable(_) => None,
        }
    }

    pub fn method(&self) -> Option<EstimateMethod> {
        match self {
            PriceEstimate::Available { method, .. } => Some(*method),
            PriceEstimate::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, PriceEstimate::Available { .. })
    }
}

/// Inputs for Black-76 pricing
#[derive(Debug, Clone, Copy)]
pub struct Black76Inputs {
    /// Forward price of the underlying
    pub forward: f64,
    /// Strike price
    pub strike: f64,
    /// Time to expiry (in years)
    pub time: f64,
    /// Volatility (as decimal, e.g., 0.5 = 50%)
    pub vol: f64,
    /// Continuously compounded risk-free rate
    pub rate: f64,
    /// Option type
    pub option_type: OptionType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overwrites_only_present_fields() {
        let mut fields = MarketFields {
            best_bid: Some(0.07),
            best_ask: Some(0.08),
            last_price: Some(0.075),
            ..Default::default()
        };

        fields.merge(&MarketFields {
            best_bid: Some(0.071),
            settlement_price: Some(0.06),
            ..Default::default()
        });

        assert_eq!(fields.best_bid, Some(0.071));
        assert_eq!(fields.best_ask, Some(0.08));
        assert_eq!(fields.last_price, Some(0.075));
        assert_eq!(fields.settlement_price, Some(0.06));
        assert_eq!(fields.min_price, None);
    }

    #[test]
    fn test_empty_update_is_noop() {
        let original = MarketFields {
            exchange_mark_price: Some(0.0775),
            ..Default::default()
        };
        let mut fields = original;
        fields.merge(&MarketFields::default());
        assert_eq!(fields, original);
        assert!(MarketFields::default().is_empty());
    }

    #[test]
    fn test_estimate_accessors() {
        let available = PriceEstimate::Available {
            price: 0.0774,
            method: EstimateMethod::MidPrice,
        };
        assert_eq!(available.price(), Some(0.0774));
        assert_eq!(available.method(), Some(EstimateMethod::MidPrice));

        let missing = PriceEstimate::Unavailable(Unavailable::EstimationUnavailable);
        assert_eq!(missing.price(), None);
        assert!(!missing.is_available());
    }

    #[test]
    fn test_unavailable_messages() {
        let err = Unavailable::TheoreticalPricingUnavailable(MissingInput::Volatility);
        assert_eq!(err.to_string(), "theoretical pricing unavailable: missing volatility");
        assert_eq!(err.code(), "theoretical_pricing_unavailable");
    }
}
