//! Output records.
//!
//! A tick report maps each requested strike to its call and put records;
//! the run report collects every tick of the run.

use chrono::{DateTime, Utc};
use instrument::{InstrumentId, OptionType};
use market_data::EstimateMethod;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// How a record relates to the exchange's own mark.
///
/// Standard records always carry `deribit_mark`, null when the exchange
/// never sent one. Closest-match records never carry it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Comparison {
    Standard {
        instrument: InstrumentId,
        #[serde(rename = "deribit_mark")]
        exchange_mark: Option<f64>,
    },
    Closest {
        closest_instrument: InstrumentId,
    },
}

/// Result for one (strike, side) on one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub computed_mark: Option<f64>,
    pub is_standard: bool,
    #[serde(flatten)]
    pub comparison: Comparison,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<EstimateMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,
    pub testnet: bool,
}

impl SampleRecord {
    pub fn instrument(&self) -> &InstrumentId {
        match &self.comparison {
            Comparison::Standard { instrument, .. } => instrument,
            Comparison::Closest { closest_instrument } => closest_instrument,
        }
    }

    pub fn exchange_mark(&self) -> Option<f64> {
        match self.comparison {
            Comparison::Standard { exchange_mark, .. } => exchange_mark,
            Comparison::Closest { .. } => None,
        }
    }
}

/// Requested strike used as a report key; serialized as its decimal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrikeKey(pub OrderedFloat<f64>);

impl From<f64> for StrikeKey {
    fn from(strike: f64) -> Self {
        Self(OrderedFloat(strike))
    }
}

impl fmt::Display for StrikeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0 .0)
    }
}

impl Serialize for StrikeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StrikeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse::<f64>()
            .map(StrikeKey::from)
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrikeRecords {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call: Option<SampleRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<SampleRecord>,
}

impl StrikeRecords {
    pub fn get(&self, option_type: OptionType) -> Option<&SampleRecord> {
        match option_type {
            OptionType::Call => self.call.as_ref(),
            OptionType::Put => self.put.as_ref(),
        }
    }

    pub fn set(&mut self, option_type: OptionType, record: SampleRecord) {
        match option_type {
            OptionType::Call => self.call = Some(record),
            OptionType::Put => self.put = Some(record),
        }
    }
}

/// Every record of one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// Zero-based tick index
    pub tick: u64,
    /// Unix seconds at which the tick was evaluated
    pub timestamp: i64,
    /// Milliseconds since the run started
    pub offset_ms: u64,
    pub strikes: BTreeMap<StrikeKey, StrikeRecords>,
}

impl TickReport {
    pub fn record(&self, strike: f64, option_type: OptionType) -> Option<&SampleRecord> {
        self.strikes.get(&StrikeKey::from(strike))?.get(option_type)
    }

    pub fn records(&self) -> impl Iterator<Item = &SampleRecord> {
        self.strikes
            .values()
            .flat_map(|records| records.call.iter().chain(records.put.iter()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    FeedLost,
}

/// All ticks of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub expiry: String,
    pub testnet: bool,
    pub estimator: String,
    pub duration_seconds: u64,
    pub interval_seconds: u64,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub ticks: Vec<TickReport>,
}

impl RunReport {
    pub fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }
}
