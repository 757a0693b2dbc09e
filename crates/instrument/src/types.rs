//! Core domain types for listed instruments.
//!
//! - `InstrumentId`: the exchange's instrument name (e.g. `BTC-27JUN25-95000-C`)
//! - `OptionType`: Call or Put
//! - `ListedInstrument`: an option currently listed by the exchange
//! - `ResolvedTarget`: a requested strike bound to a listed instrument

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::InstrumentError;

const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 3600.0;

/// Unique identifier for an instrument, as named by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentId(String);

impl InstrumentId {
    /// Create a new instrument ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for InstrumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for InstrumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Type of option: Call or Put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// Call option - right to buy at strike price.
    Call,
    /// Put option - right to sell at strike price.
    Put,
}

impl OptionType {
    /// Both sides, calls first.
    pub const ALL: [OptionType; 2] = [OptionType::Call, OptionType::Put];

    /// Get the short code used in instrument names.
    pub fn code(&self) -> &'static str {
        match self {
            OptionType::Call => "C",
            OptionType::Put => "P",
        }
    }

    /// Lowercase name, as used by the exchange API and in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Call => "call",
            OptionType::Put => "put",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionType {
    type Err = InstrumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "call" | "c" => Ok(OptionType::Call),
            "put" | "p" => Ok(OptionType::Put),
            _ => Err(InstrumentError::InvalidOptionType(s.to_string())),
        }
    }
}

/// An option instrument currently listed by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedInstrument {
    /// Exchange instrument name.
    pub id: InstrumentId,
    /// Underlying asset symbol (e.g. "BTC").
    pub underlying: String,
    /// Expiry code segment of the name (e.g. "27JUN25").
    pub expiry_code: String,
    /// Expiry date and time (UTC).
    pub expiry: DateTime<Utc>,
    /// Strike price.
    pub strike: f64,
    /// Option type (Call/Put).
    pub option_type: OptionType,
}

impl ListedInstrument {
    /// Split an exchange name `ASSET-EXPIRY-STRIKE-TYPE` into its parts.
    ///
    /// Returns (underlying, expiry_code, strike, option_type).
    pub fn parse_symbol(
        symbol: &str,
    ) -> Result<(String, String, f64, OptionType), InstrumentError> {
        let invalid = || InstrumentError::InvalidSymbol {
            symbol: symbol.to_string(),
            expected: "ASSET-DDMMMYY-STRIKE-C|P".to_string(),
        };

        let parts: Vec<&str> = symbol.split('-').collect();
        if parts.len() != 4 {
            return Err(invalid());
        }
        let strike: f64 = parts[2].parse().map_err(|_| invalid())?;
        if strike <= 0.0 {
            return Err(InstrumentError::InvalidStrike(strike));
        }
        let option_type = parts[3].parse().map_err(|_| invalid())?;

        Ok((parts[0].to_string(), parts[1].to_string(), strike, option_type))
    }

    /// Build an instrument from its exchange name and expiry timestamp.
    pub fn from_symbol(symbol: &str, expiry: DateTime<Utc>) -> Result<Self, InstrumentError> {
        let (underlying, expiry_code, strike, option_type) = Self::parse_symbol(symbol)?;
        Ok(Self {
            id: InstrumentId::new(symbol),
            underlying,
            expiry_code,
            expiry,
            strike,
            option_type,
        })
    }

    /// Time to expiry in years (365-day year), negative once expired.
    pub fn time_to_expiry_years(&self, now: DateTime<Utc>) -> f64 {
        (self.expiry - now).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_YEAR
    }
}

impl fmt::Display for ListedInstrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// A requested strike and side bound to a listed instrument for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTarget {
    /// Strike the caller asked for.
    pub requested_strike: f64,
    /// Side the caller asked for.
    pub option_type: OptionType,
    /// Instrument the request resolved to.
    pub instrument: ListedInstrument,
    /// True when the instrument strike equals the requested strike exactly.
    pub is_standard: bool,
}

impl ResolvedTarget {
    pub fn instrument_id(&self) -> &InstrumentId {
        &self.instrument.id
    }

    /// Absolute distance between the requested and the resolved strike.
    pub fn strike_distance(&self) -> f64 {
        (self.instrument.strike - self.requested_strike).abs()
    }
}
