//! Error types for the instrument crate.

use crate::types::OptionType;
use thiserror::Error;

/// Result type alias for instrument operations.
pub type InstrumentResult<T> = Result<T, InstrumentError>;

/// Errors that can occur while building the catalog or resolving strikes.
///
/// Every resolution error is fatal for a run: no tick is sampled when a
/// requested strike cannot be bound to an instrument.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InstrumentError {
    /// The exchange lists nothing for the requested expiry.
    #[error("No instruments listed for expiry {expiry}")]
    NoInstrumentsListed { expiry: String },

    /// Instruments exist for the expiry, but none of the requested side.
    #[error("No {option_type} instruments listed for expiry {expiry}")]
    NoInstrumentsForSide {
        expiry: String,
        option_type: OptionType,
    },

    /// Invalid instrument symbol format.
    #[error("Invalid instrument symbol: {symbol}. Expected format: {expected}")]
    InvalidSymbol { symbol: String, expected: String },

    /// Invalid strike price.
    #[error("Invalid strike price: {0}. Strike must be positive.")]
    InvalidStrike(f64),

    /// Unknown option type string from the exchange.
    #[error("Invalid option type: {0}")]
    InvalidOptionType(String),
}
