use feed::FeedError;
use instrument::InstrumentError;
use market_data::MarketDataError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SamplerError {
    /// A requested (strike, side) could not be bound to a listed instrument
    #[error("Resolution failed: {0}")]
    Resolution(#[from] InstrumentError),

    #[error("Market data feed disconnected: {0}")]
    FeedDisconnected(String),

    #[error("Exchange error: {0}")]
    Feed(#[from] FeedError),

    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<MarketDataError> for SamplerError {
    fn from(err: MarketDataError) -> Self {
        match err {
            MarketDataError::FeedDisconnected(reason) => SamplerError::FeedDisconnected(reason),
        }
    }
}

pub type Result<T> = std::result::Result<T, SamplerError>;
