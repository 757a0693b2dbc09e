//! Market data error types

use thiserror::Error;

/// Errors that can occur during market data operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    /// The feed behind the snapshot store went away mid-run
    #[error("Feed disconnected: {0}")]
    FeedDisconnected(String),
}
