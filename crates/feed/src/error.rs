use instrument::InstrumentError;
use thiserror::Error;

/// Errors talking to the exchange
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid JSON from exchange: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC error {code} calling {method}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    #[error("Timed out after {seconds}s waiting for {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error("Connection closed: {0}")]
    Closed(String),

    #[error("No market data for {0}s")]
    Idle(u64),

    #[error("Malformed instrument listing: {0}")]
    Instrument(#[from] InstrumentError),
}

pub type FeedResult<T> = std::result::Result<T, FeedError>;
