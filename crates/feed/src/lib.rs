//! # Feed Crate
//!
//! Connection to the Deribit WebSocket API (JSON-RPC 2.0).
//!
//! ```text
//! DeribitClient ── get_instruments / subscribe / set_heartbeat   (setup)
//!       │ into_feed()
//!       ▼
//! TickerFeed ── ticker.{instrument}.{interval} ──► MarketSnapshotStore
//! ```
//!
//! The feed never retries: a dropped connection is recorded on the store
//! and ends the run.

pub mod client;
pub mod error;
pub mod rpc;
pub mod ticker;

pub use client::DeribitClient;
pub use error::{FeedError, FeedResult};
pub use rpc::{ticker_channel, InstrumentInfo, TickerData};
pub use ticker::{apply_message, Reply, TickerFeed};
