//! Streaming side of the exchange connection.
//!
//! The feed applies ticker notifications to the shared store until it is
//! cancelled. Any loss of the connection is recorded on the store before
//! the feed returns, so the sampling loop sees it between ticks.

use futures::{SinkExt, StreamExt};
use market_data::MarketSnapshotStore;
use observability::SamplerMetrics;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::client::WsStream;
use crate::error::{FeedError, FeedResult};
use crate::rpc::{self, Incoming, RpcRequest, TickerData};

/// What the feed has to send back after handling one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    None,
    HeartbeatTest,
}

/// Apply one text frame to the store.
pub fn apply_message(
    text: &str,
    store: &MarketSnapshotStore,
    metrics: &SamplerMetrics,
) -> FeedResult<Reply> {
    match Incoming::parse(text)? {
        Incoming::Subscription { channel, data } => {
            if channel.starts_with("ticker.") {
                apply_ticker(data, store)?;
                metrics.record_feed_update();
            } else {
                trace!(%channel, "Ignoring notification");
            }
            Ok(Reply::None)
        }
        Incoming::Heartbeat { test_request: true } => Ok(Reply::HeartbeatTest),
        Incoming::Heartbeat { test_request: false } => Ok(Reply::None),
        Incoming::Response { id, result: Err(e) } => {
            warn!(id, code = e.code, message = %e.message, "Exchange returned an error");
            Ok(Reply::None)
        }
        Incoming::Response { .. } | Incoming::Other => Ok(Reply::None),
    }
}

fn apply_ticker(data: Value, store: &MarketSnapshotStore) -> FeedResult<()> {
    let ticker: TickerData = serde_json::from_value(data)?;
    store.update(ticker.into_update());
    Ok(())
}

pub struct TickerFeed {
    ws: WsStream,
    next_id: u64,
    idle_timeout: Option<Duration>,
    /// Frames that arrived during setup, applied before reading the socket.
    pending: Vec<String>,
}

impl TickerFeed {
    pub(crate) fn new(
        ws: WsStream,
        next_id: u64,
        idle_timeout: Option<Duration>,
        pending: Vec<String>,
    ) -> Self {
        Self {
            ws,
            next_id,
            idle_timeout,
            pending,
        }
    }

    /// Pump notifications into `store` until `cancel` fires or the
    /// connection is lost.
    pub async fn run(
        mut self,
        store: MarketSnapshotStore,
        cancel: CancellationToken,
        metrics: SamplerMetrics,
    ) -> FeedResult<()> {
        let result = self.pump(&store, &cancel, &metrics).await;

        match &result {
            Ok(()) => {
                if let Err(e) = self.ws.close(None).await {
                    debug!(error = %e, "Error closing WebSocket");
                }
                info!("Ticker feed stopped");
            }
            Err(e) => store.mark_disconnected(e.to_string()),
        }
        result
    }

    async fn pump(
        &mut self,
        store: &MarketSnapshotStore,
        cancel: &CancellationToken,
        metrics: &SamplerMetrics,
    ) -> FeedResult<()> {
        for text in std::mem::take(&mut self.pending) {
            self.handle_text(&text, store, metrics).await?;
        }

        let mut last_seen = Instant::now();

        loop {
            let idle_deadline = self.idle_timeout.map(|limit| last_seen + limit);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                _ = idle_wait(idle_deadline) => {
                    let secs = self.idle_timeout.map(|d| d.as_secs()).unwrap_or_default();
                    return Err(FeedError::Idle(secs));
                }
                frame = self.ws.next() => {
                    last_seen = Instant::now();
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text(&text, store, metrics).await?;
                        }
                        Some(Ok(Message::Ping(data))) => self.ws.send(Message::Pong(data)).await?,
                        Some(Ok(Message::Close(frame))) => {
                            return Err(FeedError::Closed(format!("{:?}", frame)));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => return Err(FeedError::Closed("stream ended".to_string())),
                    }
                }
            }
        }
    }

    async fn handle_text(
        &mut self,
        text: &str,
        store: &MarketSnapshotStore,
        metrics: &SamplerMetrics,
    ) -> FeedResult<()> {
        if apply_message(text, store, metrics)? == Reply::HeartbeatTest {
            self.answer_heartbeat().await?;
        }
        Ok(())
    }

    async fn answer_heartbeat(&mut self) -> FeedResult<()> {
        let id = self.next_id;
        self.next_id += 1;
        let request = serde_json::to_string(&RpcRequest::new(id, rpc::TEST, json!({})))?;
        self.ws.send(Message::Text(request)).await?;
        trace!(id, "Answered heartbeat");
        Ok(())
    }
}

async fn idle_wait(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
