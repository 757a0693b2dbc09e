//! Request/response side of the Deribit WebSocket API.
//!
//! The client owns the socket while the run is being set up (catalog query,
//! subscriptions, heartbeat) and is then turned into a [`TickerFeed`].

use common::ExpiryCode;
use futures::{SinkExt, StreamExt};
use instrument::ListedInstrument;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::error::{FeedError, FeedResult};
use crate::rpc::{self, Incoming, InstrumentInfo, RpcRequest};
use crate::ticker::TickerFeed;

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct DeribitClient {
    ws: WsStream,
    next_id: u64,
    request_timeout: Duration,
    /// Notifications received while waiting for a response.
    pending: Vec<String>,
}

impl DeribitClient {
    #[tracing::instrument(skip(request_timeout))]
    pub async fn connect(url: &str, request_timeout: Duration) -> FeedResult<Self> {
        let (ws, _) = timeout(request_timeout, connect_async(url))
            .await
            .map_err(|_| FeedError::Timeout {
                operation: format!("connect to {}", url),
                seconds: request_timeout.as_secs(),
            })??;

        info!(url, "Connected to exchange");
        Ok(Self {
            ws,
            next_id: 1,
            request_timeout,
            pending: Vec::new(),
        })
    }

    /// Send one request and wait for the response carrying its id.
    ///
    /// Notifications that arrive in between are kept and replayed by the
    /// feed, so a ticker pushed right after a subscription is not lost.
    pub async fn call(&mut self, method: &str, params: Value) -> FeedResult<Value> {
        let id = self.next_id;
        self.next_id += 1;

        let request = serde_json::to_string(&RpcRequest::new(id, method, params))?;
        trace!(id, method, "Sending request");
        self.ws.send(Message::Text(request)).await?;

        let limit = self.request_timeout;
        timeout(limit, self.read_response(id, method))
            .await
            .map_err(|_| FeedError::Timeout {
                operation: method.to_string(),
                seconds: limit.as_secs(),
            })?
    }

    async fn read_response(&mut self, id: u64, method: &str) -> FeedResult<Value> {
        loop {
            let text = match self.ws.next().await {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Ping(data))) => {
                    self.ws.send(Message::Pong(data)).await?;
                    continue;
                }
                Some(Ok(Message::Close(frame))) => {
                    return Err(FeedError::Closed(format!("{:?}", frame)));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => return Err(FeedError::Closed("stream ended".to_string())),
            };

            match Incoming::parse(&text)? {
                Incoming::Response { id: got, result } if got == id => {
                    return result.map_err(|e| FeedError::Rpc {
                        method: method.to_string(),
                        code: e.code,
                        message: e.message,
                    });
                }
                Incoming::Response { id: got, .. } => {
                    debug!(expected = id, got, "Skipping response to another request");
                }
                Incoming::Subscription { .. } | Incoming::Heartbeat { test_request: true } => {
                    trace!("Buffering notification received during setup");
                    self.pending.push(text);
                }
                Incoming::Heartbeat { .. } | Incoming::Other => {}
            }
        }
    }

    /// List the currency's live options and keep those of `expiry`.
    #[tracing::instrument(skip(self), fields(expiry = %expiry))]
    pub async fn load_instruments(
        &mut self,
        currency: &str,
        expiry: &ExpiryCode,
    ) -> FeedResult<Vec<ListedInstrument>> {
        let result = self
            .call(
                rpc::GET_INSTRUMENTS,
                json!({ "currency": currency, "kind": "option", "expired": false }),
            )
            .await?;
        let listing: Vec<InstrumentInfo> = serde_json::from_value(result)?;
        let total = listing.len();

        let mut instruments = Vec::new();
        for info in listing
            .iter()
            .filter(|info| expiry.matches_instrument(&info.instrument_name))
        {
            match info.to_listed() {
                Ok(listed) => instruments.push(listed),
                Err(e) => warn!(
                    instrument = %info.instrument_name,
                    error = %e,
                    "Skipping unparsable instrument"
                ),
            }
        }

        info!(
            listed = total,
            matching = instruments.len(),
            "Loaded instruments for expiry"
        );
        Ok(instruments)
    }

    /// Subscribe to public channels, returning the ones the exchange accepted.
    #[tracing::instrument(skip(self, channels), fields(count = channels.len()))]
    pub async fn subscribe(&mut self, channels: &[String]) -> FeedResult<Vec<String>> {
        let result = self
            .call(rpc::SUBSCRIBE, json!({ "channels": channels }))
            .await?;
        let accepted: Vec<String> = serde_json::from_value(result)?;

        if accepted.len() != channels.len() {
            warn!(
                requested = channels.len(),
                accepted = accepted.len(),
                "Exchange did not accept every channel"
            );
        }
        Ok(accepted)
    }

    /// Ask the exchange to send `test_request` heartbeats every `interval`.
    pub async fn set_heartbeat(&mut self, interval: Duration) -> FeedResult<()> {
        self.call(rpc::SET_HEARTBEAT, json!({ "interval": interval.as_secs() }))
            .await?;
        debug!(interval_secs = interval.as_secs(), "Heartbeat enabled");
        Ok(())
    }

    /// Hand the socket over to a ticker feed.
    ///
    /// `idle_timeout` bounds the silence tolerated before the connection is
    /// considered lost.
    pub fn into_feed(self, idle_timeout: Option<Duration>) -> TickerFeed {
        TickerFeed::new(self.ws, self.next_id, idle_timeout, self.pending)
    }

    pub async fn close(mut self) -> FeedResult<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}
