//! Deribit JSON-RPC 2.0 message shapes.
//!
//! Only the handful of methods and notifications the sampler needs are
//! modelled; unknown fields are ignored.

use chrono::{DateTime, TimeZone, Utc};
use instrument::{InstrumentResult, ListedInstrument};
use market_data::{FieldUpdate, MarketFields};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GET_INSTRUMENTS: &str = "public/get_instruments";
pub const SUBSCRIBE: &str = "public/subscribe";
pub const SET_HEARTBEAT: &str = "public/set_heartbeat";
pub const TEST: &str = "public/test";

#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

impl<'a> RpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Any frame the exchange sends: a response to one of our requests or a
/// server-initiated notification.
#[derive(Debug, Clone, Deserialize)]
struct RawMessage {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct SubscriptionParams {
    channel: String,
    data: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct HeartbeatParams {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Response {
        id: u64,
        result: Result<Value, RpcError>,
    },
    Subscription {
        channel: String,
        data: Value,
    },
    /// `test_request` heartbeats must be answered with `public/test`
    Heartbeat {
        test_request: bool,
    },
    Other,
}

impl Incoming {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        let raw: RawMessage = serde_json::from_str(text)?;

        if let Some(id) = raw.id {
            let result = match (raw.error, raw.result) {
                (Some(error), _) => Err(error),
                (None, result) => Ok(result.unwrap_or(Value::Null)),
            };
            return Ok(Incoming::Response { id, result });
        }

        let params = raw.params.unwrap_or(Value::Null);
        Ok(match raw.method.as_deref() {
            Some("subscription") => {
                let SubscriptionParams { channel, data } = serde_json::from_value(params)?;
                Incoming::Subscription { channel, data }
            }
            Some("heartbeat") => {
                let HeartbeatParams { kind } = serde_json::from_value(params)?;
                Incoming::Heartbeat {
                    test_request: kind == "test_request",
                }
            }
            _ => Incoming::Other,
        })
    }
}

/// One entry of `public/get_instruments`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentInfo {
    pub instrument_name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub strike: Option<f64>,
    #[serde(default)]
    pub option_type: Option<String>,
    /// Milliseconds since the epoch
    pub expiration_timestamp: i64,
}

impl InstrumentInfo {
    pub fn to_listed(&self) -> InstrumentResult<ListedInstrument> {
        ListedInstrument::from_symbol(&self.instrument_name, ms_to_dt(self.expiration_timestamp))
    }
}

/// Payload of a `ticker.{instrument}.{interval}` notification.
///
/// Any field may be missing or null; only present ones reach the store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TickerData {
    pub instrument_name: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub best_bid_price: Option<f64>,
    #[serde(default)]
    pub best_ask_price: Option<f64>,
    #[serde(default)]
    pub last_price: Option<f64>,
    #[serde(default)]
    pub settlement_price: Option<f64>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub mark_price: Option<f64>,
    #[serde(default)]
    pub underlying_price: Option<f64>,
    #[serde(default)]
    pub interest_rate: Option<f64>,
    #[serde(default)]
    pub mark_iv: Option<f64>,
}

impl TickerData {
    pub fn into_update(self) -> FieldUpdate {
        let fields = MarketFields {
            best_bid: self.best_bid_price,
            best_ask: self.best_ask_price,
            last_price: self.last_price,
            settlement_price: self.settlement_price,
            min_price: self.min_price,
            max_price: self.max_price,
            exchange_mark_price: self.mark_price,
            underlying_price: self.underlying_price,
            interest_rate: self.interest_rate,
            mark_iv: self.mark_iv,
        };

        let update = FieldUpdate::new(self.instrument_name, fields);
        match self.timestamp {
            Some(ms) => update.with_exchange_time(ms_to_dt(ms)),
            None => update,
        }
    }
}

pub fn ticker_channel(instrument: &str, interval: &str) -> String {
    format!("ticker.{}.{}", instrument, interval)
}

fn ms_to_dt(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use instrument::OptionType;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let request = RpcRequest::new(
            7,
            GET_INSTRUMENTS,
            json!({"currency": "BTC", "kind": "option", "expired": false}),
        );
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 7);
        assert_eq!(value["method"], "public/get_instruments");
        assert_eq!(value["params"]["kind"], "option");
    }

    #[test]
    fn test_parse_response_and_error() {
        let ok = Incoming::parse(r#"{"jsonrpc":"2.0","id":3,"result":["ticker.X.100ms"]}"#)
            .unwrap();
        assert_matches!(
            ok,
            Incoming::Response { id: 3, result: Ok(Value::Array(channels)) } if channels.len() == 1
        );

        let err = Incoming::parse(
            r#"{"jsonrpc":"2.0","id":4,"error":{"code":10001,"message":"error"}}"#,
        )
        .unwrap();
        assert_matches!(
            err,
            Incoming::Response { id: 4, result: Err(RpcError { code: 10001, .. }) }
        );
    }

    #[test]
    fn test_parse_notifications() {
        let sub = Incoming::parse(
            r#"{"jsonrpc":"2.0","method":"subscription","params":{
                "channel":"ticker.BTC-27JUN25-95000-C.100ms",
                "data":{"instrument_name":"BTC-27JUN25-95000-C"}}}"#,
        )
        .unwrap();
        assert_matches!(
            sub,
            Incoming::Subscription { channel, .. } if channel == "ticker.BTC-27JUN25-95000-C.100ms"
        );

        let hb = Incoming::parse(
            r#"{"jsonrpc":"2.0","method":"heartbeat","params":{"type":"test_request"}}"#,
        )
        .unwrap();
        assert_eq!(hb, Incoming::Heartbeat { test_request: true });

        let plain = Incoming::parse(
            r#"{"jsonrpc":"2.0","method":"heartbeat","params":{"type":"heartbeat"}}"#,
        )
        .unwrap();
        assert_eq!(plain, Incoming::Heartbeat { test_request: false });
    }

    #[test]
    fn test_instrument_info_to_listed() {
        let info: InstrumentInfo = serde_json::from_value(json!({
            "instrument_name": "BTC-27JUN25-95000-P",
            "kind": "option",
            "strike": 95000.0,
            "option_type": "put",
            "expiration_timestamp": 1751011200000_i64,
            "tick_size": 0.0001
        }))
        .unwrap();

        let listed = info.to_listed().unwrap();
        assert_eq!(listed.strike, 95000.0);
        assert_eq!(listed.option_type, OptionType::Put);
        assert_eq!(listed.expiry_code, "27JUN25");
        assert_eq!(listed.expiry.timestamp_millis(), 1751011200000);
    }

    #[test]
    fn test_ticker_into_update_keeps_nulls_absent() {
        let ticker: TickerData = serde_json::from_value(json!({
            "instrument_name": "BTC-27JUN25-95000-C",
            "timestamp": 1750000000000_i64,
            "best_bid_price": 0.077,
            "best_ask_price": 0.0778,
            "last_price": null,
            "mark_price": 0.0775,
            "mark_iv": 52.5,
            "underlying_price": 101250.3,
            "interest_rate": 0.0,
            "stats": {"volume": 12.0}
        }))
        .unwrap();

        let update = ticker.into_update();
        assert_eq!(update.instrument_id.as_str(), "BTC-27JUN25-95000-C");
        assert_eq!(update.fields.best_bid, Some(0.077));
        assert_eq!(update.fields.best_ask, Some(0.0778));
        assert_eq!(update.fields.last_price, None);
        assert_eq!(update.fields.settlement_price, None);
        assert_eq!(update.fields.exchange_mark_price, Some(0.0775));
        assert_eq!(update.fields.mark_iv, Some(52.5));
        assert_eq!(
            update.exchange_time.map(|t| t.timestamp_millis()),
            Some(1750000000000)
        );
    }

    #[test]
    fn test_ticker_channel_name() {
        assert_eq!(
            ticker_channel("BTC-27JUN25-95000-C", "100ms"),
            "ticker.BTC-27JUN25-95000-C.100ms"
        );
    }
}
