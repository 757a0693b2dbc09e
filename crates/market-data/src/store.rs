//! Market snapshot store.
//!
//! The only state shared between the feed task and the sampling loop. The
//! feed merges partial updates in; the sampler reads copies out. A merge holds
//! the write lock for all of its fields, so a reader never observes half of
//! an update.

use chrono::Utc;
use instrument::InstrumentId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::MarketDataError;
use crate::types::{FieldUpdate, MarketSnapshot};
use crate::Result;

#[derive(Debug, Default)]
struct StoreState {
    snapshots: HashMap<InstrumentId, MarketSnapshot>,
    disconnected: Option<String>,
}

/// Latest market fields per instrument, cheap to clone and share.
#[derive(Debug, Clone)]
pub struct MarketSnapshotStore {
    state: Arc<RwLock<StoreState>>,
    feed_lost: CancellationToken,
}

impl MarketSnapshotStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            feed_lost: CancellationToken::new(),
        }
    }

    /// Merge a partial update into the instrument's snapshot.
    ///
    /// Only the fields present in the update are overwritten.
    pub fn update(&self, update: FieldUpdate) {
        let mut state = self.state.write();
        let received_at = Utc::now();

        match state.snapshots.get_mut(&update.instrument_id) {
            Some(snapshot) => {
                snapshot.fields.merge(&update.fields);
                if update.exchange_time.is_some() {
                    snapshot.exchange_time = update.exchange_time;
                }
                snapshot.received_at = received_at;
                snapshot.updates += 1;
            }
            None => {
                debug!(instrument = %update.instrument_id, "First update for instrument");
                let mut snapshot = MarketSnapshot::new(update.instrument_id.clone(), update.fields);
                snapshot.exchange_time = update.exchange_time;
                snapshot.received_at = received_at;
                state.snapshots.insert(update.instrument_id, snapshot);
            }
        }
    }

    /// Copy of the instrument's snapshot, or `None` if it was never observed.
    pub fn read(&self, instrument_id: &InstrumentId) -> Option<MarketSnapshot> {
        self.state.read().snapshots.get(instrument_id).cloned()
    }

    /// Copies of several snapshots taken under one lock, in input order.
    pub fn read_many<'a, I>(&self, instrument_ids: I) -> Vec<Option<MarketSnapshot>>
    where
        I: IntoIterator<Item = &'a InstrumentId>,
    {
        let state = self.state.read();
        instrument_ids
            .into_iter()
            .map(|id| state.snapshots.get(id).cloned())
            .collect()
    }

    /// Number of instruments observed so far.
    pub fn len(&self) -> usize {
        self.state.read().snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record that the feed behind this store is gone and wake waiters.
    ///
    /// Only the first reason is kept.
    pub fn mark_disconnected(&self, reason: impl Into<String>) {
        let reason = reason.into();
        {
            let mut state = self.state.write();
            if state.disconnected.is_none() {
                warn!(%reason, "Market data feed disconnected");
                state.disconnected = Some(reason);
            }
        }
        self.feed_lost.cancel();
    }

    pub fn is_disconnected(&self) -> bool {
        self.feed_lost.is_cancelled()
    }

    /// Fail fast once the feed is gone.
    pub fn ensure_connected(&self) -> Result<()> {
        match &self.state.read().disconnected {
            Some(reason) => Err(MarketDataError::FeedDisconnected(reason.clone())),
            None => Ok(()),
        }
    }

    /// Resolves when the feed is marked disconnected.
    pub async fn feed_lost(&self) {
        self.feed_lost.cancelled().await;
    }
}

impl Default for MarketSnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarketFields;
    use assert_matches::assert_matches;
    use std::time::Duration;

    fn id(name: &str) -> InstrumentId {
        InstrumentId::new(name)
    }

    #[test]
    fn test_unknown_instrument_has_no_data() {
        let store = MarketSnapshotStore::new();
        assert!(store.read(&id("BTC-27JUN25-95000-C")).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_merges_present_fields() {
        let store = MarketSnapshotStore::new();
        let name = "BTC-27JUN25-95000-C";

        store.update(FieldUpdate::new(
            name,
            MarketFields {
                best_bid: Some(0.077),
                best_ask: Some(0.0778),
                exchange_mark_price: Some(0.0775),
                ..Default::default()
            },
        ));
        store.update(FieldUpdate::new(
            name,
            MarketFields {
                best_ask: Some(0.079),
                last_price: Some(0.078),
                ..Default::default()
            },
        ));

        let snapshot = store.read(&id(name)).unwrap();
        assert_eq!(snapshot.fields.best_bid, Some(0.077));
        assert_eq!(snapshot.fields.best_ask, Some(0.079));
        assert_eq!(snapshot.fields.last_price, Some(0.078));
        assert_eq!(snapshot.fields.exchange_mark_price, Some(0.0775));
        assert_eq!(snapshot.updates, 2);
    }

    #[test]
    fn test_read_returns_a_copy() {
        let store = MarketSnapshotStore::new();
        let name = "BTC-27JUN25-95000-P";
        store.update(FieldUpdate::new(
            name,
            MarketFields {
                settlement_price: Some(0.01),
                ..Default::default()
            },
        ));

        let before = store.read(&id(name)).unwrap();
        store.update(FieldUpdate::new(
            name,
            MarketFields {
                settlement_price: Some(0.02),
                ..Default::default()
            },
        ));

        assert_eq!(before.fields.settlement_price, Some(0.01));
        assert_eq!(store.read(&id(name)).unwrap().fields.settlement_price, Some(0.02));
    }

    #[test]
    fn test_read_many_preserves_order() {
        let store = MarketSnapshotStore::new();
        store.update(FieldUpdate::new(
            "A",
            MarketFields {
                last_price: Some(1.0),
                ..Default::default()
            },
        ));

        let ids = [id("missing"), id("A")];
        let snapshots = store.read_many(ids.iter());
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots[0].is_none());
        assert_eq!(snapshots[1].as_ref().unwrap().fields.last_price, Some(1.0));
    }

    #[test]
    fn test_disconnect_fails_fast() {
        let store = MarketSnapshotStore::new();
        assert!(store.ensure_connected().is_ok());

        store.mark_disconnected("socket closed");
        store.mark_disconnected("second reason is ignored");

        assert!(store.is_disconnected());
        assert_matches!(
            store.ensure_connected(),
            Err(MarketDataError::FeedDisconnected(reason)) if reason == "socket closed"
        );
    }

    #[tokio::test]
    async fn test_feed_lost_wakes_waiters() {
        let store = MarketSnapshotStore::new();
        let feed_side = store.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            feed_side.mark_disconnected("eof");
        });

        tokio::time::timeout(Duration::from_secs(5), store.feed_lost())
            .await
            .expect("feed loss should be observed");
        assert!(store.ensure_connected().is_err());
    }
}
