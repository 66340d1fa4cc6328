//! Market-data projection: per-symbol snapshots refreshed on every trade.
//!
//! The service subscribes to trade events at construction. Each trade
//! triggers a fresh snapshot of that symbol's book, replacing the previous
//! one in a concurrent map. Readers never touch the live book.

use crate::engine::MatchingEngine;
use crate::event_bus::EventBus;
use crate::events::EventKind;
use crate::order_book::OrderBook;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::SystemTime;

/// Immutable point-in-time view of one symbol's market.
///
/// `spread` and `mid` are zero whenever either side of the book is empty;
/// `last_trade_price` and `vwap` are zero before the first trade.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct MarketDataSnapshot {
    pub symbol: String,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub spread: Decimal,
    pub mid: Decimal,
    pub last_trade_price: Decimal,
    pub vwap: Decimal,
    pub total_volume: u64,
    /// Count of resting orders on the bid side.
    pub bid_depth: usize,
    /// Count of resting orders on the ask side.
    pub ask_depth: usize,
    pub captured_at: SystemTime,
}

impl MarketDataSnapshot {
    pub(crate) fn capture(book: &OrderBook) -> Self {
        Self {
            symbol: book.symbol().to_string(),
            best_bid: book.best_bid(),
            best_ask: book.best_ask(),
            spread: book.spread().unwrap_or(Decimal::ZERO),
            mid: book.mid().unwrap_or(Decimal::ZERO),
            last_trade_price: book.last_trade_price().unwrap_or(Decimal::ZERO),
            vwap: book.vwap(),
            total_volume: book.total_volume(),
            bid_depth: book.bid_depth(),
            ask_depth: book.ask_depth(),
            captured_at: SystemTime::now(),
        }
    }
}

pub struct MarketDataService {
    snapshots: Arc<DashMap<String, MarketDataSnapshot>>,
}

impl MarketDataService {
    /// Wires the service to the bus: every trade event refreshes the snapshot
    /// for its symbol from the engine's book. The refresh runs on the bus
    /// dispatcher thread; reads may happen concurrently from any thread.
    pub fn new(event_bus: &EventBus, engine: Arc<MatchingEngine>) -> Self {
        let snapshots: Arc<DashMap<String, MarketDataSnapshot>> = Arc::new(DashMap::new());
        {
            let snapshots = Arc::clone(&snapshots);
            event_bus.subscribe(EventKind::Trade, move |event| {
                let Some(trade) = event.trade() else { return };
                let symbol = trade.symbol();
                if let Some(snapshot) = engine.with_book(symbol, MarketDataSnapshot::capture) {
                    snapshots.insert(symbol.to_string(), snapshot);
                }
            });
        }
        Self { snapshots }
    }

    /// Latest snapshot for the symbol, if any trade has happened on it.
    pub fn snapshot(&self, symbol: &str) -> Option<MarketDataSnapshot> {
        self.snapshots
            .get(&symbol.trim().to_uppercase())
            .map(|entry| entry.clone())
    }

    pub fn all_snapshots(&self) -> Vec<MarketDataSnapshot> {
        self.snapshots.iter().map(|entry| entry.clone()).collect()
    }
}
