//! Exchange facade: the single external entry point.
//!
//! Composes the event bus, the matching engine, and the market-data service.
//! External callers submit and cancel orders, read snapshots, subscribe to
//! events, and shut the venue down; they never touch a book directly.

use crate::engine::{EngineStats, MatchingEngine};
use crate::event_bus::EventBus;
use crate::events::{EventKind, MarketEvent};
use crate::market_data::{MarketDataService, MarketDataSnapshot};
use crate::types::{Order, OrderId, Trade};
use std::sync::Arc;

pub struct Exchange {
    name: String,
    event_bus: Arc<EventBus>,
    engine: Arc<MatchingEngine>,
    market_data: MarketDataService,
}

impl Exchange {
    pub fn new(name: &str) -> Self {
        Self::with_queue_capacity(name, crate::event_bus::DEFAULT_CAPACITY)
    }

    /// Builds a venue with a specific event-queue capacity.
    pub fn with_queue_capacity(name: &str, capacity: usize) -> Self {
        let event_bus = Arc::new(EventBus::with_capacity(capacity));
        let engine = Arc::new(MatchingEngine::new(Arc::clone(&event_bus)));
        // The market-data service subscribes first so its refresh runs before
        // any later subscriber sees the same trade event.
        let market_data = MarketDataService::new(&event_bus, Arc::clone(&engine));
        Self {
            name: name.to_string(),
            event_bus,
            engine,
            market_data,
        }
    }

    /// Submits an order and returns the trades it generated (possibly empty).
    /// The order is left in the state observed when matching finished.
    pub fn submit(&self, order: &mut Order) -> Vec<Trade> {
        self.engine.submit(order)
    }

    /// Cancels a resting order. `true` iff something was removed from a book.
    pub fn cancel(&self, symbol: &str, order_id: OrderId) -> bool {
        self.engine.cancel(symbol, order_id)
    }

    /// Latest market-data snapshot for the symbol.
    pub fn snapshot(&self, symbol: &str) -> Option<MarketDataSnapshot> {
        self.market_data.snapshot(symbol)
    }

    pub fn all_snapshots(&self) -> Vec<MarketDataSnapshot> {
        self.market_data.all_snapshots()
    }

    /// Registers an event subscriber; delivery happens on the bus dispatcher
    /// thread after the market-data service has refreshed.
    pub fn subscribe(
        &self,
        kind: EventKind,
        subscriber: impl Fn(&MarketEvent) + Send + Sync + 'static,
    ) {
        self.event_bus.subscribe(kind, subscriber);
    }

    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Drains the event bus and returns the number of dropped events.
    pub fn shutdown(&self) -> u64 {
        let dropped = self.event_bus.shutdown();
        log::info!("exchange [{}] shut down, {dropped} event(s) dropped", self.name);
        dropped
    }
}
