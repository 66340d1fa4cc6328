//! Multi-symbol matching engine: routes submissions to per-symbol books and
//! publishes lifecycle events.
//!
//! Books are created lazily on first order for a symbol. The registry is a
//! concurrent map; each book sits behind its own mutex so submissions to the
//! same symbol are serialized while different symbols match in parallel.

use crate::event_bus::EventBus;
use crate::events::MarketEvent;
use crate::order_book::OrderBook;
use crate::types::{Order, OrderId, Trade};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Engine counters, captured at a point in time.
#[derive(Clone, Copy, Debug, serde::Serialize)]
pub struct EngineStats {
    pub total_orders: u64,
    pub total_trades: u64,
    pub active_books: usize,
    /// Mean submit latency in nanoseconds across all submissions.
    pub avg_submit_latency_ns: u64,
}

pub struct MatchingEngine {
    books: DashMap<String, Mutex<OrderBook>>,
    event_bus: Arc<EventBus>,
    total_orders: AtomicU64,
    total_trades: AtomicU64,
    total_latency_ns: AtomicU64,
}

impl MatchingEngine {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            books: DashMap::new(),
            event_bus,
            total_orders: AtomicU64::new(0),
            total_trades: AtomicU64::new(0),
            total_latency_ns: AtomicU64::new(0),
        }
    }

    /// Submits an order: routes it to its symbol's book (created on first
    /// use), publishes `OrderReceived`, the resulting trades, and exactly one
    /// terminal order event, and returns the trades to the caller.
    ///
    /// The caller's order is left in the state observed when matching
    /// finished; a rested remainder continues to live (and change) inside the
    /// book.
    pub fn submit(&self, order: &mut Order) -> Vec<Trade> {
        let started = Instant::now();
        self.total_orders.fetch_add(1, Ordering::Relaxed);

        self.event_bus.publish(MarketEvent::received(order.clone()));

        let trades = {
            let book = self.book_handle(order.symbol());
            let mut book = book.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            book.add_order(order)
        };

        for trade in &trades {
            self.event_bus.publish(MarketEvent::trade_event(trade.clone()));
        }
        self.total_trades
            .fetch_add(trades.len() as u64, Ordering::Relaxed);

        let terminal = if order.is_filled() {
            MarketEvent::filled(order.clone())
        } else if order.is_cancelled() {
            MarketEvent::cancelled(order.clone())
        } else {
            MarketEvent::open(order.clone())
        };
        self.event_bus.publish(terminal);

        let elapsed_ns = started.elapsed().as_nanos() as u64;
        self.total_latency_ns.fetch_add(elapsed_ns, Ordering::Relaxed);
        log::debug!(
            "order {} on {}: {} trade(s) in {} ns",
            order.id().0,
            order.symbol(),
            trades.len(),
            elapsed_ns
        );

        trades
    }

    /// Cancels a resting order. Returns `false` when no book exists for the
    /// symbol or the id is not resting. Cancellation via this path does not
    /// publish an event; only `submit` drives the bus.
    pub fn cancel(&self, symbol: &str, order_id: OrderId) -> bool {
        let symbol = symbol.trim().to_uppercase();
        let Some(book) = self.books.get(&symbol) else {
            log::debug!("cancel {}: no order book for {symbol}", order_id.0);
            return false;
        };
        let cancelled = book
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .cancel_order(order_id);
        log::debug!(
            "cancel {} on {symbol}: {}",
            order_id.0,
            if cancelled { "removed" } else { "not resting" }
        );
        cancelled
    }

    /// Runs `f` against the symbol's book under its lock. Read-only access
    /// for projections such as the market-data service.
    pub fn with_book<R>(&self, symbol: &str, f: impl FnOnce(&OrderBook) -> R) -> Option<R> {
        let book = self.books.get(&symbol.trim().to_uppercase())?;
        let guard = book.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Some(f(&guard))
    }

    pub fn symbols(&self) -> Vec<String> {
        self.books.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn stats(&self) -> EngineStats {
        let total_orders = self.total_orders.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ns.load(Ordering::Relaxed);
        EngineStats {
            total_orders,
            total_trades: self.total_trades.load(Ordering::Relaxed),
            active_books: self.books.len(),
            avg_submit_latency_ns: if total_orders == 0 {
                0
            } else {
                total_latency / total_orders
            },
        }
    }

    /// Shared-ref handle to the symbol's book, creating it on first use.
    /// `symbol` is already uppercased by order construction.
    fn book_handle(&self, symbol: &str) -> dashmap::mapref::one::Ref<'_, String, Mutex<OrderBook>> {
        loop {
            if let Some(book) = self.books.get(symbol) {
                return book;
            }
            self.books
                .entry(symbol.to_string())
                .or_insert_with(|| Mutex::new(OrderBook::new(symbol)));
        }
    }
}
