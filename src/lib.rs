//! # Matchbook
//!
//! Single-venue, multi-symbol order matching engine with strict price-time
//! priority. Supports LIMIT, MARKET, IOC (immediate-or-cancel), and FOC
//! (fill-or-cancel, all-or-nothing) orders; publishes lifecycle and trade
//! events on a non-blocking bus; and projects per-symbol market-data
//! snapshots (best bid/ask, spread, mid, VWAP, volume, depth) from the trade
//! stream.
//!
//! ## Entry point
//!
//! Use [`Exchange`] as the single entry point: create with [`Exchange::new`],
//! then [`Exchange::submit`], [`Exchange::cancel`], [`Exchange::snapshot`],
//! and [`Exchange::shutdown`].
//!
//! ## Example
//!
//! ```rust
//! use matchbook::{Exchange, Order, OrderType, Side};
//! use rust_decimal::Decimal;
//!
//! let exchange = Exchange::new("demo");
//!
//! let mut sell = Order::new("ACME", Side::Sell, OrderType::Limit,
//!     Some(Decimal::from(100)), 50).unwrap();
//! assert!(exchange.submit(&mut sell).is_empty());
//!
//! let mut buy = Order::new("ACME", Side::Buy, OrderType::Limit,
//!     Some(Decimal::from(101)), 50).unwrap();
//! let trades = exchange.submit(&mut buy);
//! assert_eq!(trades.len(), 1);
//! // Execution at the maker's price.
//! assert_eq!(trades[0].price(), Decimal::from(100));
//!
//! exchange.shutdown();
//! ```
//!
//! ## Lower-level API
//!
//! [`MatchingEngine`] and [`OrderBook`] are public for embedders that manage
//! the event bus themselves.

pub mod api;
pub mod engine;
pub mod event_bus;
pub mod events;
pub mod exchange;
pub mod market_data;
pub mod order_book;
pub mod order_gen;
mod price_level;
pub mod types;

pub use engine::{EngineStats, MatchingEngine};
pub use event_bus::EventBus;
pub use events::{EventKind, MarketEvent, OrderEvent, TradeEvent};
pub use exchange::Exchange;
pub use market_data::{MarketDataService, MarketDataSnapshot};
pub use order_book::OrderBook;
pub use types::{Order, OrderError, OrderId, OrderStatus, OrderType, Side, Trade, TradeId};
