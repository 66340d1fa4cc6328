//! Core types: identifiers, order lifecycle, and trades.
//!
//! [`Order`] carries an immutable identity (id, symbol, side, type, price,
//! timestamp) plus execution state that only the owning book mutates.
//! [`Trade`] is the immutable record of one match.

use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Instant, SystemTime};
use thiserror::Error;

/// Unique order identifier, assigned from a process-wide counter starting at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct OrderId(pub u64);

/// Trade identifier. Its own counter, also starting at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct TradeId(pub u64);

static ORDER_IDS: AtomicU64 = AtomicU64::new(1);
static TRADE_IDS: AtomicU64 = AtomicU64::new(1);

/// Nanoseconds since a process-local monotonic epoch (first call wins).
/// Used for time priority and latency accounting, never for wall-clock time.
pub(crate) fn monotonic_ns() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// Order side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order type. LIMIT rests unfilled remainder; MARKET, IOC, and FOC never rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Limit,
    Market,
    /// Immediate-or-cancel: fill what crosses now, cancel the remainder.
    Ioc,
    /// Fill-or-cancel (all-or-nothing): fill entirely now or cancel untouched.
    Foc,
}

/// Order lifecycle status.
///
/// Transitions: NEW → {OPEN, PARTIALLY_FILLED, FILLED, CANCELLED},
/// OPEN → {PARTIALLY_FILLED, FILLED, CANCELLED},
/// PARTIALLY_FILLED → {FILLED, CANCELLED}. FILLED and REJECTED are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    /// Assigned by gateways that refuse an order upstream; such an order
    /// never reaches a book.
    Rejected,
}

/// Construction-time validation failure. The order never enters a book.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("symbol must not be blank")]
    BlankSymbol,
    #[error("quantity must be positive")]
    InvalidQuantity,
    #[error("{0:?} order requires a limit price")]
    MissingPrice(OrderType),
    #[error("limit price must be positive, got {0}")]
    InvalidPrice(Decimal),
}

/// A single order. Identity is fixed at construction; execution state
/// (`remaining_qty`, `filled_qty`, `status`) is mutated only by the owning
/// book's matching and cancellation paths.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Order {
    id: OrderId,
    symbol: String,
    side: Side,
    order_type: OrderType,
    /// Limit price. `None` for MARKET orders.
    price: Option<Decimal>,
    original_qty: u64,
    remaining_qty: u64,
    filled_qty: u64,
    status: OrderStatus,
    /// Monotonic capture time in nanoseconds; ties within a price level are
    /// broken by queue position, which equals submission order.
    timestamp_ns: u64,
}

impl Order {
    /// Builds a validated order. The symbol is uppercased; MARKET orders have
    /// any supplied price discarded.
    pub fn new(
        symbol: &str,
        side: Side,
        order_type: OrderType,
        price: Option<Decimal>,
        quantity: u64,
    ) -> Result<Self, OrderError> {
        if symbol.trim().is_empty() {
            return Err(OrderError::BlankSymbol);
        }
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity);
        }
        let price = match order_type {
            OrderType::Market => None,
            OrderType::Limit | OrderType::Ioc | OrderType::Foc => match price {
                None => return Err(OrderError::MissingPrice(order_type)),
                Some(p) if p <= Decimal::ZERO => return Err(OrderError::InvalidPrice(p)),
                Some(p) => Some(p),
            },
        };
        Ok(Self {
            id: OrderId(ORDER_IDS.fetch_add(1, Ordering::Relaxed)),
            symbol: symbol.trim().to_uppercase(),
            side,
            order_type,
            price,
            original_qty: quantity,
            remaining_qty: quantity,
            filled_qty: 0,
            status: OrderStatus::New,
            timestamp_ns: monotonic_ns(),
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn price(&self) -> Option<Decimal> {
        self.price
    }

    pub fn original_qty(&self) -> u64 {
        self.original_qty
    }

    pub fn remaining_qty(&self) -> u64 {
        self.remaining_qty
    }

    pub fn filled_qty(&self) -> u64 {
        self.filled_qty
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }

    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == OrderStatus::Cancelled
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::New | OrderStatus::Open | OrderStatus::PartiallyFilled
        )
    }

    /// Records an execution of `qty` against this order.
    ///
    /// A fill larger than the remaining quantity is an internal invariant
    /// violation and aborts.
    pub(crate) fn fill(&mut self, qty: u64) {
        assert!(
            qty > 0 && qty <= self.remaining_qty,
            "invalid fill qty {qty} for order {} with remaining {}",
            self.id.0,
            self.remaining_qty
        );
        self.remaining_qty -= qty;
        self.filled_qty += qty;
        self.status = if self.remaining_qty == 0 {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
    }

    pub(crate) fn cancel(&mut self) {
        assert!(
            self.status != OrderStatus::Filled,
            "cannot cancel filled order {}",
            self.id.0
        );
        self.status = OrderStatus::Cancelled;
    }

    /// Marks a freshly rested order OPEN. A partially filled remainder keeps
    /// PARTIALLY_FILLED; the lifecycle has no edge back to OPEN.
    pub(crate) fn mark_open(&mut self) {
        if self.status == OrderStatus::New {
            self.status = OrderStatus::Open;
        }
    }

    /// Final state of a MARKET order whose remainder was discarded unfilled.
    pub(crate) fn mark_partially_filled(&mut self) {
        self.status = OrderStatus::PartiallyFilled;
    }
}

/// Immutable record of a matched trade. The execution price is always the
/// resting (maker) order's limit price.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Trade {
    id: TradeId,
    symbol: String,
    buy_order_id: OrderId,
    sell_order_id: OrderId,
    price: Decimal,
    quantity: u64,
    timestamp_ns: u64,
    executed_at: SystemTime,
}

impl Trade {
    pub(crate) fn new(
        symbol: &str,
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        price: Decimal,
        quantity: u64,
    ) -> Self {
        Self {
            id: TradeId(TRADE_IDS.fetch_add(1, Ordering::Relaxed)),
            symbol: symbol.to_string(),
            buy_order_id,
            sell_order_id,
            price,
            quantity,
            timestamp_ns: monotonic_ns(),
            executed_at: SystemTime::now(),
        }
    }

    pub fn id(&self) -> TradeId {
        self.id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn buy_order_id(&self) -> OrderId {
        self.buy_order_id
    }

    pub fn sell_order_id(&self) -> OrderId {
        self.sell_order_id
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }

    pub fn executed_at(&self) -> SystemTime {
        self.executed_at
    }

    /// Price × quantity.
    pub fn notional(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}
