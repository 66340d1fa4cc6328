//! Events published on the bus: order lifecycle and trades.
//!
//! Each event carries the relevant entity captured at publish time plus a
//! monotonic publish timestamp.

use crate::types::{monotonic_ns, Order, Trade};

/// Event kind, used as the subscription key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    OrderReceived,
    OrderOpen,
    OrderFilled,
    OrderCancelled,
    Trade,
}

/// Order state captured when the event was published.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct OrderEvent {
    pub order: Order,
    pub published_at_ns: u64,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TradeEvent {
    pub trade: Trade,
    pub published_at_ns: u64,
}

/// An event flowing through the bus.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum MarketEvent {
    OrderReceived(OrderEvent),
    OrderOpen(OrderEvent),
    OrderFilled(OrderEvent),
    OrderCancelled(OrderEvent),
    Trade(TradeEvent),
}

impl MarketEvent {
    pub(crate) fn received(order: Order) -> Self {
        MarketEvent::OrderReceived(OrderEvent::now(order))
    }

    pub(crate) fn open(order: Order) -> Self {
        MarketEvent::OrderOpen(OrderEvent::now(order))
    }

    pub(crate) fn filled(order: Order) -> Self {
        MarketEvent::OrderFilled(OrderEvent::now(order))
    }

    pub(crate) fn cancelled(order: Order) -> Self {
        MarketEvent::OrderCancelled(OrderEvent::now(order))
    }

    pub(crate) fn trade_event(trade: Trade) -> Self {
        MarketEvent::Trade(TradeEvent {
            trade,
            published_at_ns: monotonic_ns(),
        })
    }

    pub fn kind(&self) -> EventKind {
        match self {
            MarketEvent::OrderReceived(_) => EventKind::OrderReceived,
            MarketEvent::OrderOpen(_) => EventKind::OrderOpen,
            MarketEvent::OrderFilled(_) => EventKind::OrderFilled,
            MarketEvent::OrderCancelled(_) => EventKind::OrderCancelled,
            MarketEvent::Trade(_) => EventKind::Trade,
        }
    }

    /// The order carried by an order-lifecycle event.
    pub fn order(&self) -> Option<&Order> {
        match self {
            MarketEvent::OrderReceived(e)
            | MarketEvent::OrderOpen(e)
            | MarketEvent::OrderFilled(e)
            | MarketEvent::OrderCancelled(e) => Some(&e.order),
            MarketEvent::Trade(_) => None,
        }
    }

    /// The trade carried by a trade event.
    pub fn trade(&self) -> Option<&Trade> {
        match self {
            MarketEvent::Trade(e) => Some(&e.trade),
            _ => None,
        }
    }

    pub fn published_at_ns(&self) -> u64 {
        match self {
            MarketEvent::OrderReceived(e)
            | MarketEvent::OrderOpen(e)
            | MarketEvent::OrderFilled(e)
            | MarketEvent::OrderCancelled(e) => e.published_at_ns,
            MarketEvent::Trade(e) => e.published_at_ns,
        }
    }
}

impl OrderEvent {
    fn now(order: Order) -> Self {
        Self {
            order,
            published_at_ns: monotonic_ns(),
        }
    }
}
