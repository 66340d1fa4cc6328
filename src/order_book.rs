//! Per-symbol limit order book with strict price-time priority.
//!
//! Bids and asks are sorted price-level maps; iteration starts at the best
//! price (highest bid, lowest ask). An order-id index gives O(log P)
//! cancellation. Matching sweeps the opposite side best-first, filling FIFO
//! within each level; execution is always at the resting (maker) order's
//! price.
//!
//! Complexity: add/cancel O(log P), match O(T log P) for T trades, best
//! bid/ask O(1), where P is the number of distinct price levels on a side.

use crate::price_level::PriceLevel;
use crate::types::{Order, OrderId, OrderType, Side, Trade};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

/// One side of the book. A single ascending `BTreeMap` serves both sides;
/// the side tag decides which end is the best price (asks: first key,
/// bids: last key).
#[derive(Debug)]
struct BookSide {
    side: Side,
    levels: BTreeMap<Decimal, PriceLevel>,
}

impl BookSide {
    fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    fn best_price(&self) -> Option<Decimal> {
        match self.side {
            Side::Buy => self.levels.last_key_value().map(|(p, _)| *p),
            Side::Sell => self.levels.first_key_value().map(|(p, _)| *p),
        }
    }

    fn level(&self, price: Decimal) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    fn level_mut(&mut self, price: Decimal) -> Option<&mut PriceLevel> {
        self.levels.get_mut(&price)
    }

    fn level_entry(&mut self, price: Decimal) -> &mut PriceLevel {
        self.levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
    }

    fn remove_level(&mut self, price: Decimal) {
        self.levels.remove(&price);
    }

    /// Levels in matching order: best price first.
    fn levels_best_first(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        match self.side {
            Side::Buy => Box::new(self.levels.values().rev()),
            Side::Sell => Box::new(self.levels.values()),
        }
    }

    /// Count of resting orders across all levels.
    fn depth(&self) -> usize {
        self.levels.values().map(PriceLevel::order_count).sum()
    }
}

/// Does the incoming order's limit allow it to trade at `level_price`?
/// BUY crosses when its limit ≥ the level; SELL when its limit ≤ the level.
/// MARKET orders have no limit and always cross.
fn crosses(incoming: &Order, level_price: Decimal) -> bool {
    match incoming.price() {
        Some(limit) => match incoming.side() {
            Side::Buy => limit >= level_price,
            Side::Sell => limit <= level_price,
        },
        None => true,
    }
}

/// Single-symbol order book.
#[derive(Debug)]
pub struct OrderBook {
    symbol: String,
    bids: BookSide,
    asks: BookSide,
    /// order id → (side, price) of the level where the order rests.
    order_index: HashMap<OrderId, (Side, Decimal)>,
    trades: Vec<Trade>,
    last_trade_price: Option<Decimal>,
    total_volume: u64,
    /// Sum of price × qty across all trades.
    total_turnover: Decimal,
}

impl OrderBook {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            bids: BookSide::new(Side::Buy),
            asks: BookSide::new(Side::Sell),
            order_index: HashMap::new(),
            trades: Vec::new(),
            last_trade_price: None,
            total_volume: 0,
            total_turnover: Decimal::ZERO,
        }
    }

    /// Runs matching for `order` and returns the trades generated (possibly
    /// empty). The order is left in its terminal-or-resting state: FILLED,
    /// PARTIALLY_FILLED (MARKET remainder discarded), CANCELLED (IOC/FOC),
    /// or OPEN (LIMIT remainder rested).
    pub fn add_order(&mut self, order: &mut Order) -> Vec<Trade> {
        let mut trades = Vec::new();
        match order.order_type() {
            OrderType::Limit => self.match_limit(order, &mut trades),
            OrderType::Market => self.match_market(order, &mut trades),
            OrderType::Ioc => self.match_ioc(order, &mut trades),
            OrderType::Foc => self.match_foc(order, &mut trades),
        }
        trades
    }

    /// Cancels a resting order by id. Returns `true` iff the order was found
    /// and removed. Cancelling an unknown, already filled, or already
    /// cancelled id is not an error and returns `false`.
    pub fn cancel_order(&mut self, order_id: OrderId) -> bool {
        let Some((side, price)) = self.order_index.get(&order_id).copied() else {
            return false;
        };
        let book_side = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let removed = book_side
            .level_mut(price)
            .and_then(|level| level.remove(order_id))
            .is_some();
        if removed {
            self.order_index.remove(&order_id);
            if book_side.level(price).is_some_and(PriceLevel::is_empty) {
                book_side.remove_level(price);
            }
        }
        removed
    }

    // ── Order type matching ──────────────────────────────────────────────

    fn match_limit(&mut self, order: &mut Order, trades: &mut Vec<Trade>) {
        self.sweep(order, false, trades);
        if !order.is_filled() {
            self.rest(order);
        }
    }

    fn match_market(&mut self, order: &mut Order, trades: &mut Vec<Trade>) {
        self.sweep(order, true, trades);
        // Remainder is discarded; a MARKET order never rests.
        if !order.is_filled() {
            order.mark_partially_filled();
        }
    }

    fn match_ioc(&mut self, order: &mut Order, trades: &mut Vec<Trade>) {
        self.sweep(order, false, trades);
        if !order.is_filled() {
            order.cancel();
        }
    }

    fn match_foc(&mut self, order: &mut Order, trades: &mut Vec<Trade>) {
        // Dry-run first: either the full quantity is reachable and the sweep
        // fills it completely, or the book is left untouched.
        if self.available_qty(order) >= order.remaining_qty() {
            self.sweep(order, false, trades);
        } else {
            order.cancel();
        }
    }

    // ── Core sweep ───────────────────────────────────────────────────────

    /// Walks the opposite side best-first, generating trades until the
    /// incoming order is filled or no eligible level remains. `ignore_price`
    /// is set for MARKET orders, which take whatever is available.
    fn sweep(&mut self, incoming: &mut Order, ignore_price: bool, trades: &mut Vec<Trade>) {
        while incoming.remaining_qty() > 0 {
            let best = match incoming.side() {
                Side::Buy => self.asks.best_price(),
                Side::Sell => self.bids.best_price(),
            };
            let Some(level_price) = best else { break };
            if !ignore_price && !crosses(incoming, level_price) {
                break;
            }
            let opposite = match incoming.side() {
                Side::Buy => &mut self.asks,
                Side::Sell => &mut self.bids,
            };
            let Some(level) = opposite.level_mut(level_price) else {
                break;
            };

            // Strict FIFO within the level.
            while incoming.remaining_qty() > 0 {
                let Some(resting) = level.front_mut() else { break };
                let fill = incoming.remaining_qty().min(resting.remaining_qty());
                let resting_id = resting.id();
                resting.fill(fill);
                let resting_done = resting.is_filled();
                incoming.fill(fill);
                level.on_fill(fill);

                if resting_done {
                    level.dequeue();
                    self.order_index.remove(&resting_id);
                }

                let (buy_id, sell_id) = match incoming.side() {
                    Side::Buy => (incoming.id(), resting_id),
                    Side::Sell => (resting_id, incoming.id()),
                };
                let trade = Trade::new(&self.symbol, buy_id, sell_id, level_price, fill);
                self.last_trade_price = Some(level_price);
                self.total_volume += fill;
                self.total_turnover += level_price * Decimal::from(fill);
                self.trades.push(trade.clone());
                trades.push(trade);
            }

            if level.is_empty() {
                opposite.remove_level(level_price);
            }
        }
    }

    /// FOC dry-run: total crossing quantity reachable on the opposite side,
    /// short-circuiting once the order's remaining quantity is covered.
    fn available_qty(&self, order: &Order) -> u64 {
        let opposite = match order.side() {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        };
        let mut total = 0u64;
        for level in opposite.levels_best_first() {
            if !crosses(order, level.price()) {
                break;
            }
            total += level.total_qty();
            if total >= order.remaining_qty() {
                break;
            }
        }
        total
    }

    /// Places the unfilled remainder on this order's own side and records it
    /// in the order index.
    fn rest(&mut self, order: &mut Order) {
        let Some(price) = order.price() else {
            // Only LIMIT orders reach here; they always carry a price.
            return;
        };
        order.mark_open();
        let book_side = match order.side() {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        book_side.level_entry(price).enqueue(order.clone());
        self.order_index.insert(order.id(), (order.side(), price));
    }

    // ── Market data accessors ────────────────────────────────────────────

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.best_price()
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.best_price()
    }

    /// best_ask − best_bid; `None` unless both sides are populated.
    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask()? - self.best_bid()?)
    }

    /// Midpoint of the best bid and ask; `None` unless both sides are populated.
    pub fn mid(&self) -> Option<Decimal> {
        Some((self.best_bid()? + self.best_ask()?) / Decimal::from(2))
    }

    pub fn last_trade_price(&self) -> Option<Decimal> {
        self.last_trade_price
    }

    pub fn total_volume(&self) -> u64 {
        self.total_volume
    }

    pub fn total_turnover(&self) -> Decimal {
        self.total_turnover
    }

    /// Volume-weighted average price over all trades; zero before any trade.
    pub fn vwap(&self) -> Decimal {
        if self.total_volume == 0 {
            Decimal::ZERO
        } else {
            self.total_turnover / Decimal::from(self.total_volume)
        }
    }

    /// Count of resting orders on the bid side.
    pub fn bid_depth(&self) -> usize {
        self.bids.depth()
    }

    /// Count of resting orders on the ask side.
    pub fn ask_depth(&self) -> usize {
        self.asks.depth()
    }

    /// Append-only trade history.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Current state of a resting order, if the id is on the book.
    pub fn resting_order(&self, order_id: OrderId) -> Option<&Order> {
        let (side, price) = self.order_index.get(&order_id).copied()?;
        let book_side = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        book_side
            .level(price)?
            .orders()
            .find(|o| o.id() == order_id)
    }

    /// Number of entries in the order index (equals resting order count).
    pub fn resting_order_count(&self) -> usize {
        self.order_index.len()
    }
}
