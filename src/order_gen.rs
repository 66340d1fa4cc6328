//! Deterministic synthetic order stream for replay tests, benchmarks, and
//! load demos. Same seed ⇒ same sequence of orders.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use crate::engine::MatchingEngine;
use crate::types::{Order, OrderType, Side};

/// Configuration for the synthetic order generator. All ranges are
/// inclusive; the type ratios should sum to at most 1.0, with the remainder
/// producing fill-or-cancel orders.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// RNG seed. Same seed ⇒ same order stream.
    pub seed: u64,
    /// Symbol for all generated orders.
    pub symbol: String,
    /// Number of orders produced by [`Generator::all_orders`].
    pub num_orders: usize,
    /// Probability of BUY (0.0..=1.0). SELL otherwise.
    pub buy_ratio: f64,
    /// Probability of LIMIT, then MARKET, then IOC; the rest are FOC.
    pub limit_ratio: f64,
    pub market_ratio: f64,
    pub ioc_ratio: f64,
    /// Limit price range (inclusive), whole ticks.
    pub price_min: i64,
    pub price_max: i64,
    /// Quantity range (inclusive).
    pub quantity_min: u64,
    pub quantity_max: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            symbol: "SYN".to_string(),
            num_orders: 1000,
            buy_ratio: 0.5,
            limit_ratio: 0.85,
            market_ratio: 0.05,
            ioc_ratio: 0.05,
            price_min: 95,
            price_max: 105,
            quantity_min: 1,
            quantity_max: 100,
        }
    }
}

/// Deterministic order stream. Create with [`Generator::new`]; call
/// [`next_order`](Generator::next_order) to advance.
pub struct Generator {
    rng: StdRng,
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
        }
    }

    /// Generates the next order, advancing the RNG.
    pub fn next_order(&mut self) -> Order {
        loop {
            let side = if self.rng.gen::<f64>() < self.config.buy_ratio {
                Side::Buy
            } else {
                Side::Sell
            };
            let r = self.rng.gen::<f64>();
            let order_type = if r < self.config.limit_ratio {
                OrderType::Limit
            } else if r < self.config.limit_ratio + self.config.market_ratio {
                OrderType::Market
            } else if r < self.config.limit_ratio + self.config.market_ratio + self.config.ioc_ratio
            {
                OrderType::Ioc
            } else {
                OrderType::Foc
            };
            let quantity = self.rng.gen_range(
                self.config.quantity_min.max(1)..=self.config.quantity_max.max(1),
            );
            let price = match order_type {
                OrderType::Market => None,
                _ => Some(Decimal::from(
                    self.rng
                        .gen_range(self.config.price_min.max(1)..=self.config.price_max.max(1)),
                )),
            };
            // Config bounds are clamped positive above, so construction only
            // fails on a degenerate symbol; skip and retry in that case.
            if let Ok(order) = Order::new(&self.config.symbol, side, order_type, price, quantity) {
                return order;
            }
        }
    }

    pub fn take_orders(&mut self, n: usize) -> Vec<Order> {
        (0..n).map(|_| self.next_order()).collect()
    }

    /// The full stream as defined by `config.num_orders`.
    pub fn all_orders(&mut self) -> Vec<Order> {
        self.take_orders(self.config.num_orders)
    }
}

/// Replays orders into the engine. Returns the total trade count and each
/// submitted order in the state observed when its matching finished.
pub fn replay_into_engine(
    engine: &MatchingEngine,
    orders: impl IntoIterator<Item = Order>,
) -> (usize, Vec<Order>) {
    let mut total_trades = 0;
    let mut submitted = Vec::new();
    for mut order in orders {
        total_trades += engine.submit(&mut order).len();
        submitted.push(order);
    }
    (total_trades, submitted)
}
