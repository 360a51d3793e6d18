//! Sides, allocated positions and the orders they decompose into.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderPrice {
    /// Executes at market; `reference` is the close used for exposure.
    Market { reference: f64 },
    Limit(f64),
}

impl OrderPrice {
    pub fn is_market(&self) -> bool {
        matches!(self, OrderPrice::Market { .. })
    }

    pub fn value(&self) -> f64 {
        match self {
            OrderPrice::Market { reference } => *reference,
            OrderPrice::Limit(price) => *price,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    pub price: OrderPrice,
    pub level: usize,
    pub exposure: f64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocatedPosition {
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    pub price: f64,
    pub exposure: f64,
    pub score: f64,
    pub lot: u64,
    pub orders: Vec<Order>,
}

impl AllocatedPosition {
    pub fn ordered_quantity(&self) -> u64 {
        self.orders.iter().map(|o| o.quantity).sum()
    }
}
