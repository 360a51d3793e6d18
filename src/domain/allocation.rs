//! Budget-constrained sizing, level ladders and side balancing.
//!
//! Each side spends at most half the total budget. A candidate is sized to
//! `min(target exposure, per-instrument cap)`, rounded down to whole lots,
//! split across the configured price levels and finally balanced against
//! the opposite side by position count.

use crate::domain::config::{LotRule, PriceLevel, TradingConfig};
use crate::domain::order::{AllocatedPosition, Order, OrderPrice, Side};
use crate::domain::selection::{CandidatePosition, Selection};
use std::cmp::Ordering;
use std::fmt;
use tracing::{debug, info, warn};

/// Truncate toward zero at `precision` decimals. Never rounds, so a value
/// just below a tick lands on the tick beneath it.
pub fn truncate_price(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).trunc() / factor
}

/// Split `quantity` over `levels` rungs in whole lots; level 0 takes the
/// remainder. The result always sums to `quantity`.
pub fn decompose_levels(quantity: u64, lot: u64, levels: usize) -> Vec<u64> {
    if levels == 0 {
        return Vec::new();
    }
    let lot = lot.max(1);
    let k = levels as u64;
    let per_level = (quantity / k) / lot * lot;
    let mut split = vec![per_level; levels];
    split[0] += quantity - per_level * k;
    split
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Accepting another target-sized position would exceed the side budget.
    BudgetExhausted,
    /// Close is zero, negative or not a number.
    InvalidPrice,
    /// The target buys less than one lot.
    BelowMinimumLot,
    /// Close so small that the share count does not fit in a quantity.
    QuantityOverflow,
    /// Dropped to match the other side's position count.
    BalancedOut,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::BudgetExhausted => write!(f, "budget exhausted"),
            RejectReason::InvalidPrice => write!(f, "invalid price"),
            RejectReason::BelowMinimumLot => write!(f, "below minimum lot"),
            RejectReason::QuantityOverflow => write!(f, "quantity out of range"),
            RejectReason::BalancedOut => write!(f, "balanced out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCandidate {
    pub symbol: String,
    pub side: Side,
    pub score: f64,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookBalance {
    /// Both sides hold `per_side` positions.
    Balanced { per_side: usize },
    /// One side allocated nothing; the other is kept whole.
    SingleSided { empty_side: Side },
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationOutcome {
    pub buys: Vec<AllocatedPosition>,
    pub sells: Vec<AllocatedPosition>,
    pub rejected: Vec<RejectedCandidate>,
    pub balance: BookBalance,
    pub side_budget: f64,
}

impl AllocationOutcome {
    pub fn positions(&self, side: Side) -> &[AllocatedPosition] {
        match side {
            Side::Buy => &self.buys,
            Side::Sell => &self.sells,
        }
    }

    /// Buys first, then sells, levels ascending within each position.
    pub fn orders(&self) -> Vec<Order> {
        self.buys
            .iter()
            .chain(self.sells.iter())
            .flat_map(|p| p.orders.iter().cloned())
            .collect()
    }

    pub fn exposure(&self, side: Side) -> f64 {
        self.positions(side).iter().map(|p| p.exposure).sum()
    }

    pub fn is_single_sided(&self) -> bool {
        !matches!(self.balance, BookBalance::Balanced { .. })
    }
}

#[derive(Debug, Clone)]
pub struct AllocationEngine {
    side_budget: f64,
    position_target: f64,
    lots: LotRule,
    price_precision: u32,
    levels: Vec<PriceLevel>,
}

impl AllocationEngine {
    pub fn from_config(config: &TradingConfig) -> Self {
        Self {
            side_budget: config.side_budget(),
            position_target: config.position_target(),
            lots: config.lot_rule(),
            price_precision: config.price_precision,
            levels: config.price_levels.clone(),
        }
    }

    pub fn side_budget(&self) -> f64 {
        self.side_budget
    }

    pub fn allocate(&self, selection: &Selection) -> AllocationOutcome {
        let (buys, mut rejected) = self.allocate_side(&selection.buys, Side::Buy);
        let (sells, sell_rejects) = self.allocate_side(&selection.sells, Side::Sell);
        rejected.extend(sell_rejects);

        let (buys, sells, balance, balanced_out) = balance_sides(buys, sells);
        rejected.extend(balanced_out);

        match balance {
            BookBalance::SingleSided { empty_side } => {
                warn!(%empty_side, "no viable allocation on one side, book is single-sided")
            }
            BookBalance::Empty => warn!("no viable allocation on either side"),
            BookBalance::Balanced { .. } => {}
        }

        let outcome = AllocationOutcome {
            buys,
            sells,
            rejected,
            balance,
            side_budget: self.side_budget,
        };
        info!(
            buys = outcome.buys.len(),
            sells = outcome.sells.len(),
            rejected = outcome.rejected.len(),
            buy_exposure = outcome.exposure(Side::Buy),
            sell_exposure = outcome.exposure(Side::Sell),
            "allocation complete"
        );
        outcome
    }

    /// Size one side's candidates in ranking order against the side budget.
    pub fn allocate_side(
        &self,
        candidates: &[CandidatePosition],
        side: Side,
    ) -> (Vec<AllocatedPosition>, Vec<RejectedCandidate>) {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        let mut spent = 0.0;

        for candidate in candidates {
            let reject = |reason: RejectReason| {
                debug!(symbol = %candidate.symbol, %side, %reason, "candidate rejected");
                RejectedCandidate {
                    symbol: candidate.symbol.clone(),
                    side,
                    score: candidate.score,
                    reason,
                }
            };

            if spent + self.position_target > self.side_budget {
                rejected.push(reject(RejectReason::BudgetExhausted));
                continue;
            }
            let price = candidate.close;
            if !(price.is_finite() && price > 0.0) {
                rejected.push(reject(RejectReason::InvalidPrice));
                continue;
            }
            let lot = self.lots.lot_for(price);
            let lots = ((self.position_target / price) / lot as f64).floor();
            let Some(quantity) = whole_lots(lots, lot) else {
                rejected.push(reject(RejectReason::QuantityOverflow));
                continue;
            };
            if quantity < lot {
                rejected.push(reject(RejectReason::BelowMinimumLot));
                continue;
            }

            let exposure = quantity as f64 * price;
            spent += exposure;
            accepted.push(AllocatedPosition {
                symbol: candidate.symbol.clone(),
                side,
                quantity,
                price,
                exposure,
                score: candidate.score,
                lot,
                orders: self.build_orders(candidate, side, quantity, lot),
            });
        }

        (accepted, rejected)
    }

    /// Ladder for one position; rungs that receive no shares are omitted.
    pub fn build_orders(
        &self,
        candidate: &CandidatePosition,
        side: Side,
        quantity: u64,
        lot: u64,
    ) -> Vec<Order> {
        let close = candidate.close;
        decompose_levels(quantity, lot, self.levels.len())
            .into_iter()
            .zip(self.levels.iter())
            .enumerate()
            .filter(|(_, (qty, _))| *qty > 0)
            .map(|(level, (qty, rung))| {
                let price = if rung.is_market {
                    OrderPrice::Market { reference: close }
                } else {
                    OrderPrice::Limit(truncate_price(
                        close * (1.0 + rung.signed_offset(side)),
                        self.price_precision,
                    ))
                };
                Order {
                    symbol: candidate.symbol.clone(),
                    side,
                    quantity: qty,
                    price,
                    level,
                    exposure: qty as f64 * close,
                    score: candidate.score,
                }
            })
            .collect()
    }
}

/// Share count for `lots` whole lots, or `None` when it does not fit in a
/// `u64`.
fn whole_lots(lots: f64, lot: u64) -> Option<u64> {
    if lots.is_nan() || lots >= u64::MAX as f64 {
        return None;
    }
    (lots as u64).checked_mul(lot)
}

/// Keep `min(#buys, #sells)` per side, strongest first. An empty side leaves
/// the other one whole.
fn balance_sides(
    mut buys: Vec<AllocatedPosition>,
    mut sells: Vec<AllocatedPosition>,
) -> (
    Vec<AllocatedPosition>,
    Vec<AllocatedPosition>,
    BookBalance,
    Vec<RejectedCandidate>,
) {
    let balance = match (buys.is_empty(), sells.is_empty()) {
        (true, true) => BookBalance::Empty,
        (true, false) => BookBalance::SingleSided {
            empty_side: Side::Buy,
        },
        (false, true) => BookBalance::SingleSided {
            empty_side: Side::Sell,
        },
        (false, false) => BookBalance::Balanced {
            per_side: buys.len().min(sells.len()),
        },
    };
    let BookBalance::Balanced { per_side } = balance else {
        return (buys, sells, balance, Vec::new());
    };

    buys.sort_by(balance_rank);
    sells.sort_by(balance_rank);
    let dropped: Vec<RejectedCandidate> = buys
        .split_off(per_side)
        .into_iter()
        .chain(sells.split_off(per_side))
        .map(|p| {
            debug!(symbol = %p.symbol, side = %p.side, "balanced out");
            RejectedCandidate {
                symbol: p.symbol,
                side: p.side,
                score: p.score,
                reason: RejectReason::BalancedOut,
            }
        })
        .collect();

    (buys, sells, balance, dropped)
}

fn balance_rank(a: &AllocatedPosition, b: &AllocatedPosition) -> Ordering {
    b.score
        .abs()
        .total_cmp(&a.score.abs())
        .then(b.exposure.total_cmp(&a.exposure))
        .then_with(|| a.symbol.cmp(&b.symbol))
}
