//! Book-level risk summary: exposures, budget usage and concentration.

use crate::domain::allocation::{AllocationOutcome, BookBalance};
use crate::domain::order::{AllocatedPosition, Side};

#[derive(Debug, Clone, PartialEq)]
pub struct LargestPosition {
    pub symbol: String,
    pub exposure: f64,
    /// Percent of the total budget.
    pub share_of_budget: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SideSummary {
    pub side: Side,
    pub positions: usize,
    pub orders: usize,
    pub exposure: f64,
    /// Percent of the side budget in use.
    pub budget_usage: f64,
    pub largest: Option<LargestPosition>,
    /// Herfindahl-Hirschman index over position shares in percent, 0..=10000.
    pub hhi: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationSummary {
    pub total_budget: f64,
    pub side_budget: f64,
    pub buy: SideSummary,
    pub sell: SideSummary,
    pub gross_exposure: f64,
    /// Buy exposure minus sell exposure.
    pub net_exposure: f64,
    pub single_sided: bool,
}

impl AllocationSummary {
    pub fn compute(outcome: &AllocationOutcome) -> Self {
        let side_budget = outcome.side_budget;
        let total_budget = side_budget * 2.0;
        let buy = summarize_side(Side::Buy, &outcome.buys, side_budget, total_budget);
        let sell = summarize_side(Side::Sell, &outcome.sells, side_budget, total_budget);

        Self {
            total_budget,
            side_budget,
            gross_exposure: buy.exposure + sell.exposure,
            net_exposure: buy.exposure - sell.exposure,
            single_sided: !matches!(outcome.balance, BookBalance::Balanced { .. }),
            buy,
            sell,
        }
    }

    pub fn side(&self, side: Side) -> &SideSummary {
        match side {
            Side::Buy => &self.buy,
            Side::Sell => &self.sell,
        }
    }
}

fn summarize_side(
    side: Side,
    positions: &[AllocatedPosition],
    side_budget: f64,
    total_budget: f64,
) -> SideSummary {
    let exposure: f64 = positions.iter().map(|p| p.exposure).sum();
    let budget_usage = if side_budget > 0.0 {
        exposure / side_budget * 100.0
    } else {
        0.0
    };

    let largest = positions
        .iter()
        .max_by(|a, b| {
            a.exposure
                .total_cmp(&b.exposure)
                .then_with(|| b.symbol.cmp(&a.symbol))
        })
        .map(|p| LargestPosition {
            symbol: p.symbol.clone(),
            exposure: p.exposure,
            share_of_budget: if total_budget > 0.0 {
                p.exposure / total_budget * 100.0
            } else {
                0.0
            },
        });

    SideSummary {
        side,
        positions: positions.len(),
        orders: positions.iter().map(|p| p.orders.len()).sum(),
        exposure,
        budget_usage,
        largest,
        hhi: herfindahl(positions.iter().map(|p| p.exposure), exposure),
    }
}

/// Sum of squared percentage shares; 0 for an empty or zero-exposure side.
pub fn herfindahl(exposures: impl Iterator<Item = f64>, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    exposures
        .map(|e| {
            let share = e / total * 100.0;
            share * share
        })
        .sum()
}
