//! Two-stage buy/sell candidate selection.
//!
//! 1. Dynamic stage: thresholds relative to this run's best and worst score.
//! 2. Ranking: |score| descending, cheaper first, then symbol; truncated to
//!    the per-side maximum.
//! 3. Quality stage: fixed absolute cutoffs on the truncated lists.
//!
//! Truncation happens before the quality gate, so a strong candidate ranked
//! past the maximum is not pulled back in when weaker ones fail the gate.

use crate::domain::config::TradingConfig;
use crate::domain::order::Side;
use crate::domain::score::Score;
use std::cmp::Ordering;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePosition {
    pub symbol: String,
    pub side: Side,
    pub score: f64,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub buys: Vec<CandidatePosition>,
    pub sells: Vec<CandidatePosition>,
    /// Highest positive score, 0 when there is none.
    pub best_score: f64,
    /// Lowest negative score, 0 when there is none.
    pub worst_score: f64,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    /// Sizes after the dynamic stage and truncation, before the quality gate.
    pub buys_before_quality: usize,
    pub sells_before_quality: usize,
}

impl Selection {
    pub fn candidates(&self, side: Side) -> &[CandidatePosition] {
        match side {
            Side::Buy => &self.buys,
            Side::Sell => &self.sells,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buys.is_empty() && self.sells.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct PortfolioSelector {
    pub dynamic_margin: f64,
    pub max_position_per_side: usize,
    pub buy_quality_threshold: f64,
    pub sell_quality_threshold: f64,
}

impl PortfolioSelector {
    pub fn from_config(config: &TradingConfig) -> Self {
        Self {
            dynamic_margin: config.dynamic_margin,
            max_position_per_side: config.max_position_per_side,
            buy_quality_threshold: config.buy_quality_threshold,
            sell_quality_threshold: config.sell_quality_threshold,
        }
    }

    pub fn select(&self, scores: &[Score]) -> Selection {
        let best_score = scores
            .iter()
            .map(|s| s.value)
            .filter(|v| *v > 0.0)
            .fold(0.0, f64::max);
        let worst_score = scores
            .iter()
            .map(|s| s.value)
            .filter(|v| *v < 0.0)
            .fold(0.0, f64::min);
        let buy_threshold = best_score - self.dynamic_margin;
        let sell_threshold = worst_score + self.dynamic_margin;

        let mut buys: Vec<CandidatePosition> = scores
            .iter()
            .filter(|s| s.value > 0.0 && s.value >= buy_threshold)
            .map(|s| candidate(s, Side::Buy))
            .collect();
        let mut sells: Vec<CandidatePosition> = scores
            .iter()
            .filter(|s| s.value < 0.0 && s.value <= sell_threshold)
            .map(|s| candidate(s, Side::Sell))
            .collect();

        buys.sort_by(rank);
        sells.sort_by(rank);
        buys.truncate(self.max_position_per_side);
        sells.truncate(self.max_position_per_side);

        let buys_before_quality = buys.len();
        let sells_before_quality = sells.len();
        buys.retain(|c| c.score >= self.buy_quality_threshold);
        sells.retain(|c| c.score <= self.sell_quality_threshold);

        info!(
            best = best_score,
            worst = worst_score,
            buy_threshold,
            sell_threshold,
            buys = buys.len(),
            sells = sells.len(),
            buys_dropped_by_quality = buys_before_quality - buys.len(),
            sells_dropped_by_quality = sells_before_quality - sells.len(),
            "selection complete"
        );

        Selection {
            buys,
            sells,
            best_score,
            worst_score,
            buy_threshold,
            sell_threshold,
            buys_before_quality,
            sells_before_quality,
        }
    }
}

fn candidate(score: &Score, side: Side) -> CandidatePosition {
    CandidatePosition {
        symbol: score.symbol.clone(),
        side,
        score: score.value,
        close: score.close,
    }
}

fn rank(a: &CandidatePosition, b: &CandidatePosition) -> Ordering {
    b.score
        .abs()
        .total_cmp(&a.score.abs())
        .then(a.close.total_cmp(&b.close))
        .then_with(|| a.symbol.cmp(&b.symbol))
}
