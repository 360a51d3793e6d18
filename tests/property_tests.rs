//! Property tests for sizing, scoring and selection invariants.
//!
//! Uses proptest to verify:
//! 1. Level decomposition always sums to the position quantity in whole lots
//! 2. Price truncation never rounds up by more than float noise
//! 3. Scores stay within the profile's bounds
//! 4. Selected candidates respect thresholds, sides and the per-side maximum
//! 5. A stricter quality gate never admits more candidates
//! 6. Allocation stays within the side budget and the per-instrument target

use chrono::NaiveDate;
use neutrader::domain::allocation::{decompose_levels, truncate_price, AllocationEngine};
use neutrader::domain::config::{PriceLevel, TradingConfig};
use neutrader::domain::order::Side;
use neutrader::domain::score::{Score, ScoreComponents, ScoreEngine, ScoreProfile};
use neutrader::domain::selection::PortfolioSelector;
use neutrader::domain::snapshot::{EmaReading, SnapshotRow};
use proptest::prelude::*;

// ── Strategies ───────────────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (0.5..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_scores() -> impl Strategy<Value = Vec<Score>> {
    prop::collection::vec((-2.75..2.75_f64, arb_price()), 0..30).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (value, close))| Score {
                symbol: format!("S{:03}", i),
                date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
                value: (value * 4.0).round() / 4.0,
                close,
                oscillator: None,
                period_return: None,
                excess_return: None,
                components: ScoreComponents::default(),
            })
            .collect()
    })
}

fn arb_row() -> impl Strategy<Value = SnapshotRow> {
    (
        arb_price(),
        prop::option::of(-0.2..0.2_f64),
        prop::collection::vec(prop::option::of(arb_price()), 1..8),
        prop::option::of(0.0..100.0_f64),
    )
        .prop_map(|(close, period_return, emas, oscillator)| SnapshotRow {
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            close,
            period_return,
            emas: emas
                .into_iter()
                .enumerate()
                .map(|(i, value)| EmaReading {
                    period: (i + 1) * 3,
                    value,
                })
                .collect(),
            oscillator,
        })
}

fn selector(margin: f64, max: usize, quality: f64) -> PortfolioSelector {
    PortfolioSelector {
        dynamic_margin: margin,
        max_position_per_side: max,
        buy_quality_threshold: quality,
        sell_quality_threshold: -quality,
    }
}

// ── 1. Level decomposition ───────────────────────────────────────────

proptest! {
    #[test]
    fn decomposition_sums_to_quantity(
        lots in 0u64..500,
        lot in prop::sample::select(vec![1u64, 10, 100, 1000]),
        levels in 1usize..8,
    ) {
        let quantity = lots * lot;
        let split = decompose_levels(quantity, lot, levels);

        prop_assert_eq!(split.len(), levels);
        prop_assert_eq!(split.iter().sum::<u64>(), quantity);
        for qty in &split {
            prop_assert_eq!(qty % lot, 0);
        }
        // level 0 carries the remainder, so it is never smaller
        for qty in &split[1..] {
            prop_assert!(split[0] >= *qty);
        }
    }
}

// ── 2. Price truncation ──────────────────────────────────────────────

proptest! {
    #[test]
    fn truncation_never_exceeds_value(value in 0.01..1000.0_f64, precision in 0u32..5) {
        let truncated = truncate_price(value, precision);
        let step = 10f64.powi(-(precision as i32));

        prop_assert!(truncated <= value + 1e-9);
        prop_assert!(value - truncated < step + 1e-6);
    }
}

// ── 3. Score bounds ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn averaged_scores_within_bounds(row in arb_row(), bench in -0.2..0.2_f64) {
        let engine = ScoreEngine::new(ScoreProfile::averaged());
        let score = engine.score_row("X", &row, bench);
        let (low, high) = engine.profile().bounds(row.emas.len());

        prop_assert!(score.value >= low - 1e-12);
        prop_assert!(score.value <= high + 1e-12);
        prop_assert!((score.value - score.components.total()).abs() < 1e-12);
    }

    #[test]
    fn per_ema_scores_within_bounds(row in arb_row(), bench in -0.2..0.2_f64) {
        let engine = ScoreEngine::new(ScoreProfile::per_ema());
        let score = engine.score_row("X", &row, bench);
        let (low, high) = engine.profile().bounds(row.emas.len());

        prop_assert!(score.value >= low - 1e-12);
        prop_assert!(score.value <= high + 1e-12);
    }
}

// ── 4/5. Selection ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn selection_respects_thresholds(
        scores in arb_scores(),
        margin in 0.0..3.0_f64,
        max in 1usize..10,
        quality in 0.0..2.5_f64,
    ) {
        let selection = selector(margin, max, quality).select(&scores);

        prop_assert!(selection.buys.len() <= max);
        prop_assert!(selection.sells.len() <= max);
        for c in &selection.buys {
            prop_assert_eq!(c.side, Side::Buy);
            prop_assert!(c.score > 0.0);
            prop_assert!(c.score >= selection.buy_threshold);
            prop_assert!(c.score >= quality);
        }
        for c in &selection.sells {
            prop_assert_eq!(c.side, Side::Sell);
            prop_assert!(c.score < 0.0);
            prop_assert!(c.score <= selection.sell_threshold);
            prop_assert!(c.score <= -quality);
        }
        for pair in selection.buys.windows(2) {
            prop_assert!(pair[0].score.abs() >= pair[1].score.abs());
        }
    }

    #[test]
    fn stricter_quality_gate_never_admits_more(
        scores in arb_scores(),
        low in 0.0..2.0_f64,
        extra in 0.0..1.0_f64,
    ) {
        let loose = selector(0.5, 15, low).select(&scores);
        let strict = selector(0.5, 15, low + extra).select(&scores);

        prop_assert!(strict.buys.len() <= loose.buys.len());
        prop_assert!(strict.sells.len() <= loose.sells.len());
        for c in &strict.buys {
            prop_assert!(loose.buys.iter().any(|l| l.symbol == c.symbol));
        }
    }
}

// ── 6. Allocation ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn allocation_stays_within_budget(
        scores in arb_scores(),
        budget in 10_000.0..500_000.0_f64,
        target in 1_000.0..50_000.0_f64,
    ) {
        let config = TradingConfig {
            total_budget: budget,
            target_exposure_per_position: target,
            price_levels: vec![PriceLevel::market(), PriceLevel::limit(0.01)],
            ..TradingConfig::default()
        };
        let selection = PortfolioSelector::from_config(&config).select(&scores);
        let outcome = AllocationEngine::from_config(&config).allocate(&selection);

        prop_assert!(outcome.exposure(Side::Buy) <= config.side_budget() + 1e-6);
        prop_assert!(outcome.exposure(Side::Sell) <= config.side_budget() + 1e-6);
        if !outcome.buys.is_empty() && !outcome.sells.is_empty() {
            prop_assert_eq!(outcome.buys.len(), outcome.sells.len());
        }
        for p in outcome.buys.iter().chain(&outcome.sells) {
            prop_assert!(p.exposure <= config.position_target() + 1e-6);
            prop_assert_eq!(p.quantity % p.lot, 0);
            prop_assert!(p.quantity >= p.lot);
            prop_assert_eq!(p.ordered_quantity(), p.quantity);
        }
    }
}
