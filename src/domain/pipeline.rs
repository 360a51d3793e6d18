//! One scoring → selection → allocation run for a single as-of date.

use crate::domain::allocation::{AllocationEngine, AllocationOutcome, BookBalance};
use crate::domain::config::TradingConfig;
use crate::domain::config_validation::validate_config;
use crate::domain::error::NeutraderError;
use crate::domain::order::{Order, Side};
use crate::domain::score::{ScoreEngine, ScoreSet};
use crate::domain::selection::{PortfolioSelector, Selection};
use crate::domain::snapshot::{IndicatorEngine, IndicatorSnapshot};
use crate::domain::summary::AllocationSummary;
use crate::domain::universe::{MarketSnapshot, SkippedSymbol};
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use tracing::{info, warn};

/// Conditions worth reporting that did not stop the run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunFlag {
    /// No benchmark row on or before the as-of date; nothing was scored.
    MissingBenchmarkData { symbol: String },
    /// `empty_side` allocated no position.
    NoViableAllocation { empty_side: Side },
}

impl fmt::Display for RunFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunFlag::MissingBenchmarkData { symbol } => {
                write!(f, "missing benchmark data for {}", symbol)
            }
            RunFlag::NoViableAllocation { empty_side } => {
                write!(f, "no viable allocation on the {} side", empty_side)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub as_of: NaiveDate,
    pub benchmark_symbol: String,
    pub benchmark_date: Option<NaiveDate>,
    pub generated_at: DateTime<Utc>,
    pub scores: ScoreSet,
    pub selection: Selection,
    pub allocation: AllocationOutcome,
    pub summary: AllocationSummary,
    pub skipped: Vec<SkippedSymbol>,
    pub flags: Vec<RunFlag>,
}

impl PipelineResult {
    pub fn orders(&self) -> Vec<Order> {
        self.allocation.orders()
    }

    pub fn has_flag(&self, flag: &RunFlag) -> bool {
        self.flags.contains(flag)
    }
}

/// The explicit date if given, else the earliest last-bar date across
/// instruments so every instrument can be scored on it. Falls back to the
/// benchmark's last date when there are no instruments.
pub fn resolve_as_of(
    explicit: Option<NaiveDate>,
    instruments: &[IndicatorSnapshot],
    benchmark: Option<&IndicatorSnapshot>,
) -> Option<NaiveDate> {
    explicit.or_else(|| {
        instruments
            .iter()
            .filter_map(|s| s.last_date())
            .min()
            .or_else(|| benchmark.and_then(|b| b.last_date()))
    })
}

pub fn run_pipeline(
    snapshot: &MarketSnapshot,
    config: &TradingConfig,
    as_of: Option<NaiveDate>,
) -> Result<PipelineResult, NeutraderError> {
    validate_config(config)?;

    let indicator_engine = IndicatorEngine::from_config(config);
    let benchmark_symbol = snapshot.benchmark_symbol.clone();

    let benchmark = if snapshot.benchmark.is_empty() {
        None
    } else {
        match indicator_engine.compute(&benchmark_symbol, &snapshot.benchmark) {
            Ok(b) => Some(b),
            Err(reason) => {
                warn!(benchmark = %benchmark_symbol, %reason, "benchmark unusable");
                None
            }
        }
    };

    let mut skipped = Vec::new();
    let mut instruments = Vec::with_capacity(snapshot.instrument_count());
    for (symbol, bars) in &snapshot.instruments {
        match indicator_engine.compute(symbol, bars) {
            Ok(s) => instruments.push(s),
            Err(reason) => {
                warn!(%symbol, %reason, "skipping instrument");
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason,
                });
            }
        }
    }

    let as_of = resolve_as_of(as_of, &instruments, benchmark.as_ref()).ok_or_else(|| {
        NeutraderError::NoData {
            symbol: benchmark_symbol.clone(),
        }
    })?;
    info!(%as_of, instruments = instruments.len(), "running pipeline");

    let mut flags = Vec::new();
    let score_engine = ScoreEngine::new(config.profile.clone());
    let scores = match score_engine.score_universe(
        benchmark.as_ref(),
        &benchmark_symbol,
        &instruments,
        as_of,
    ) {
        Ok(set) => set,
        Err(NeutraderError::MissingBenchmarkData { symbol, date }) => {
            warn!(benchmark = %symbol, %date, "no benchmark data, continuing with empty scores");
            flags.push(RunFlag::MissingBenchmarkData { symbol });
            ScoreSet::empty(as_of, &benchmark_symbol)
        }
        Err(e) => return Err(e),
    };
    skipped.extend(scores.skipped.iter().cloned());

    let selection = PortfolioSelector::from_config(config).select(&scores.scores);
    let allocation = AllocationEngine::from_config(config).allocate(&selection);
    let summary = AllocationSummary::compute(&allocation);

    match allocation.balance {
        BookBalance::SingleSided { empty_side } => {
            flags.push(RunFlag::NoViableAllocation { empty_side })
        }
        BookBalance::Empty => {
            flags.push(RunFlag::NoViableAllocation {
                empty_side: Side::Buy,
            });
            flags.push(RunFlag::NoViableAllocation {
                empty_side: Side::Sell,
            });
        }
        BookBalance::Balanced { .. } => {}
    }

    Ok(PipelineResult {
        as_of,
        benchmark_symbol,
        benchmark_date: scores.benchmark_date,
        generated_at: Utc::now(),
        scores,
        selection,
        allocation,
        summary,
        skipped,
        flags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::PriceBar;
    use crate::domain::universe::SkipReason;

    fn bars(symbol: &str, start_day: u32, closes: &[f64]) -> Vec<PriceBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                symbol: symbol.into(),
                date: NaiveDate::from_ymd_opt(2024, 3, start_day + i as u32).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 10_000,
            })
            .collect()
    }

    fn rising(n: usize, start: f64) -> Vec<f64> {
        (0..n).map(|i| start + i as f64 * 0.5).collect()
    }

    /// Drifts by `step` every two bars, ending on a new extreme with a
    /// neutral oscillator.
    fn zigzag(n: usize, start: f64, step: f64) -> Vec<f64> {
        let mut closes = vec![start];
        for i in 1..n {
            let prev = closes[i - 1];
            closes.push(if i % 2 == 1 { prev + step } else { prev - 0.6 * step });
        }
        closes
    }

    #[test]
    fn as_of_is_min_of_last_dates() {
        let engine = IndicatorEngine::from_config(&TradingConfig::default());
        let a = engine.compute("A", &bars("A", 1, &rising(5, 10.0))).unwrap();
        let b = engine.compute("B", &bars("B", 1, &rising(3, 10.0))).unwrap();
        let resolved = resolve_as_of(None, &[a.clone(), b], None);
        assert_eq!(resolved, NaiveDate::from_ymd_opt(2024, 3, 3));

        let explicit = NaiveDate::from_ymd_opt(2024, 3, 2);
        assert_eq!(resolve_as_of(explicit, &[a], None), explicit);
        assert_eq!(resolve_as_of(None, &[], None), None);
    }

    #[test]
    fn missing_benchmark_yields_empty_flagged_run() {
        let snapshot = MarketSnapshot::new("IBOV", Vec::new())
            .with_instrument("PETR4", bars("PETR4", 1, &rising(25, 30.0)));
        let result = run_pipeline(&snapshot, &TradingConfig::default(), None).unwrap();

        assert!(result.scores.scores.is_empty());
        assert!(result.orders().is_empty());
        assert!(result.has_flag(&RunFlag::MissingBenchmarkData {
            symbol: "IBOV".into()
        }));
        assert!(result.has_flag(&RunFlag::NoViableAllocation {
            empty_side: Side::Buy
        }));
    }

    #[test]
    fn bad_instruments_are_skipped() {
        let snapshot = MarketSnapshot::new("IBOV", bars("IBOV", 1, &rising(25, 100.0)))
            .with_instrument("SHORT", bars("SHORT", 25, &[10.0]))
            .with_instrument("GOOD", bars("GOOD", 1, &rising(25, 10.0)));
        let result = run_pipeline(&snapshot, &TradingConfig::default(), None).unwrap();

        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].symbol, "SHORT");
        assert_eq!(
            result.skipped[0].reason,
            SkipReason::InsufficientHistory { bars: 1 }
        );
        assert_eq!(result.scores.scores.len(), 1);
    }

    #[test]
    fn invalid_config_is_rejected_before_running() {
        let snapshot = MarketSnapshot::new("IBOV", bars("IBOV", 1, &rising(5, 100.0)));
        let config = TradingConfig::default().with_total_budget(0.0);
        let err = run_pipeline(&snapshot, &config, None).unwrap_err();
        assert!(matches!(err, NeutraderError::ConfigInvalid { .. }));
    }

    #[test]
    fn nothing_to_score_is_no_data() {
        let snapshot = MarketSnapshot::new("IBOV", Vec::new());
        let err = run_pipeline(&snapshot, &TradingConfig::default(), None).unwrap_err();
        assert!(matches!(err, NeutraderError::NoData { .. }));
    }

    #[test]
    fn balanced_run_produces_both_sides() {
        let snapshot = MarketSnapshot::new("IBOV", bars("IBOV", 1, &[100.0; 26]))
            .with_instrument("UP", bars("UP", 1, &zigzag(26, 20.0, 1.0)))
            .with_instrument("DOWN", bars("DOWN", 1, &zigzag(26, 40.0, -1.0)));
        let result = run_pipeline(&snapshot, &TradingConfig::default(), None).unwrap();

        assert!(result.flags.is_empty(), "flags: {:?}", result.flags);
        assert_eq!(result.allocation.buys.len(), 1);
        assert_eq!(result.allocation.sells.len(), 1);
        assert_eq!(result.allocation.buys[0].symbol, "UP");
        assert_eq!(result.allocation.sells[0].symbol, "DOWN");
        assert_eq!(result.benchmark_date, Some(result.as_of));
    }
}
