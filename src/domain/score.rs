//! Composite instrument scoring against a benchmark.
//!
//! score = relative-return component + trend component + oscillator component.
//! Each component is bounded by its weight, so the score is bounded by
//! [`ScoreProfile::bounds`]. Null inputs contribute 0.

use crate::domain::error::NeutraderError;
use crate::domain::snapshot::{IndicatorSnapshot, SnapshotRow};
use crate::domain::universe::{SkipReason, SkippedSymbol};
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// How per-EMA trend votes are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendMode {
    /// Mean of the +/-weight votes: the component stays within +/-weight.
    Averaged,
    /// Sum of the votes: the component grows with the number of EMAs.
    Additive,
}

/// Direction of the oscillator component at the extremes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscillatorBias {
    /// Overbought is bearish, oversold is bullish.
    Contrarian,
    /// Overbought is bullish, oversold is bearish.
    Momentum,
}

impl OscillatorBias {
    fn sign(self) -> f64 {
        match self {
            OscillatorBias::Contrarian => -1.0,
            OscillatorBias::Momentum => 1.0,
        }
    }
}

impl FromStr for TrendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "averaged" | "average" | "mean" => Ok(TrendMode::Averaged),
            "additive" | "sum" => Ok(TrendMode::Additive),
            other => Err(format!("unknown trend mode '{other}'")),
        }
    }
}

impl FromStr for OscillatorBias {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "contrarian" => Ok(OscillatorBias::Contrarian),
            "momentum" => Ok(OscillatorBias::Momentum),
            other => Err(format!("unknown oscillator bias '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreProfile {
    pub name: String,
    pub relative_return_weight: f64,
    pub trend_weight: f64,
    pub trend_mode: TrendMode,
    pub oscillator_weight: f64,
    pub oscillator_bias: OscillatorBias,
    pub overbought: f64,
    pub oversold: f64,
}

impl ScoreProfile {
    /// Trend averaged across EMAs, contrarian oscillator at 70/30.
    pub fn averaged() -> Self {
        Self {
            name: "averaged".into(),
            relative_return_weight: 1.0,
            trend_weight: 1.0,
            trend_mode: TrendMode::Averaged,
            oscillator_weight: 0.75,
            oscillator_bias: OscillatorBias::Contrarian,
            overbought: 70.0,
            oversold: 30.0,
        }
    }

    /// Quarter point per EMA, momentum oscillator at 65/35.
    pub fn per_ema() -> Self {
        Self {
            name: "per_ema".into(),
            relative_return_weight: 1.0,
            trend_weight: 0.25,
            trend_mode: TrendMode::Additive,
            oscillator_weight: 0.25,
            oscillator_bias: OscillatorBias::Momentum,
            overbought: 65.0,
            oversold: 35.0,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "averaged" => Some(Self::averaged()),
            "per_ema" | "per-ema" => Some(Self::per_ema()),
            _ => None,
        }
    }

    /// Lowest and highest score reachable with `ema_count` EMAs.
    pub fn bounds(&self, ema_count: usize) -> (f64, f64) {
        let trend = match self.trend_mode {
            TrendMode::Averaged => self.trend_weight,
            TrendMode::Additive => self.trend_weight * ema_count as f64,
        };
        let max = self.relative_return_weight + trend + self.oscillator_weight;
        (-max, max)
    }
}

impl Default for ScoreProfile {
    fn default() -> Self {
        Self::averaged()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreComponents {
    pub relative_return: f64,
    pub trend: f64,
    pub oscillator: f64,
}

impl ScoreComponents {
    pub fn total(&self) -> f64 {
        self.relative_return + self.trend + self.oscillator
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub symbol: String,
    pub date: NaiveDate,
    pub value: f64,
    pub close: f64,
    pub oscillator: Option<f64>,
    pub period_return: Option<f64>,
    pub excess_return: Option<f64>,
    pub components: ScoreComponents,
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:+.2} @ {:.2}", self.symbol, self.value, self.close)
    }
}

/// All scores for one date, sorted by symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSet {
    pub date: NaiveDate,
    pub benchmark_symbol: String,
    /// Date of the benchmark row actually used; may precede `date`.
    pub benchmark_date: Option<NaiveDate>,
    pub benchmark_return: f64,
    pub scores: Vec<Score>,
    pub skipped: Vec<SkippedSymbol>,
}

impl ScoreSet {
    pub fn empty(date: NaiveDate, benchmark_symbol: &str) -> Self {
        Self {
            date,
            benchmark_symbol: benchmark_symbol.to_string(),
            benchmark_date: None,
            benchmark_return: 0.0,
            scores: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&Score> {
        self.scores.iter().find(|s| s.symbol == symbol)
    }
}

#[derive(Debug, Clone)]
pub struct ScoreEngine {
    profile: ScoreProfile,
}

impl ScoreEngine {
    pub fn new(profile: ScoreProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &ScoreProfile {
        &self.profile
    }

    pub fn components(&self, row: &SnapshotRow, benchmark_return: f64) -> ScoreComponents {
        let p = &self.profile;

        let relative_return = match row.period_return {
            Some(r) if r > benchmark_return && r > 0.0 => p.relative_return_weight,
            Some(r) if r < benchmark_return && r < 0.0 => -p.relative_return_weight,
            _ => 0.0,
        };

        let votes: Vec<f64> = row
            .emas
            .iter()
            .filter_map(|e| e.value)
            .map(|ema| {
                if row.close > ema {
                    p.trend_weight
                } else {
                    -p.trend_weight
                }
            })
            .collect();
        let trend = if votes.is_empty() {
            0.0
        } else {
            let sum: f64 = votes.iter().sum();
            match p.trend_mode {
                TrendMode::Averaged => sum / votes.len() as f64,
                TrendMode::Additive => sum,
            }
        };

        let bias = p.oscillator_bias.sign();
        let oscillator = match row.oscillator {
            Some(v) if v > p.overbought => bias * p.oscillator_weight,
            Some(v) if v < p.oversold => -bias * p.oscillator_weight,
            _ => 0.0,
        };

        ScoreComponents {
            relative_return,
            trend,
            oscillator,
        }
    }

    pub fn score_row(&self, symbol: &str, row: &SnapshotRow, benchmark_return: f64) -> Score {
        let components = self.components(row, benchmark_return);
        Score {
            symbol: symbol.to_string(),
            date: row.date,
            value: components.total(),
            close: row.close,
            oscillator: row.oscillator,
            period_return: row.period_return,
            excess_return: row.period_return.map(|r| r - benchmark_return),
            components,
        }
    }

    /// Score every instrument that has a row on `date`.
    ///
    /// The benchmark row is the one on `date` or the latest before it. With no
    /// such row this fails with [`NeutraderError::MissingBenchmarkData`].
    pub fn score_universe(
        &self,
        benchmark: Option<&IndicatorSnapshot>,
        benchmark_symbol: &str,
        instruments: &[IndicatorSnapshot],
        date: NaiveDate,
    ) -> Result<ScoreSet, NeutraderError> {
        let benchmark_row = benchmark
            .and_then(|b| b.row_on_or_before(date))
            .ok_or_else(|| NeutraderError::MissingBenchmarkData {
                symbol: benchmark_symbol.to_string(),
                date,
            })?;
        let benchmark_return = benchmark_row.period_return.unwrap_or(0.0);
        if benchmark_row.date != date {
            debug!(
                benchmark = benchmark_symbol,
                used = %benchmark_row.date,
                %date,
                "benchmark has no row on scoring date, using latest prior"
            );
        }

        let mut scores = Vec::with_capacity(instruments.len());
        let mut skipped = Vec::new();
        for snapshot in instruments {
            match snapshot.row_at(date) {
                Some(row) => {
                    let score = self.score_row(&snapshot.symbol, row, benchmark_return);
                    debug!(symbol = %score.symbol, score = score.value, "scored");
                    scores.push(score);
                }
                None => skipped.push(SkippedSymbol {
                    symbol: snapshot.symbol.clone(),
                    reason: SkipReason::NoBarForDate { date },
                }),
            }
        }
        scores.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        info!(
            %date,
            scored = scores.len(),
            skipped = skipped.len(),
            benchmark_return,
            "scoring complete"
        );

        Ok(ScoreSet {
            date,
            benchmark_symbol: benchmark_symbol.to_string(),
            benchmark_date: Some(benchmark_row.date),
            benchmark_return,
            scores,
            skipped,
        })
    }
}
