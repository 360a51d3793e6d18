//! Instrument universe: symbol list parsing, bar loading and skip bookkeeping.
//!
//! Every symbol is loaded independently. A failing or empty series is recorded
//! as a [`SkippedSymbol`] and never aborts its siblings.

use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::BarProvider;
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The provider returned an empty series.
    NoData,
    /// The provider failed for this symbol.
    FetchFailed { reason: String },
    /// Fewer than two observations: no return can be computed.
    InsufficientHistory { bars: usize },
    /// A close that is not a finite positive number.
    InvalidClose { date: NaiveDate },
    /// Dates out of order or duplicated.
    UnorderedDates,
    /// No bar on the scoring date.
    NoBarForDate { date: NaiveDate },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoData => write!(f, "no data"),
            SkipReason::FetchFailed { reason } => write!(f, "fetch failed: {}", reason),
            SkipReason::InsufficientHistory { bars } => {
                write!(f, "insufficient history ({} bars, need 2)", bars)
            }
            SkipReason::InvalidClose { date } => write!(f, "invalid close on {}", date),
            SkipReason::UnorderedDates => write!(f, "dates not strictly ascending"),
            SkipReason::NoBarForDate { date } => write!(f, "no bar on {}", date),
        }
    }
}

/// Bar history for one run, keyed by symbol. `BTreeMap` keeps iteration
/// order stable so repeated runs see instruments in the same order.
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    pub benchmark_symbol: String,
    pub benchmark: Vec<PriceBar>,
    pub instruments: BTreeMap<String, Vec<PriceBar>>,
}

impl MarketSnapshot {
    pub fn new(benchmark_symbol: impl Into<String>, benchmark: Vec<PriceBar>) -> Self {
        Self {
            benchmark_symbol: benchmark_symbol.into(),
            benchmark,
            instruments: BTreeMap::new(),
        }
    }

    pub fn with_instrument(mut self, symbol: impl Into<String>, bars: Vec<PriceBar>) -> Self {
        self.instruments.insert(symbol.into(), bars);
        self
    }

    pub fn instrument_count(&self) -> usize {
        self.instruments.len()
    }
}

pub struct UniverseLoad {
    pub snapshot: MarketSnapshot,
    pub skipped: Vec<SkippedSymbol>,
}

/// Pull `[end_date - lookback_days, end_date]` for the benchmark and each symbol.
///
/// A benchmark that cannot be fetched is left empty; scoring reports it as
/// missing benchmark data.
pub fn load_market_snapshot(
    provider: &dyn BarProvider,
    symbols: &[String],
    benchmark_symbol: &str,
    end_date: NaiveDate,
    lookback_days: u32,
) -> UniverseLoad {
    let start_date = end_date - Duration::days(i64::from(lookback_days));
    info!(
        symbols = symbols.len(),
        benchmark = benchmark_symbol,
        %start_date,
        %end_date,
        "loading bar history"
    );

    let benchmark = match provider.fetch_bars(benchmark_symbol, start_date, end_date) {
        Ok(bars) => bars,
        Err(e) => {
            warn!(benchmark = benchmark_symbol, error = %e, "benchmark fetch failed");
            Vec::new()
        }
    };

    let mut snapshot = MarketSnapshot::new(benchmark_symbol, benchmark);
    let mut skipped = Vec::new();

    for symbol in symbols {
        if symbol == benchmark_symbol {
            continue;
        }
        match provider.fetch_bars(symbol, start_date, end_date) {
            Ok(bars) if bars.is_empty() => {
                warn!(%symbol, "skipping: no data found");
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: SkipReason::NoData,
                });
            }
            Ok(bars) => {
                debug!(%symbol, bars = bars.len(), "loaded");
                snapshot.instruments.insert(symbol.clone(), bars);
            }
            Err(e) => {
                warn!(%symbol, error = %e, "skipping: fetch failed");
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: SkipReason::FetchFailed {
                        reason: e.to_string(),
                    },
                });
            }
        }
    }

    if !skipped.is_empty() {
        info!(
            loaded = snapshot.instrument_count(),
            requested = symbols.len(),
            "universe partially loaded"
        );
    }

    UniverseLoad { snapshot, skipped }
}
