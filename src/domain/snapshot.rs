//! Per-instrument indicator snapshot and the engine that builds it.
//!
//! An [`IndicatorSnapshot`] holds one [`SnapshotRow`] per bar with the close,
//! the period return, one EMA reading per configured period and the
//! oscillator. Indicators that have not warmed up yet are `None`.

use crate::domain::config::TradingConfig;
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::oscillator::calculate_oscillator;
use crate::domain::indicator::returns::calculate_returns;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, OscillatorSmoothing};
use crate::domain::ohlcv::{is_strictly_ascending, PriceBar};
use crate::domain::universe::SkipReason;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::debug;

pub const MIN_OBSERVATIONS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmaReading {
    pub period: usize,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub date: NaiveDate,
    pub close: f64,
    pub period_return: Option<f64>,
    pub emas: Vec<EmaReading>,
    pub oscillator: Option<f64>,
}

impl SnapshotRow {
    pub fn ema(&self, period: usize) -> Option<f64> {
        self.emas
            .iter()
            .find(|e| e.period == period)
            .and_then(|e| e.value)
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSnapshot {
    pub symbol: String,
    pub rows: Vec<SnapshotRow>,
    date_index: HashMap<NaiveDate, usize>,
}

impl IndicatorSnapshot {
    pub fn new(symbol: String, rows: Vec<SnapshotRow>) -> Self {
        let date_index = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.date, i))
            .collect();
        Self {
            symbol,
            rows,
            date_index,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_at(&self, date: NaiveDate) -> Option<&SnapshotRow> {
        self.date_index.get(&date).map(|&i| &self.rows[i])
    }

    /// Row at `date`, or the most recent row before it.
    pub fn row_on_or_before(&self, date: NaiveDate) -> Option<&SnapshotRow> {
        let idx = self.rows.partition_point(|r| r.date <= date);
        idx.checked_sub(1).map(|i| &self.rows[i])
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    /// Indicators still warming up on the last row.
    pub fn missing_on_last_row(&self) -> Vec<IndicatorType> {
        let Some(row) = self.rows.last() else {
            return Vec::new();
        };
        let mut missing: Vec<IndicatorType> = row
            .emas
            .iter()
            .filter(|e| e.value.is_none())
            .map(|e| IndicatorType::Ema(e.period))
            .collect();
        if row.oscillator.is_none() {
            missing.push(IndicatorType::Oscillator(0));
        }
        if row.period_return.is_none() {
            missing.push(IndicatorType::Return);
        }
        missing
    }
}

/// Derives EMA, oscillator and return series from close prices.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    ema_periods: Vec<usize>,
    oscillator_period: usize,
    smoothing: OscillatorSmoothing,
}

impl IndicatorEngine {
    pub fn new(
        ema_periods: Vec<usize>,
        oscillator_period: usize,
        smoothing: OscillatorSmoothing,
    ) -> Self {
        Self {
            ema_periods,
            oscillator_period,
            smoothing,
        }
    }

    pub fn from_config(config: &TradingConfig) -> Self {
        Self::new(
            config.ema_periods.clone(),
            config.oscillator_period,
            config.oscillator_smoothing,
        )
    }

    /// Every configured indicator as a series aligned with `bars`.
    pub fn series(&self, bars: &[PriceBar]) -> HashMap<IndicatorType, IndicatorSeries> {
        let mut result = HashMap::new();
        for &period in &self.ema_periods {
            result.insert(IndicatorType::Ema(period), calculate_ema(bars, period));
        }
        result.insert(
            IndicatorType::Oscillator(self.oscillator_period),
            calculate_oscillator(bars, self.oscillator_period, self.smoothing),
        );
        result.insert(IndicatorType::Return, calculate_returns(bars));
        result
    }

    /// Build the snapshot for one instrument, or the reason it has none.
    pub fn compute(&self, symbol: &str, bars: &[PriceBar]) -> Result<IndicatorSnapshot, SkipReason> {
        if bars.len() < MIN_OBSERVATIONS {
            return Err(SkipReason::InsufficientHistory { bars: bars.len() });
        }
        if let Some(bad) = bars.iter().find(|b| !b.has_usable_close()) {
            return Err(SkipReason::InvalidClose { date: bad.date });
        }
        if !is_strictly_ascending(bars) {
            return Err(SkipReason::UnorderedDates);
        }

        let series = self.series(bars);
        let returns = &series[&IndicatorType::Return];
        let oscillator = &series[&IndicatorType::Oscillator(self.oscillator_period)];
        let emas: Vec<(usize, &IndicatorSeries)> = self
            .ema_periods
            .iter()
            .map(|&p| (p, &series[&IndicatorType::Ema(p)]))
            .collect();

        let rows = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| SnapshotRow {
                date: bar.date,
                close: bar.close,
                period_return: returns.value_at(i),
                emas: emas
                    .iter()
                    .map(|(period, s)| EmaReading {
                        period: *period,
                        value: s.value_at(i),
                    })
                    .collect(),
                oscillator: oscillator.value_at(i),
            })
            .collect();

        let snapshot = IndicatorSnapshot::new(symbol.to_string(), rows);
        let missing = snapshot.missing_on_last_row();
        if !missing.is_empty() {
            debug!(
                symbol,
                bars = bars.len(),
                missing = missing.len(),
                "indicators degraded by short history"
            );
        }
        Ok(snapshot)
    }
}
