//! Technical indicator implementations.
//!
//! Every series is aligned one-to-one with the bars it was computed from:
//! - `IndicatorPoint`: a single dated value, `None` while the indicator warms up
//! - `IndicatorType`: indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: a time series of indicator values

pub mod ema;
pub mod oscillator;
pub mod returns;

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Ema(usize),
    Oscillator(usize),
    Return,
}

/// How the oscillator averages up-moves and down-moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OscillatorSmoothing {
    /// Simple mean over the trailing window.
    #[default]
    Rolling,
    /// Simple mean seed, then `(prev * (n - 1) + x) / n`.
    Wilder,
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).and_then(|p| p.value)
    }

    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|p| p.value.is_some()).count()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Oscillator(period) => write!(f, "OSC({})", period),
            IndicatorType::Return => write!(f, "RETURN"),
        }
    }
}

impl std::str::FromStr for OscillatorSmoothing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rolling" | "simple" => Ok(OscillatorSmoothing::Rolling),
            "wilder" => Ok(OscillatorSmoothing::Wilder),
            other => Err(format!("unknown oscillator smoothing '{other}'")),
        }
    }
}
