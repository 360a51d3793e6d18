#![allow(dead_code)]

use chrono::NaiveDate;
use neutrader::domain::error::NeutraderError;
pub use neutrader::domain::ohlcv::PriceBar;
use neutrader::ports::data_port::BarProvider;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub struct MockBarProvider {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockBarProvider {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl BarProvider for MockBarProvider {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, NeutraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(NeutraderError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, NeutraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(symbol: &str, date: &str, close: f64) -> PriceBar {
    PriceBar {
        symbol: symbol.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        volume: 100_000,
    }
}

/// One bar per calendar day from `start_date`.
pub fn bars_from_closes(symbol: &str, start_date: &str, closes: &[f64]) -> Vec<PriceBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            symbol: symbol.to_string(),
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 100_000,
        })
        .collect()
}

pub fn flat(n: usize, price: f64) -> Vec<f64> {
    vec![price; n]
}

/// Steady decline: below every EMA with an oversold oscillator, which the
/// default profile scores at -1.25.
pub fn sliding(n: usize, start: f64, step: f64) -> Vec<f64> {
    (0..n).map(|i| start - step * i as f64).collect()
}

/// Drifts by `step` every two bars. With an even `n` the series ends on a
/// new extreme while the oscillator stays between the default thresholds,
/// scoring +2 (rising) or -2 (falling) against a flat benchmark.
pub fn zigzag(n: usize, start: f64, step: f64) -> Vec<f64> {
    let mut closes = vec![start];
    for i in 1..n {
        let prev = closes[i - 1];
        closes.push(if i % 2 == 1 {
            prev + step
        } else {
            prev - 0.6 * step
        });
    }
    closes
}

pub fn write_csv(dir: &Path, symbol: &str, bars: &[PriceBar]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date, b.open, b.high, b.low, b.close, b.volume
        ));
    }
    fs::write(dir.join(format!("{}.csv", symbol)), content).unwrap();
}

pub const START: &str = "2024-03-01";
pub const BARS: usize = 26;

/// Flat benchmark, two rising names, two falling names and one weak name.
pub fn sample_provider() -> MockBarProvider {
    MockBarProvider::new()
        .with_bars("IBOV", bars_from_closes("IBOV", START, &flat(BARS, 100.0)))
        .with_bars("PETR4", bars_from_closes("PETR4", START, &zigzag(BARS, 20.0, 1.0)))
        .with_bars("VALE3", bars_from_closes("VALE3", START, &zigzag(BARS, 60.0, 1.0)))
        .with_bars("ITUB4", bars_from_closes("ITUB4", START, &zigzag(BARS, 40.0, -1.0)))
        .with_bars("BBDC4", bars_from_closes("BBDC4", START, &zigzag(BARS, 30.0, -1.0)))
        .with_bars("WEGE3", bars_from_closes("WEGE3", START, &sliding(BARS, 35.0, 0.1)))
}

pub fn sample_symbols() -> Vec<String> {
    ["PETR4", "VALE3", "ITUB4", "BBDC4", "WEGE3"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn last_date() -> NaiveDate {
    date(2024, 3, 26)
}
