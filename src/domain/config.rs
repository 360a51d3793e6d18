//! Typed, immutable run configuration.
//!
//! [`TradingConfig::from_port`] reads every key with its default and rejects
//! values that cannot be parsed; range checks live in `config_validation`.

use crate::domain::error::NeutraderError;
use crate::domain::indicator::OscillatorSmoothing;
use crate::domain::order::Side;
use crate::domain::score::ScoreProfile;
use crate::ports::config_port::ConfigPort;
use std::str::FromStr;

/// One rung of the order ladder. Offsets are magnitudes; the side decides
/// their direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceLevel {
    pub offset: f64,
    pub is_market: bool,
}

impl PriceLevel {
    pub fn market() -> Self {
        Self {
            offset: 0.0,
            is_market: true,
        }
    }

    pub fn limit(offset: f64) -> Self {
        Self {
            offset,
            is_market: false,
        }
    }

    /// Buys bid below the close, sells offer above it.
    pub fn signed_offset(&self, side: Side) -> f64 {
        match side {
            Side::Buy => -self.offset,
            Side::Sell => self.offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradingConfig {
    // [model]
    pub max_position_per_side: usize,
    pub total_budget: f64,
    pub lookback_days: u32,
    pub max_exposure_fraction: f64,
    pub target_exposure_per_position: f64,
    // [execution]
    pub lot_size_normal: u64,
    pub lot_size_expensive: u64,
    pub price_break: f64,
    pub price_precision: u32,
    pub price_levels: Vec<PriceLevel>,
    // [indicators]
    pub ema_periods: Vec<usize>,
    pub oscillator_period: usize,
    pub oscillator_smoothing: OscillatorSmoothing,
    // [scoring], with overbought/oversold from [indicators]
    pub profile: ScoreProfile,
    // [selection]
    pub dynamic_margin: f64,
    pub buy_quality_threshold: f64,
    pub sell_quality_threshold: f64,
    // [universe]
    pub benchmark: Option<String>,
    pub symbols: Option<Vec<String>>,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            max_position_per_side: 15,
            total_budget: 100_000.0,
            lookback_days: 60,
            max_exposure_fraction: 0.30,
            target_exposure_per_position: 15_000.0,
            lot_size_normal: 100,
            lot_size_expensive: 10,
            price_break: 50.0,
            price_precision: 2,
            price_levels: vec![
                PriceLevel::market(),
                PriceLevel::limit(0.005),
                PriceLevel::limit(0.01),
                PriceLevel::limit(0.015),
            ],
            ema_periods: vec![3, 5, 10, 15, 20],
            oscillator_period: 10,
            oscillator_smoothing: OscillatorSmoothing::Rolling,
            profile: ScoreProfile::averaged(),
            dynamic_margin: 0.5,
            buy_quality_threshold: 1.5,
            sell_quality_threshold: -1.5,
            benchmark: None,
            symbols: None,
        }
    }
}

impl TradingConfig {
    pub fn from_port(port: &dyn ConfigPort) -> Result<Self, NeutraderError> {
        let d = Self::default();

        let profile_name = port
            .get_string("scoring", "profile")
            .unwrap_or_else(|| d.profile.name.clone());
        let mut profile = ScoreProfile::from_name(&profile_name).ok_or_else(|| {
            NeutraderError::invalid(
                "scoring",
                "profile",
                format!("unknown profile '{profile_name}' (expected averaged or per_ema)"),
            )
        })?;
        profile.relative_return_weight = read_parsed(
            port,
            "scoring",
            "relative_return_weight",
            profile.relative_return_weight,
        )?;
        profile.trend_weight = read_parsed(port, "scoring", "trend_weight", profile.trend_weight)?;
        profile.trend_mode = read_parsed(port, "scoring", "trend_mode", profile.trend_mode)?;
        profile.oscillator_weight =
            read_parsed(port, "scoring", "oscillator_weight", profile.oscillator_weight)?;
        profile.oscillator_bias =
            read_parsed(port, "scoring", "oscillator_bias", profile.oscillator_bias)?;
        profile.overbought = read_parsed(port, "indicators", "overbought", profile.overbought)?;
        profile.oversold = read_parsed(port, "indicators", "oversold", profile.oversold)?;

        let price_levels = match port.get_string("execution", "price_levels") {
            Some(raw) => parse_price_levels(&raw)?,
            None => d.price_levels,
        };
        let ema_periods = match port.get_string("indicators", "ema_periods") {
            Some(raw) => parse_periods(&raw)?,
            None => d.ema_periods,
        };

        let benchmark = port
            .get_string("universe", "benchmark")
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty());
        let symbols = port
            .get_list("universe", "symbols")
            .filter(|list| !list.is_empty());

        Ok(Self {
            max_position_per_side: read_parsed(
                port,
                "model",
                "max_position_per_side",
                d.max_position_per_side,
            )?,
            total_budget: read_parsed(port, "model", "total_budget", d.total_budget)?,
            lookback_days: read_parsed(port, "model", "lookback_days", d.lookback_days)?,
            max_exposure_fraction: read_parsed(
                port,
                "model",
                "max_exposure_fraction",
                d.max_exposure_fraction,
            )?,
            target_exposure_per_position: read_parsed(
                port,
                "model",
                "target_exposure_per_position",
                d.target_exposure_per_position,
            )?,
            lot_size_normal: read_parsed(port, "execution", "lot_size_normal", d.lot_size_normal)?,
            lot_size_expensive: read_parsed(
                port,
                "execution",
                "lot_size_expensive",
                d.lot_size_expensive,
            )?,
            price_break: read_parsed(port, "execution", "price_break", d.price_break)?,
            price_precision: read_parsed(port, "execution", "price_precision", d.price_precision)?,
            price_levels,
            ema_periods,
            oscillator_period: read_parsed(
                port,
                "indicators",
                "oscillator_period",
                d.oscillator_period,
            )?,
            oscillator_smoothing: read_parsed(
                port,
                "indicators",
                "oscillator_smoothing",
                d.oscillator_smoothing,
            )?,
            profile,
            dynamic_margin: read_parsed(port, "selection", "dynamic_margin", d.dynamic_margin)?,
            buy_quality_threshold: read_parsed(
                port,
                "selection",
                "buy_quality_threshold",
                d.buy_quality_threshold,
            )?,
            sell_quality_threshold: read_parsed(
                port,
                "selection",
                "sell_quality_threshold",
                d.sell_quality_threshold,
            )?,
            benchmark,
            symbols,
        })
    }

    pub fn with_total_budget(mut self, total_budget: f64) -> Self {
        self.total_budget = total_budget;
        self
    }

    /// Half the total budget goes to each side.
    pub fn side_budget(&self) -> f64 {
        self.total_budget / 2.0
    }

    pub fn per_instrument_cap(&self) -> f64 {
        self.side_budget() * self.max_exposure_fraction
    }

    /// Exposure each accepted position aims for, never above the cap.
    pub fn position_target(&self) -> f64 {
        self.target_exposure_per_position.min(self.per_instrument_cap())
    }

    pub fn lot_rule(&self) -> LotRule {
        LotRule {
            normal: self.lot_size_normal,
            expensive: self.lot_size_expensive,
            price_break: self.price_break,
        }
    }
}

/// Board lot by price: the small lot applies strictly above `price_break`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LotRule {
    pub normal: u64,
    pub expensive: u64,
    pub price_break: f64,
}

impl LotRule {
    pub fn lot_for(&self, price: f64) -> u64 {
        if price > self.price_break {
            self.expensive
        } else {
            self.normal
        }
    }
}

/// Read `[section] key` as `T`, falling back to `default` when absent.
fn read_parsed<T>(
    port: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, NeutraderError>
where
    T: FromStr,
    T::Err: ToString,
{
    match port.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|e| {
            NeutraderError::invalid(
                section,
                key,
                format!("cannot parse '{}': {}", raw.trim(), e.to_string()),
            )
        }),
    }
}

/// Parse `"market,0.005,0.01"` into a ladder. Validation of where the market
/// level may appear happens later.
pub fn parse_price_levels(raw: &str) -> Result<Vec<PriceLevel>, NeutraderError> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|token| {
            if token.eq_ignore_ascii_case("market") {
                Ok(PriceLevel::market())
            } else {
                token.parse::<f64>().map(PriceLevel::limit).map_err(|_| {
                    NeutraderError::invalid(
                        "execution",
                        "price_levels",
                        format!("'{token}' is neither 'market' nor an offset"),
                    )
                })
            }
        })
        .collect()
}

pub fn parse_periods(raw: &str) -> Result<Vec<usize>, NeutraderError> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|token| {
            token.parse::<usize>().map_err(|_| {
                NeutraderError::invalid(
                    "indicators",
                    "ema_periods",
                    format!("'{token}' is not a period"),
                )
            })
        })
        .collect()
}
