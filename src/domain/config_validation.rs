//! Configuration validation.
//!
//! Range checks on a parsed [`TradingConfig`], run before any scoring starts.

use crate::domain::config::TradingConfig;
use crate::domain::error::NeutraderError;
use std::collections::HashSet;

pub fn validate_config(config: &TradingConfig) -> Result<(), NeutraderError> {
    validate_budget(config)?;
    validate_exposure(config)?;
    validate_max_positions(config)?;
    validate_lookback(config)?;
    validate_lot_sizes(config)?;
    validate_price_break(config)?;
    validate_price_levels(config)?;
    validate_ema_periods(config)?;
    validate_oscillator(config)?;
    validate_weights(config)?;
    validate_selection(config)?;
    Ok(())
}

fn validate_budget(config: &TradingConfig) -> Result<(), NeutraderError> {
    if !(config.total_budget.is_finite() && config.total_budget > 0.0) {
        return Err(NeutraderError::invalid(
            "model",
            "total_budget",
            "total_budget must be positive",
        ));
    }
    Ok(())
}

fn validate_exposure(config: &TradingConfig) -> Result<(), NeutraderError> {
    let target = config.target_exposure_per_position;
    if !(target.is_finite() && target > 0.0) {
        return Err(NeutraderError::invalid(
            "model",
            "target_exposure_per_position",
            "target_exposure_per_position must be positive",
        ));
    }
    let fraction = config.max_exposure_fraction;
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(NeutraderError::invalid(
            "model",
            "max_exposure_fraction",
            "max_exposure_fraction must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_max_positions(config: &TradingConfig) -> Result<(), NeutraderError> {
    if config.max_position_per_side < 1 {
        return Err(NeutraderError::invalid(
            "model",
            "max_position_per_side",
            "max_position_per_side must be at least 1",
        ));
    }
    Ok(())
}

fn validate_lookback(config: &TradingConfig) -> Result<(), NeutraderError> {
    if config.lookback_days < 1 {
        return Err(NeutraderError::invalid(
            "model",
            "lookback_days",
            "lookback_days must be at least 1",
        ));
    }
    Ok(())
}

fn validate_lot_sizes(config: &TradingConfig) -> Result<(), NeutraderError> {
    if config.lot_size_normal == 0 {
        return Err(NeutraderError::invalid(
            "execution",
            "lot_size_normal",
            "lot_size_normal must be positive",
        ));
    }
    if config.lot_size_expensive == 0 {
        return Err(NeutraderError::invalid(
            "execution",
            "lot_size_expensive",
            "lot_size_expensive must be positive",
        ));
    }
    Ok(())
}

fn validate_price_break(config: &TradingConfig) -> Result<(), NeutraderError> {
    if !(config.price_break.is_finite() && config.price_break >= 0.0) {
        return Err(NeutraderError::invalid(
            "execution",
            "price_break",
            "price_break must be non-negative",
        ));
    }
    if config.price_precision > 8 {
        return Err(NeutraderError::invalid(
            "execution",
            "price_precision",
            "price_precision must be at most 8",
        ));
    }
    Ok(())
}

fn validate_price_levels(config: &TradingConfig) -> Result<(), NeutraderError> {
    let levels = &config.price_levels;
    if levels.is_empty() {
        return Err(NeutraderError::invalid(
            "execution",
            "price_levels",
            "at least one price level is required",
        ));
    }
    let market_count = levels.iter().filter(|l| l.is_market).count();
    if market_count > 1 {
        return Err(NeutraderError::invalid(
            "execution",
            "price_levels",
            "at most one market level is allowed",
        ));
    }
    if market_count == 1 && !levels[0].is_market {
        return Err(NeutraderError::invalid(
            "execution",
            "price_levels",
            "the market level must come first",
        ));
    }
    if let Some(bad) = levels
        .iter()
        .find(|l| !l.is_market && !(l.offset.is_finite() && (0.0..1.0).contains(&l.offset)))
    {
        return Err(NeutraderError::invalid(
            "execution",
            "price_levels",
            format!("offset {} must be in [0, 1)", bad.offset),
        ));
    }
    Ok(())
}

fn validate_ema_periods(config: &TradingConfig) -> Result<(), NeutraderError> {
    if config.ema_periods.is_empty() {
        return Err(NeutraderError::invalid(
            "indicators",
            "ema_periods",
            "at least one EMA period is required",
        ));
    }
    if config.ema_periods.contains(&0) {
        return Err(NeutraderError::invalid(
            "indicators",
            "ema_periods",
            "EMA periods must be positive",
        ));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = config.ema_periods.iter().find(|p| !seen.insert(**p)) {
        return Err(NeutraderError::invalid(
            "indicators",
            "ema_periods",
            format!("duplicate EMA period {dup}"),
        ));
    }
    Ok(())
}

fn validate_oscillator(config: &TradingConfig) -> Result<(), NeutraderError> {
    if config.oscillator_period == 0 {
        return Err(NeutraderError::invalid(
            "indicators",
            "oscillator_period",
            "oscillator_period must be positive",
        ));
    }
    let profile = &config.profile;
    if !(0.0..=100.0).contains(&profile.oversold) || !(0.0..=100.0).contains(&profile.overbought)
    {
        return Err(NeutraderError::invalid(
            "indicators",
            "overbought",
            "overbought and oversold must be within [0, 100]",
        ));
    }
    if profile.oversold >= profile.overbought {
        return Err(NeutraderError::invalid(
            "indicators",
            "oversold",
            "oversold must be below overbought",
        ));
    }
    Ok(())
}

fn validate_weights(config: &TradingConfig) -> Result<(), NeutraderError> {
    let p = &config.profile;
    for (key, weight) in [
        ("relative_return_weight", p.relative_return_weight),
        ("trend_weight", p.trend_weight),
        ("oscillator_weight", p.oscillator_weight),
    ] {
        if !(weight.is_finite() && weight >= 0.0) {
            return Err(NeutraderError::invalid(
                "scoring",
                key,
                format!("{key} must be non-negative"),
            ));
        }
    }
    Ok(())
}

fn validate_selection(config: &TradingConfig) -> Result<(), NeutraderError> {
    if !(config.dynamic_margin.is_finite() && config.dynamic_margin >= 0.0) {
        return Err(NeutraderError::invalid(
            "selection",
            "dynamic_margin",
            "dynamic_margin must be non-negative",
        ));
    }
    if !config.buy_quality_threshold.is_finite() {
        return Err(NeutraderError::invalid(
            "selection",
            "buy_quality_threshold",
            "buy_quality_threshold must be a number",
        ));
    }
    if !config.sell_quality_threshold.is_finite() {
        return Err(NeutraderError::invalid(
            "selection",
            "sell_quality_threshold",
            "sell_quality_threshold must be a number",
        ));
    }
    Ok(())
}
