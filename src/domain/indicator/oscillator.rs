//! RSI-style momentum oscillator.
//!
//! Up-moves and down-moves of consecutive closes are averaged over `n` changes,
//! either as a plain rolling mean or with Wilder's smoothing:
//! - Rolling: mean of the trailing `n` changes
//! - Wilder: first average is the simple mean, then avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: OSC = 100 - (100 / (1 + avg_up / avg_down))
//! If avg_down == 0: OSC = 100, or 50 when avg_up is also 0 (flat window).
//! Both smoothings follow this rule. A window without down-moves is never
//! left undefined, so it still casts an overbought vote in scoring instead
//! of the neutral 0 an undefined reading would give.
//!
//! Warmup: first n bars are None (n price changes are needed).

use crate::domain::indicator::{
    IndicatorPoint, IndicatorSeries, IndicatorType, OscillatorSmoothing,
};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_oscillator(
    bars: &[PriceBar],
    period: usize,
    smoothing: OscillatorSmoothing,
) -> IndicatorSeries {
    let mut values: Vec<IndicatorPoint> = bars
        .iter()
        .map(|b| IndicatorPoint {
            date: b.date,
            value: None,
        })
        .collect();

    if period == 0 || bars.len() <= period {
        return IndicatorSeries {
            indicator_type: IndicatorType::Oscillator(period),
            values,
        };
    }

    let (ups, downs): (Vec<f64>, Vec<f64>) = bars
        .windows(2)
        .map(|w| {
            let change = w[1].close - w[0].close;
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let n = period as f64;
    let mut avg_up = ups[..period].iter().sum::<f64>() / n;
    let mut avg_down = downs[..period].iter().sum::<f64>() / n;
    values[period].value = Some(oscillator_value(avg_up, avg_down));

    for i in (period + 1)..bars.len() {
        let change_idx = i - 1;
        match smoothing {
            OscillatorSmoothing::Rolling => {
                let start = change_idx + 1 - period;
                avg_up = ups[start..=change_idx].iter().sum::<f64>() / n;
                avg_down = downs[start..=change_idx].iter().sum::<f64>() / n;
            }
            OscillatorSmoothing::Wilder => {
                avg_up = (avg_up * (n - 1.0) + ups[change_idx]) / n;
                avg_down = (avg_down * (n - 1.0) + downs[change_idx]) / n;
            }
        }
        values[i].value = Some(oscillator_value(avg_up, avg_down));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Oscillator(period),
        values,
    }
}

fn oscillator_value(avg_up: f64, avg_down: f64) -> f64 {
    if avg_down == 0.0 {
        if avg_up == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_up / avg_down))
    }
}
