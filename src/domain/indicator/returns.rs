//! Period-over-period return.
//!
//! R[i] = (C[i] - C[i-1]) / C[i-1], as a fraction (0.01 = 1%).
//! R[0] is None, as is any R[i] whose previous close is zero.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_returns(bars: &[PriceBar]) -> IndicatorSeries {
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorPoint {
            date: bar.date,
            value: if i == 0 {
                None
            } else {
                bar.return_since(bars[i - 1].close)
            },
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Return,
        values,
    }
}
