//! Bar-history port trait.

use crate::domain::error::NeutraderError;
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDate;

/// Source of daily bar history. Implementations return bars in ascending
/// date order; an unknown symbol may yield either an error or an empty series.
pub trait BarProvider {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, NeutraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, NeutraderError>;
}
