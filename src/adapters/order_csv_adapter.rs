//! Order ladder CSV writer implementing ReportPort.
//!
//! One row per order, buys first, in the order the allocation emitted them.

use crate::adapters::ensure_parent_dir;
use crate::domain::error::NeutraderError;
use crate::domain::order::OrderPrice;
use crate::domain::pipeline::PipelineResult;
use crate::ports::report_port::ReportPort;
use std::path::Path;
use tracing::info;

const HEADER: [&str; 9] = [
    "date", "symbol", "side", "level", "type", "price", "quantity", "exposure", "score",
];

#[derive(Default)]
pub struct OrderCsvAdapter;

impl OrderCsvAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for OrderCsvAdapter {
    fn write(&self, result: &PipelineResult, output_path: &str) -> Result<(), NeutraderError> {
        let path = Path::new(output_path);
        ensure_parent_dir(path)?;

        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(HEADER)?;

        let orders = result.orders();
        for order in &orders {
            let kind = match order.price {
                OrderPrice::Market { .. } => "MARKET",
                OrderPrice::Limit(_) => "LIMIT",
            };
            wtr.write_record([
                result.as_of.to_string(),
                order.symbol.clone(),
                order.side.to_string(),
                order.level.to_string(),
                kind.to_string(),
                order.price.value().to_string(),
                order.quantity.to_string(),
                format!("{:.2}", order.exposure),
                format!("{:.4}", order.score),
            ])?;
        }
        wtr.flush()?;

        info!(orders = orders.len(), path = output_path, "wrote orders");
        Ok(())
    }
}
