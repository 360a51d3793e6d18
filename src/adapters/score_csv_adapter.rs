//! Score table CSV writer implementing ReportPort.

use crate::adapters::ensure_parent_dir;
use crate::domain::error::NeutraderError;
use crate::domain::pipeline::PipelineResult;
use crate::ports::report_port::ReportPort;
use std::path::Path;
use tracing::info;

fn optional(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_default()
}

#[derive(Default)]
pub struct ScoreCsvAdapter;

impl ScoreCsvAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for ScoreCsvAdapter {
    fn write(&self, result: &PipelineResult, output_path: &str) -> Result<(), NeutraderError> {
        let path = Path::new(output_path);
        ensure_parent_dir(path)?;

        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record([
            "date",
            "symbol",
            "score",
            "close",
            "return",
            "excess_return",
            "oscillator",
            "relative_return_component",
            "trend_component",
            "oscillator_component",
        ])?;

        for score in &result.scores.scores {
            wtr.write_record([
                score.date.to_string(),
                score.symbol.clone(),
                format!("{:.4}", score.value),
                score.close.to_string(),
                optional(score.period_return, 6),
                optional(score.excess_return, 6),
                optional(score.oscillator, 2),
                format!("{:.4}", score.components.relative_return),
                format!("{:.4}", score.components.trend),
                format!("{:.4}", score.components.oscillator),
            ])?;
        }
        wtr.flush()?;

        info!(
            scores = result.scores.scores.len(),
            path = output_path,
            "wrote scores"
        );
        Ok(())
    }
}
