//! Report generation port trait.

use crate::domain::error::NeutraderError;
use crate::domain::pipeline::PipelineResult;

/// Port for persisting one pipeline run (orders, scores or risk summary).
pub trait ReportPort {
    fn write(&self, result: &PipelineResult, output_path: &str) -> Result<(), NeutraderError>;
}
