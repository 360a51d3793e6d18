//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod order_csv_adapter;
pub mod risk_report_adapter;
pub mod score_csv_adapter;

use crate::domain::error::NeutraderError;
use std::fs;
use std::path::Path;

/// Create the output file's parent directory if it does not exist yet.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), NeutraderError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
