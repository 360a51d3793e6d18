//! Domain error types.

/// Top-level error type for neutrader.
#[derive(Debug, thiserror::Error)]
pub enum NeutraderError {
    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no benchmark data for {symbol} on or before {date}")]
    MissingBenchmarkData {
        symbol: String,
        date: chrono::NaiveDate,
    },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NeutraderError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        NeutraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<csv::Error> for NeutraderError {
    fn from(err: csv::Error) -> Self {
        NeutraderError::DataSource {
            reason: format!("CSV error: {err}"),
        }
    }
}

impl From<&NeutraderError> for std::process::ExitCode {
    fn from(err: &NeutraderError) -> Self {
        let code: u8 = match err {
            NeutraderError::Io(_) => 1,
            NeutraderError::ConfigParse { .. }
            | NeutraderError::ConfigMissing { .. }
            | NeutraderError::ConfigInvalid { .. } => 2,
            NeutraderError::DataSource { .. } => 3,
            NeutraderError::NoData { .. } | NeutraderError::MissingBenchmarkData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
