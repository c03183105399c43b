//! Domain error types.

/// Top-level error type for sectorls.
#[derive(Debug, thiserror::Error)]
pub enum SectorlsError {
    #[error("data integrity error: {reason}")]
    DataIntegrity { reason: String },

    #[error("insufficient history: {periods} periods available, window needs {window}")]
    InsufficientHistory { periods: usize, window: usize },

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

    #[error("no overlapping dates between {strategy} and the benchmark")]
    Alignment { strategy: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SectorlsError {
    pub fn data_integrity(reason: impl Into<String>) -> Self {
        SectorlsError::DataIntegrity {
            reason: reason.into(),
        }
    }

    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SectorlsError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SectorlsError::ConfigParse { .. }
                | SectorlsError::ConfigMissing { .. }
                | SectorlsError::ConfigInvalid { .. }
        )
    }
}

impl From<&SectorlsError> for std::process::ExitCode {
    fn from(err: &SectorlsError) -> Self {
        let code: u8 = match err {
            SectorlsError::Io(_) | SectorlsError::Csv(_) => 1,
            SectorlsError::ConfigParse { .. }
            | SectorlsError::ConfigMissing { .. }
            | SectorlsError::ConfigInvalid { .. } => 2,
            SectorlsError::DataIntegrity { .. } => 3,
            SectorlsError::Alignment { .. } => 4,
            SectorlsError::InsufficientHistory { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
