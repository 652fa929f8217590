//! Error types for the canon alignment engine

use thiserror::Error;

/// Errors that can occur during canon alignment
///
/// Numerically degenerate tracks (silence, flat features, too few beats) are
/// never reported here; the orchestrator resolves them through its fallback
/// paths. These variants cover contract violations only.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Invalid input data (empty frame arrays, ragged matrices, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration values outside their valid domain
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The external feature-extraction collaborator failed
    #[error("Feature extraction error: {0}")]
    FeatureExtraction(String),

    /// I/O failure while reading or writing track files
    #[error("I/O error while {context}: {source}")]
    Io {
        /// What was being done when the error occurred
        context: &'static str,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failure
    #[error("JSON error while {context}: {source}")]
    Json {
        /// What was being done when the error occurred
        context: &'static str,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}

impl AnalysisError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = AnalysisError::InvalidConfig("beats_per_bar must be > 0".to_string());
        assert_eq!(err.to_string(), "Invalid config: beats_per_bar must be > 0");

        let err = AnalysisError::io(
            "reading track file",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().starts_with("I/O error while reading track file"));
    }
}
