//! Error types for the field pipeline.

use thiserror::Error;

/// Result type alias using FieldError.
pub type FieldResult<T> = Result<T, FieldError>;

/// Primary error type for normalization, generation and loading.
#[derive(Debug, Error)]
pub enum FieldError {
    // === Document Errors ===
    #[error("Malformed field document: {0}")]
    MalformedField(String),

    #[error("Invalid grid geometry: {0}")]
    InvalidGridGeometry(String),

    // === Loading Errors ===
    #[error("Failed to fetch field document: {0}")]
    FetchFailure(String),

    // === Generation Errors ===
    #[error("Mesh generation failed: {0}")]
    GenerationFailure(String),

    #[error("A mesh generation is already in flight for this field")]
    GenerationInProgress,

    // === Output Errors ===
    #[error("Invalid color legend: {0}")]
    InvalidLegend(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    // === Configuration Errors ===
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl FieldError {
    /// Create a MalformedField error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedField(msg.into())
    }

    /// Create an InvalidGridGeometry error.
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGridGeometry(msg.into())
    }

    /// Create a FetchFailure error.
    pub fn fetch_failed(msg: impl Into<String>) -> Self {
        Self::FetchFailure(msg.into())
    }

    /// Create a GenerationFailure error.
    pub fn generation_failed(msg: impl Into<String>) -> Self {
        Self::GenerationFailure(msg.into())
    }

    /// Create an InvalidLegend error.
    pub fn invalid_legend(msg: impl Into<String>) -> Self {
        Self::InvalidLegend(msg.into())
    }

    /// Whether the error came from the document itself rather than the environment.
    ///
    /// Document errors reproduce on every attempt with the same input.
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            FieldError::MalformedField(_) | FieldError::InvalidGridGeometry(_)
        )
    }
}

impl From<std::io::Error> for FieldError {
    fn from(err: std::io::Error) -> Self {
        FieldError::FetchFailure(err.to_string())
    }
}

impl From<serde_json::Error> for FieldError {
    fn from(err: serde_json::Error) -> Self {
        FieldError::MalformedField(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_errors() {
        assert!(FieldError::malformed("no U band").is_document_error());
        assert!(FieldError::invalid_geometry("nx = 0").is_document_error());
        assert!(!FieldError::fetch_failed("timeout").is_document_error());
        assert!(!FieldError::GenerationInProgress.is_document_error());
    }

    #[test]
    fn test_json_error_is_malformed() {
        let err: FieldError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, FieldError::MalformedField(_)));
    }
}
