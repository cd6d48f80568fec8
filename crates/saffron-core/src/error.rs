//! Error types for the Saffron enrichment pipeline.
//!
//! Errors are split by scope: [`SaffronError`] is fatal to a run (config,
//! checkpoint I/O, incomplete aggregation), while [`EnrichError`] describes a
//! single recipe's failure and is recovered locally by the batch runner.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Saffron operations.
#[derive(Error, Debug)]
pub enum SaffronError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The recipe input file could not be read or parsed
    #[error("Input error for {path}: {message}")]
    Input { path: PathBuf, message: String },

    /// A checkpoint or final output file could not be written or read
    #[error("Checkpoint error for {path}: {message}")]
    Checkpoint { path: PathBuf, message: String },

    /// Aggregation found gaps in the batch sequence
    #[error("Incomplete run: missing checkpoint(s) for batch {}", format_indices(.missing))]
    IncompleteRun { missing: Vec<usize> },

    /// LLM setup errors (unknown provider, missing API key)
    #[error("LLM error: {0}")]
    Llm(#[from] EnrichError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_indices(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// A model response that does not match the enrichment schema.
///
/// Names the first offending field; the validator never accepts partial results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("field `{field}`: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(field: &str) -> Self {
        Self::new(field, "missing required field")
    }
}

/// Per-recipe enrichment failures.
#[derive(Error, Debug, Clone)]
pub enum EnrichError {
    /// Rate limit, timeout, server error or dropped connection
    #[error("transient: {message}")]
    Transient {
        message: String,
        status_code: Option<u16>,
    },

    /// The request itself is bad (auth, malformed body, unknown model)
    #[error("permanent: {message}")]
    Permanent {
        message: String,
        status_code: Option<u16>,
    },

    /// The response did not match the enrichment schema
    #[error("invalid response: {0}")]
    Validation(#[from] ValidationError),

    /// Every attempt failed with a retryable error
    #[error("gave up after {attempts} attempt(s): {last}")]
    RetryExhausted {
        attempts: u32,
        last: Box<EnrichError>,
    },
}

impl EnrichError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            status_code: None,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
            status_code: None,
        }
    }

    /// Short, stable label used in the failure log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transient { .. } => "transient",
            Self::Permanent { .. } => "permanent",
            Self::Validation(_) => "validation",
            Self::RetryExhausted { .. } => "retry_exhausted",
        }
    }
}

/// Convenience type alias for Saffron results.
pub type Result<T> = std::result::Result<T, SaffronError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_run_lists_missing_batches() {
        let err = SaffronError::IncompleteRun {
            missing: vec![1, 4],
        };
        assert_eq!(
            err.to_string(),
            "Incomplete run: missing checkpoint(s) for batch 1, 4"
        );
    }

    #[test]
    fn test_validation_error_names_field() {
        let err = ValidationError::new("healthiness_score", "must be between 1 and 5, got 7");
        assert!(err.to_string().contains("`healthiness_score`"));
    }

    #[test]
    fn test_retry_exhausted_carries_last_error() {
        let err = EnrichError::RetryExhausted {
            attempts: 3,
            last: Box::new(EnrichError::transient("HTTP 429")),
        };
        assert_eq!(err.kind(), "retry_exhausted");
        assert!(err.to_string().contains("3 attempt(s)"));
        assert!(err.to_string().contains("HTTP 429"));
    }
}
