use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a check degraded to an inconclusive (or low-confidence) verdict.
///
/// None of these are returned as `Err` from a checker; they ride along on the
/// verdict so callers can see why the checker could not decide.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckError {
    #[error("Transport failure: {message}")]
    Transport { message: String },

    #[error("Unparseable response: {response:?}")]
    Parse { response: String },

    #[error("Insufficient evidence: {reason}")]
    InsufficientEvidence { reason: String },

    #[error("Deadline exceeded after {completed} completed calls")]
    DeadlineExceeded { completed: usize },
}

impl CheckError {
    pub fn transport(err: &anyhow::Error) -> Self {
        CheckError::Transport { message: format!("{:#}", err) }
    }

    pub fn insufficient(reason: impl Into<String>) -> Self {
        CheckError::InsufficientEvidence { reason: reason.into() }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than 0")]
    MustBePositive { field: String },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange { field: String, min: f32, max: f32, value: f32 },

    #[error("Prompt template {template} is missing placeholder {placeholder}")]
    MissingPlaceholder { template: String, placeholder: String },

    #[error("Invalid value for {field}: {error}")]
    InvalidValue { field: String, error: String },
}

impl ConfigError {
    pub fn positive(field: &str) -> Self {
        ConfigError::MustBePositive { field: field.to_string() }
    }
}
