pub mod defaults;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ConfigError;
use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub checks: CheckConfig,
    pub rails: RailsConfig,
    pub prompts: PromptConfig,
    pub logging: LoggingConfig,
}

/// Options consumed by the fact checker and hallucination detector
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub sample_count: usize,
    pub consistency_threshold: f32,
    pub evidence_token_budget: usize,
    pub sample_temperature: f32,
    pub verification_temperature: f32,
    pub scoring_mode: ScoringMode,
    pub max_concurrent_calls: usize,
    pub check_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// One consistency call per sample
    PerSample,
    /// One call scoring every sample at once
    Batched,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RailsConfig {
    pub fact_checking: bool,
    pub hallucination_detection: bool,
    pub inconclusive_is_failure: bool,
    pub unknown_answer_message: String,
    pub hallucination_warning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub fact_check: String,
    pub consistency: String,
    pub batched_consistency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. "info" or "selfcheck_guard=debug"
    pub level: String,
    pub with_target: bool,
}

impl GuardConfig {
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILENAME)
    }

    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = if let Some(path) = config_path {
            let config_str = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            Self::from_toml_str(&config_str)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        Ok(toml::from_str(config_str)?)
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.checks.validate()?;
        self.prompts.validate()?;

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                error: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

impl CheckConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_count == 0 {
            return Err(ConfigError::positive("checks.sample_count"));
        }

        if self.evidence_token_budget == 0 {
            return Err(ConfigError::positive("checks.evidence_token_budget"));
        }

        if self.max_concurrent_calls == 0 {
            return Err(ConfigError::positive("checks.max_concurrent_calls"));
        }

        if self.check_timeout_ms == 0 {
            return Err(ConfigError::positive("checks.check_timeout_ms"));
        }

        check_range("checks.consistency_threshold", self.consistency_threshold, 0.0, 1.0)?;
        check_range("checks.sample_temperature", self.sample_temperature, 0.0, MAX_TEMPERATURE)?;
        check_range(
            "checks.verification_temperature",
            self.verification_temperature,
            0.0,
            MAX_TEMPERATURE,
        )?;

        Ok(())
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }
}

impl PromptConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_placeholder("prompts.fact_check", &self.fact_check, EVIDENCE_PLACEHOLDER)?;
        require_placeholder("prompts.fact_check", &self.fact_check, HYPOTHESIS_PLACEHOLDER)?;
        require_placeholder("prompts.consistency", &self.consistency, EVIDENCE_PLACEHOLDER)?;
        require_placeholder("prompts.consistency", &self.consistency, HYPOTHESIS_PLACEHOLDER)?;
        require_placeholder(
            "prompts.batched_consistency",
            &self.batched_consistency,
            SAMPLES_PLACEHOLDER,
        )?;
        require_placeholder(
            "prompts.batched_consistency",
            &self.batched_consistency,
            HYPOTHESIS_PLACEHOLDER,
        )?;
        Ok(())
    }
}

fn check_range(field: &str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    // NaN fails both comparisons, so test for containment
    if !(min..=max).contains(&value) {
        return Err(ConfigError::OutOfRange { field: field.to_string(), min, max, value });
    }
    Ok(())
}

fn require_placeholder(template: &str, text: &str, placeholder: &str) -> Result<(), ConfigError> {
    if !text.contains(placeholder) {
        return Err(ConfigError::MissingPlaceholder {
            template: template.to_string(),
            placeholder: placeholder.to_string(),
        });
    }
    Ok(())
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            consistency_threshold: DEFAULT_CONSISTENCY_THRESHOLD,
            evidence_token_budget: DEFAULT_EVIDENCE_TOKEN_BUDGET,
            sample_temperature: DEFAULT_SAMPLE_TEMPERATURE,
            verification_temperature: DEFAULT_VERIFICATION_TEMPERATURE,
            scoring_mode: ScoringMode::PerSample,
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT_CALLS,
            check_timeout_ms: DEFAULT_CHECK_TIMEOUT_MS,
        }
    }
}

impl Default for RailsConfig {
    fn default() -> Self {
        Self {
            fact_checking: true,
            hallucination_detection: true,
            inconclusive_is_failure: true,
            unknown_answer_message: DEFAULT_UNKNOWN_ANSWER_MESSAGE.to_string(),
            hallucination_warning: DEFAULT_HALLUCINATION_WARNING.to_string(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            fact_check: DEFAULT_FACT_CHECK_TEMPLATE.to_string(),
            consistency: DEFAULT_CONSISTENCY_TEMPLATE.to_string(),
            batched_consistency: DEFAULT_BATCHED_CONSISTENCY_TEMPLATE.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            with_target: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = GuardConfig::default();
        config.validate().unwrap();
        assert_eq!(config.checks.sample_count, 3);
        assert_eq!(config.checks.consistency_threshold, 0.5);
        assert_eq!(config.checks.scoring_mode, ScoringMode::PerSample);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GuardConfig::from_toml_str(
            r#"
            [checks]
            sample_count = 5
            scoring_mode = "batched"

            [rails]
            hallucination_detection = false
            "#,
        )
        .unwrap();

        assert_eq!(config.checks.sample_count, 5);
        assert_eq!(config.checks.scoring_mode, ScoringMode::Batched);
        assert_eq!(config.checks.evidence_token_budget, DEFAULT_EVIDENCE_TOKEN_BUDGET);
        assert!(config.rails.fact_checking);
        assert!(!config.rails.hallucination_detection);
    }

    #[test]
    fn test_rejects_threshold_out_of_range() {
        let mut config = GuardConfig::default();
        config.checks.consistency_threshold = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));

        config.checks.consistency_threshold = f32::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));
    }

    #[test]
    fn test_rejects_zero_sample_count() {
        let mut config = GuardConfig::default();
        config.checks.sample_count = 0;
        assert!(matches!(config.validate(), Err(ConfigError::MustBePositive { .. })));
    }

    #[test]
    fn test_rejects_template_without_placeholder() {
        let mut config = GuardConfig::default();
        config.prompts.fact_check = "Is this true? {hypothesis}".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::MissingPlaceholder { .. })));
    }
}
