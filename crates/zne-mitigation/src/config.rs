//! Configuration for extrapolation runs.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (with ZNE_ prefix)
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values
//!
//! ```yaml
//! sampling:
//!   scale_factors: [1.0, 3.0, 5.0]
//!   folding: global
//!   concurrency_limit: 4
//! retry:
//!   max_retries: 2
//!   initial_backoff_ms: 200
//!   max_backoff_ms: 5000
//! extrapolation:
//!   model: polynomial
//!   degree: 2
//! execution:
//!   shots: 4000
//!   seed: 42
//! logging:
//!   level: info
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use zne_hal::ExecutionOptions;

use crate::extrapolation::FitModel;
use crate::folding::FoldingStrategy;
use crate::orchestrator::RetryPolicy;
use crate::pipeline::ZneOptions;
use crate::scale::ScaleFactor;

/// Complete extrapolation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZneConfig {
    /// Scale factors, folding and dispatch
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// Executor retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Fit model
    #[serde(default)]
    pub extrapolation: ExtrapolationConfig,

    /// Options forwarded to the executor
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Noise scale factors, each at least 1
    #[serde(default = "default_scale_factors")]
    pub scale_factors: Vec<f64>,

    /// Folding strategy: "global", "gates_from_left", "gates_from_right"
    #[serde(default = "default_folding")]
    pub folding: String,

    /// Maximum executor calls in flight
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
}

/// Retry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Extra attempts after the first one
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Upper bound on the retry delay in milliseconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Per-attempt time limit in milliseconds
    #[serde(default)]
    pub attempt_timeout_ms: Option<u64>,
}

/// Fit settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrapolationConfig {
    /// Model: "linear", "polynomial", "richardson", "exponential"
    #[serde(default = "default_model")]
    pub model: String,

    /// Degree for the polynomial model
    #[serde(default = "default_degree")]
    pub degree: usize,
}

/// Executor settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Shots per sample
    #[serde(default)]
    pub shots: Option<u32>,

    /// Base seed; the i-th scale factor uses seed + i
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_scale_factors() -> Vec<f64> {
    vec![1.0, 3.0, 5.0]
}

fn default_folding() -> String {
    "global".to_string()
}

fn default_concurrency_limit() -> usize {
    4
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_backoff() -> u64 {
    200
}

fn default_max_backoff() -> u64 {
    5000
}

fn default_model() -> String {
    "linear".to_string()
}

fn default_degree() -> usize {
    2
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            scale_factors: default_scale_factors(),
            folding: default_folding(),
            concurrency_limit: default_concurrency_limit(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            attempt_timeout_ms: None,
        }
    }
}

impl Default for ExtrapolationConfig {
    fn default() -> Self {
        ExtrapolationConfig {
            model: default_model(),
            degree: default_degree(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

impl ZneConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: ZneConfig = serde_yaml_ng::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with the following precedence:
    /// 1. Load from file if provided
    /// 2. Apply environment variable overrides
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => ZneConfig::default(),
        };

        let config = config.merge_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Merge `ZNE_*` environment variables into this configuration.
    pub fn merge_env(self) -> Result<Self, ConfigError> {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    /// Merge overrides looked up by variable name.
    ///
    /// Only variables that are set override the current values. Set but
    /// unparsable values are errors.
    pub fn merge_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::ParseError(format!("{key}: cannot parse '{value}'")))
        }

        // Sampling
        if let Some(v) = lookup("ZNE_SCALE_FACTORS") {
            self.sampling.scale_factors = v
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse("ZNE_SCALE_FACTORS", s))
                .collect::<Result<_, _>>()?;
        }
        if let Some(v) = lookup("ZNE_FOLDING") {
            self.sampling.folding = v;
        }
        if let Some(v) = lookup("ZNE_CONCURRENCY_LIMIT") {
            self.sampling.concurrency_limit = parse("ZNE_CONCURRENCY_LIMIT", &v)?;
        }

        // Retry
        if let Some(v) = lookup("ZNE_MAX_RETRIES") {
            self.retry.max_retries = parse("ZNE_MAX_RETRIES", &v)?;
        }
        if let Some(v) = lookup("ZNE_INITIAL_BACKOFF_MS") {
            self.retry.initial_backoff_ms = parse("ZNE_INITIAL_BACKOFF_MS", &v)?;
        }
        if let Some(v) = lookup("ZNE_MAX_BACKOFF_MS") {
            self.retry.max_backoff_ms = parse("ZNE_MAX_BACKOFF_MS", &v)?;
        }
        if let Some(v) = lookup("ZNE_ATTEMPT_TIMEOUT_MS") {
            self.retry.attempt_timeout_ms = Some(parse("ZNE_ATTEMPT_TIMEOUT_MS", &v)?);
        }

        // Extrapolation
        if let Some(v) = lookup("ZNE_FIT_MODEL") {
            self.extrapolation.model = v;
        }
        if let Some(v) = lookup("ZNE_POLY_DEGREE") {
            self.extrapolation.degree = parse("ZNE_POLY_DEGREE", &v)?;
        }

        // Execution
        if let Some(v) = lookup("ZNE_SHOTS") {
            self.execution.shots = Some(parse("ZNE_SHOTS", &v)?);
        }
        if let Some(v) = lookup("ZNE_SEED") {
            self.execution.seed = Some(parse("ZNE_SEED", &v)?);
        }

        // Logging
        if let Some(v) = lookup("ZNE_LOG_LEVEL") {
            self.logging.level = v;
        }

        Ok(self)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(bad) = self
            .sampling
            .scale_factors
            .iter()
            .find(|s| ScaleFactor::new(**s).is_err())
        {
            return Err(ConfigError::ValidationError(format!(
                "Invalid scale factor: {bad} (must be finite and at least 1)"
            )));
        }

        self.folding_strategy()?;
        self.fit_model()?;

        if self.sampling.concurrency_limit == 0 {
            return Err(ConfigError::ValidationError(
                "concurrency_limit must be greater than 0".to_string(),
            ));
        }

        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::ValidationError(format!(
                "initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.retry.initial_backoff_ms, self.retry.max_backoff_ms
            )));
        }

        if self.retry.attempt_timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "attempt_timeout_ms must be greater than 0; omit it to disable the timeout"
                    .to_string(),
            ));
        }

        if self.execution.shots == Some(0) {
            return Err(ConfigError::ValidationError(
                "shots must be greater than 0".to_string(),
            ));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {other}"
                )));
            }
        }

        Ok(())
    }

    /// Get the parsed folding strategy.
    pub fn folding_strategy(&self) -> Result<FoldingStrategy, ConfigError> {
        self.sampling
            .folding
            .parse()
            .map_err(|_| ConfigError::ValidationError(format!(
                "Unknown folding strategy: {}",
                self.sampling.folding
            )))
    }

    /// Get the parsed fit model.
    pub fn fit_model(&self) -> Result<FitModel, ConfigError> {
        match self.extrapolation.model.to_lowercase().as_str() {
            "linear" => Ok(FitModel::Linear),
            "polynomial" | "poly" => Ok(FitModel::Polynomial {
                degree: self.extrapolation.degree,
            }),
            "richardson" => Ok(FitModel::Richardson),
            "exponential" | "exp" => Ok(FitModel::Exponential),
            other => Err(ConfigError::ValidationError(format!(
                "Unknown fit model: {other}"
            ))),
        }
    }

    /// Build run options from this configuration.
    pub fn to_options(&self) -> Result<ZneOptions, ConfigError> {
        let scale_factors = self
            .sampling
            .scale_factors
            .iter()
            .map(|&s| ScaleFactor::new(s))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(ZneOptions {
            scale_factors,
            folding: self.folding_strategy()?,
            model: self.fit_model()?,
            concurrency_limit: self.sampling.concurrency_limit,
            retry: RetryPolicy {
                max_retries: self.retry.max_retries,
                initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
                attempt_timeout: self.retry.attempt_timeout_ms.map(Duration::from_millis),
            },
            execution: ExecutionOptions {
                shots: self.execution.shots,
                seed: self.execution.seed,
            },
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ZneConfig::default();
        assert_eq!(config.sampling.scale_factors, vec![1.0, 3.0, 5.0]);
        assert_eq!(config.extrapolation.model, "linear");
        assert!(config.validate().is_ok());

        let options = config.to_options().unwrap();
        assert_eq!(options, ZneOptions::default());
    }

    #[test]
    fn test_yaml_partial_sections() {
        let config = ZneConfig::from_yaml(
            "extrapolation:\n  model: polynomial\n  degree: 3\nexecution:\n  seed: 7\n",
        )
        .unwrap();
        assert_eq!(config.fit_model().unwrap(), FitModel::Polynomial { degree: 3 });
        assert_eq!(config.execution.seed, Some(7));
        assert_eq!(config.sampling.concurrency_limit, 4);
    }

    #[test]
    fn test_yaml_rejects_invalid_values() {
        assert!(matches!(
            ZneConfig::from_yaml("sampling:\n  scale_factors: [0.5, 3.0]\n"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            ZneConfig::from_yaml("sampling: [\n"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let config = ZneConfig::default()
            .merge_vars(vars(&[
                ("ZNE_SCALE_FACTORS", "1, 2, 3"),
                ("ZNE_FOLDING", "gates_from_right"),
                ("ZNE_FIT_MODEL", "richardson"),
                ("ZNE_SEED", "99"),
                ("ZNE_ATTEMPT_TIMEOUT_MS", "1500"),
            ]))
            .unwrap();

        let options = config.to_options().unwrap();
        assert_eq!(options.scale_factors.len(), 3);
        assert_eq!(options.folding, FoldingStrategy::GatesFromRight);
        assert_eq!(options.model, FitModel::Richardson);
        assert_eq!(options.execution.seed, Some(99));
        assert_eq!(options.retry.attempt_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_env_unset_keeps_values() {
        let config = ZneConfig::default().merge_vars(vars(&[])).unwrap();
        assert_eq!(config, ZneConfig::default());
    }

    #[test]
    fn test_env_bad_value() {
        let err = ZneConfig::default()
            .merge_vars(vars(&[("ZNE_MAX_RETRIES", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = ZneConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_backoff_order() {
        let mut config = ZneConfig::default();
        config.retry.initial_backoff_ms = 10_000;
        assert!(config.validate().is_err());
    }
}
