//! Engine configuration.
//!
//! Configuration is assembled from built-in defaults, `REGIME_*` environment
//! variables or a TOML file, then validated once before any detector is
//! constructed.

mod detector_config;

pub use detector_config::{AccumulationConfig, DistributionConfig, FailedBreakoutConfig};

use crate::domain::errors::ConfigError;
use crate::domain::market::Timeframe;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Timeframe assumed when the payload carries no recognised interval
    pub default_timeframe: Timeframe,
    /// Upper bound on candidate windows a single detector may evaluate
    pub max_window_evaluations: usize,
    pub accumulation: AccumulationConfig,
    pub distribution: DistributionConfig,
    pub failed_breakout: FailedBreakoutConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeframe: Timeframe::Day,
            max_window_evaluations: 250_000,
            accumulation: AccumulationConfig::default(),
            distribution: DistributionConfig::default(),
            failed_breakout: FailedBreakoutConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (the process
    /// environment in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };
        let d = Self::default();

        let default_timeframe = match env.raw("REGIME_DEFAULT_TIMEFRAME") {
            Some(raw) => Timeframe::from_str(&raw)
                .context("Failed to parse REGIME_DEFAULT_TIMEFRAME")?,
            None => d.default_timeframe,
        };

        let config = Self {
            default_timeframe,
            max_window_evaluations: env
                .usize("REGIME_MAX_WINDOW_EVALUATIONS", d.max_window_evaluations)?,
            accumulation: AccumulationConfig::from_reader(&env)?,
            distribution: DistributionConfig::from_reader(&env)?,
            failed_breakout: FailedBreakoutConfig::from_reader(&env)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse engine config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read engine config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .context(format!("Invalid engine config file: {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_window_evaluations == 0 {
            return Err(ConfigError::NonPositive {
                field: "max_window_evaluations",
                value: 0.0,
            });
        }
        self.accumulation.validate()?;
        self.distribution.validate()?;
        self.failed_breakout.validate()
    }
}

/// Typed reads over a string key lookup.
pub(crate) struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub(crate) fn usize(&self, key: &str, default: usize) -> Result<usize> {
        self.opt_usize(key).map(|v| v.unwrap_or(default))
    }

    pub(crate) fn f64(&self, key: &str, default: f64) -> Result<f64> {
        self.opt_f64(key).map(|v| v.unwrap_or(default))
    }

    pub(crate) fn opt_usize(&self, key: &str) -> Result<Option<usize>> {
        self.raw(key)
            .map(|v| {
                v.parse::<usize>()
                    .context(format!("Failed to parse {}", key))
            })
            .transpose()
    }

    pub(crate) fn opt_f64(&self, key: &str) -> Result<Option<f64>> {
        self.raw(key)
            .map(|v| v.parse::<f64>().context(format!("Failed to parse {}", key)))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::from_lookup(|_| None).expect("Should parse with defaults");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.accumulation.lookback, 60);
        assert_eq!(config.distribution.max_duration, 25);
        assert_eq!(config.failed_breakout.base_window, 30);
        assert_eq!(config.default_timeframe, Timeframe::Day);
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("REGIME_ACC_MIN_DURATION", "10"),
            ("REGIME_FB_REENTRY_WINDOW", "5"),
            ("REGIME_DEFAULT_TIMEFRAME", "weekly"),
            ("REGIME_DIST_PRIOR_ADVANCE", "0.3"),
        ]))
        .unwrap();

        assert_eq!(config.accumulation.min_duration, Some(10));
        assert_eq!(config.failed_breakout.reentry_window, 5);
        assert_eq!(config.default_timeframe, Timeframe::Week);
        assert_eq!(config.distribution.prior_advance, 0.3);
    }

    #[test]
    fn test_unparseable_value_names_the_key() {
        let err = EngineConfig::from_lookup(lookup_from(&[("REGIME_ACC_LOOKBACK", "sixty")]))
            .unwrap_err();
        assert!(err.to_string().contains("REGIME_ACC_LOOKBACK"));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let err = EngineConfig::from_lookup(lookup_from(&[("REGIME_ACC_MIN_DURATION", "0")]))
            .unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_toml_partial_override() {
        let config = EngineConfig::from_toml_str(
            r#"
            default_timeframe = "week"

            [accumulation]
            max_duration = 30

            [failed_breakout]
            lookback = 120
            "#,
        )
        .unwrap();

        assert_eq!(config.default_timeframe, Timeframe::Week);
        assert_eq!(config.accumulation.max_duration, 30);
        assert_eq!(config.accumulation.lookback, 60);
        assert_eq!(config.failed_breakout.lookback, 120);
    }

    #[test]
    fn test_toml_inverted_band_is_rejected() {
        let result = EngineConfig::from_toml_str(
            r#"
            [distribution]
            min_duration = 30
            max_duration = 10
            "#,
        );
        assert!(result.is_err());
    }
}
