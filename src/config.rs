//! Analytics configuration
//!
//! Thresholds and weights are carried as an explicit, immutable value that is
//! passed into every pipeline stage. Values come from defaults, an optional
//! TOML file, and environment overrides, in that order.

use crate::error::AnalyticsError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Normalization targets and ingestion thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Targets {
    /// Shortest idle interval accepted on ingestion
    pub idle_threshold_minutes: f64,
    /// Deep work minutes that saturate `deep_work_norm`
    pub deep_work_target_minutes: f64,
    /// Context switches that saturate `switch_norm`
    pub context_switch_target: f64,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            idle_threshold_minutes: 5.0,
            deep_work_target_minutes: 240.0,
            context_switch_target: 50.0,
        }
    }
}

/// Productivity score weights. They need not sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub deep_work_weight: f64,
    pub engagement_weight: f64,
    pub task_weight: f64,
    pub switch_penalty: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            deep_work_weight: 0.4,
            engagement_weight: 0.3,
            task_weight: 0.3,
            switch_penalty: 0.2,
        }
    }
}

/// Anomaly detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalySettings {
    /// Allow the outlier model when it is compiled in
    pub model_enabled: bool,
}

impl Default for AnomalySettings {
    fn default() -> Self {
        Self {
            model_enabled: true,
        }
    }
}

/// Complete analytics configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub targets: Targets,
    pub weights: ScoreWeights,
    pub anomaly: AnomalySettings,
}

impl AnalyticsConfig {
    /// Parse configuration from TOML; omitted fields keep their defaults
    pub fn from_toml_str(toml_str: &str) -> Result<Self, AnalyticsError> {
        let config: AnalyticsConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, AnalyticsError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String, AnalyticsError> {
        toml::to_string_pretty(self)
            .map_err(|e| AnalyticsError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self, AnalyticsError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, AnalyticsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let targets = &mut self.targets;
        override_from(&lookup, "IDLE_THRESHOLD_MINUTES", &mut targets.idle_threshold_minutes)?;
        override_from(&lookup, "DEEP_WORK_TARGET_MINUTES", &mut targets.deep_work_target_minutes)?;
        override_from(&lookup, "CONTEXT_SWITCH_TARGET", &mut targets.context_switch_target)?;

        let weights = &mut self.weights;
        override_from(&lookup, "DEEP_WORK_WEIGHT", &mut weights.deep_work_weight)?;
        override_from(&lookup, "ENGAGEMENT_WEIGHT", &mut weights.engagement_weight)?;
        override_from(&lookup, "TASK_WEIGHT", &mut weights.task_weight)?;
        override_from(&lookup, "SWITCH_PENALTY", &mut weights.switch_penalty)?;

        override_from(&lookup, "ANOMALY_MODEL_ENABLED", &mut self.anomaly.model_enabled)?;

        self.validate()?;
        Ok(self)
    }

    /// Check that targets are positive and weights non-negative
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        let positive = [
            ("deep_work_target_minutes", self.targets.deep_work_target_minutes),
            ("context_switch_target", self.targets.context_switch_target),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(AnalyticsError::Config(format!(
                    "{} must be greater than 0, got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("idle_threshold_minutes", self.targets.idle_threshold_minutes),
            ("deep_work_weight", self.weights.deep_work_weight),
            ("engagement_weight", self.weights.engagement_weight),
            ("task_weight", self.weights.task_weight),
            ("switch_penalty", self.weights.switch_penalty),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(AnalyticsError::Config(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

fn override_from<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<(), AnalyticsError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| AnalyticsError::Config(format!("{}={:?}: {}", key, raw, e)))?;
    }
    Ok(())
}
