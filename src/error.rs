//! Error types for Workload Flux

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur while ingesting intervals or computing reports
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Failed to parse interval payload: {0}")]
    Parse(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid interval: {0}")]
    Validation(#[from] ValidationError),

    #[error("lookback_days must be between {minimum} and {maximum}, got {actual}")]
    InvalidLookback {
        minimum: u32,
        maximum: u32,
        actual: u32,
    },

    #[error("Date window around {0} falls outside the supported calendar range")]
    DateOutOfRange(NaiveDate),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid TOML configuration: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Interval source error: {0}")]
    Source(String),
}

/// Structural problems with a single activity interval
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{kind} interval must end after it starts ({start} >= {end})")]
    NonPositiveDuration {
        kind: &'static str,
        start: String,
        end: String,
    },

    #[error("Idle interval must be at least {threshold} minutes, got {actual:.2}")]
    IdleBelowThreshold { threshold: f64, actual: f64 },

    #[error("Field {field} must be non-negative, got {value}")]
    NegativeField { field: &'static str, value: f64 },

    #[error("Field {field} must be finite")]
    NonFiniteField { field: &'static str },

    #[error("engagement_score must be within [0, 1], got {0}")]
    EngagementOutOfRange(f64),

    #[error("tracked_minutes must be greater than 0, got {0}")]
    NonPositiveTrackedMinutes(f64),
}
