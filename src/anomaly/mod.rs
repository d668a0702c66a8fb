//! Anomaly detection
//!
//! Compares the most recent day against the rest of the lookback window.
//! Detection is a chain of strategies: the outlier model when it is available
//! and there is enough history, otherwise a z-score over productivity scores.
//! The strategy is chosen by a capability check up front, so an unavailable
//! model never surfaces as an error.

#[cfg(feature = "model")]
pub mod isolation_forest;
#[cfg(feature = "model")]
pub mod model;
pub mod statistical;

use crate::config::AnomalySettings;
use crate::types::{AnomalyMethod, AnomalyReport, AnomalySignals};
use tracing::{debug, warn};

#[cfg(feature = "model")]
pub use model::ModelStrategy;
pub use statistical::StatisticalStrategy;

/// Fewest days for any anomaly analysis
pub const MIN_HISTORY_DAYS: usize = 3;

/// Fewest days for the outlier model
pub const MIN_MODEL_HISTORY_DAYS: usize = 7;

/// Expected share of outliers in the baseline
pub const CONTAMINATION: f64 = 0.15;

pub const DETAILS_INSUFFICIENT: &str = "Need at least 3 daily vectors.";

/// Result of one strategy run
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub is_anomaly: bool,
    pub anomaly_score: f64,
    pub details: String,
}

/// One way of deciding whether the last day is anomalous
pub trait AnomalyStrategy: Send + Sync {
    /// Method reported when this strategy runs
    fn method(&self) -> AnomalyMethod;

    /// Whether this strategy can evaluate `history`
    fn supports(&self, history: &[AnomalySignals]) -> bool;

    /// Evaluate the last entry of `history` against the others
    fn detect(&self, history: &[AnomalySignals]) -> Detection;
}

/// Detector that runs the first applicable strategy
pub struct AnomalyDetector {
    strategies: Vec<Box<dyn AnomalyStrategy>>,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(&AnomalySettings::default())
    }
}

impl AnomalyDetector {
    /// Build the strategy chain for the given settings
    pub fn new(settings: &AnomalySettings) -> Self {
        let mut strategies: Vec<Box<dyn AnomalyStrategy>> = Vec::new();

        #[cfg(feature = "model")]
        if settings.model_enabled {
            strategies.push(Box::new(ModelStrategy::new(CONTAMINATION)));
        }
        #[cfg(not(feature = "model"))]
        if settings.model_enabled {
            debug!("Outlier model not compiled in; using statistical detection only");
        }

        strategies.push(Box::new(StatisticalStrategy));
        Self { strategies }
    }

    /// Detector that never uses the outlier model
    pub fn statistical_only() -> Self {
        Self {
            strategies: vec![Box::new(StatisticalStrategy) as Box<dyn AnomalyStrategy>],
        }
    }

    /// Whether an outlier model is part of the chain
    pub fn model_available(&self) -> bool {
        self.strategies
            .iter()
            .any(|s| s.method() == AnomalyMethod::Model)
    }

    /// Detect whether the last day of `history` (oldest first) is anomalous
    pub fn detect(&self, history: &[AnomalySignals], lookback_days: u32) -> AnomalyReport {
        if history.len() < MIN_HISTORY_DAYS {
            return AnomalyReport {
                is_anomaly: false,
                method: AnomalyMethod::InsufficientData,
                anomaly_score: 0.0,
                details: DETAILS_INSUFFICIENT.to_string(),
                lookback_days,
            };
        }

        let Some(strategy) = self.strategies.iter().find(|s| s.supports(history)) else {
            warn!(days = history.len(), "No anomaly strategy accepted the window");
            return AnomalyReport {
                is_anomaly: false,
                method: AnomalyMethod::InsufficientData,
                anomaly_score: 0.0,
                details: DETAILS_INSUFFICIENT.to_string(),
                lookback_days,
            };
        };

        if history.len() >= MIN_MODEL_HISTORY_DAYS && strategy.method() != AnomalyMethod::Model {
            warn!(days = history.len(), "Outlier model unavailable; falling back to z-score");
        }

        let detection = strategy.detect(history);
        debug!(
            method = ?strategy.method(),
            is_anomaly = detection.is_anomaly,
            anomaly_score = detection.anomaly_score,
            "Anomaly detection complete"
        );

        AnomalyReport {
            is_anomaly: detection.is_anomaly,
            method: strategy.method(),
            anomaly_score: detection.anomaly_score,
            details: detection.details,
            lookback_days,
        }
    }
}
