//! Outlier model strategy
//!
//! Fits an isolation forest on every day but the last and classifies the last
//! day's five-feature row.

use super::isolation_forest::IsolationForest;
use super::{AnomalyStrategy, Detection, MIN_MODEL_HISTORY_DAYS};
use crate::numeric::round_to;
use crate::types::{AnomalyMethod, AnomalySignals};
use tracing::trace;

pub const DETAILS_MODEL: &str = "Lower decision score means more anomalous behavior.";

/// Isolation forest strategy with fixed hyperparameters
#[derive(Debug, Clone)]
pub struct ModelStrategy {
    forest: IsolationForest,
}

impl ModelStrategy {
    pub fn new(contamination: f64) -> Self {
        Self {
            forest: IsolationForest::new(contamination),
        }
    }
}

impl AnomalyStrategy for ModelStrategy {
    fn method(&self) -> AnomalyMethod {
        AnomalyMethod::Model
    }

    fn supports(&self, history: &[AnomalySignals]) -> bool {
        history.len() >= MIN_MODEL_HISTORY_DAYS
    }

    fn detect(&self, history: &[AnomalySignals]) -> Detection {
        let rows: Vec<Vec<f64>> = history.iter().map(AnomalySignals::feature_row).collect();
        let Some((current, baseline)) = rows.split_last() else {
            return Detection {
                is_anomaly: false,
                anomaly_score: 0.0,
                details: DETAILS_MODEL.to_string(),
            };
        };

        let Some(fitted) = self.forest.fit(baseline) else {
            return Detection {
                is_anomaly: false,
                anomaly_score: 0.0,
                details: DETAILS_MODEL.to_string(),
            };
        };

        let decision = fitted.decision_function(current);
        trace!(decision, baseline_days = baseline.len(), "Isolation forest decision");

        Detection {
            is_anomaly: decision < 0.0,
            anomaly_score: round_to(decision, 4),
            details: DETAILS_MODEL.to_string(),
        }
    }
}
