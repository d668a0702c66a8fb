//! Z-score fallback
//!
//! Compares the last day's productivity score against the mean and population
//! standard deviation of the prior days.

use super::{AnomalyStrategy, Detection, MIN_HISTORY_DAYS};
use crate::numeric::{mean, population_std_dev, round_to};
use crate::types::{AnomalyMethod, AnomalySignals};

/// |z| at or above this is anomalous
pub const Z_THRESHOLD: f64 = 2.0;

pub const DETAILS_STATISTICAL: &str =
    "Fallback used due to limited history or unavailable model.";

/// Statistical strategy over productivity scores
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticalStrategy;

impl AnomalyStrategy for StatisticalStrategy {
    fn method(&self) -> AnomalyMethod {
        AnomalyMethod::Statistical
    }

    fn supports(&self, history: &[AnomalySignals]) -> bool {
        history.len() >= MIN_HISTORY_DAYS
    }

    fn detect(&self, history: &[AnomalySignals]) -> Detection {
        let scores: Vec<f64> = history.iter().map(|d| d.productivity_score).collect();
        let (is_anomaly, z) = zscore(&scores);
        Detection {
            is_anomaly,
            anomaly_score: round_to(z, 4),
            details: DETAILS_STATISTICAL.to_string(),
        }
    }
}

/// Z-score of the last value against the others.
///
/// Returns `(false, 0.0)` for short input or a flat baseline.
pub fn zscore(values: &[f64]) -> (bool, f64) {
    let Some((current, baseline)) = values.split_last() else {
        return (false, 0.0);
    };
    if values.len() < MIN_HISTORY_DAYS {
        return (false, 0.0);
    }

    let std_dev = population_std_dev(baseline);
    if std_dev == 0.0 {
        return (false, 0.0);
    }

    let z = (current - mean(baseline)) / std_dev;
    (z.abs() >= Z_THRESHOLD, z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_baseline_guard() {
        assert_eq!(zscore(&[10.0, 10.0, 10.0, 10.0, 50.0]), (false, 0.0));
    }

    #[test]
    fn test_spike_is_anomalous() {
        let (is_anomaly, z) = zscore(&[10.0, 12.0, 11.0, 9.0, 60.0]);
        assert!(is_anomaly);
        // mean 10.5, population std sqrt(1.25)
        assert!((z - 49.5 / 1.25f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_drop_is_anomalous() {
        let (is_anomaly, z) = zscore(&[50.0, 52.0, 48.0, 10.0]);
        assert!(is_anomaly);
        assert!(z < 0.0);
    }

    #[test]
    fn test_too_short() {
        assert_eq!(zscore(&[]), (false, 0.0));
        assert_eq!(zscore(&[1.0, 100.0]), (false, 0.0));
    }

    #[test]
    fn test_detection_rounds_score() {
        let history: Vec<AnomalySignals> = [10.0, 12.0, 11.0, 9.0, 12.0]
            .iter()
            .map(|&productivity_score| AnomalySignals {
                productivity_score,
                ..AnomalySignals::default()
            })
            .collect();
        let detection = StatisticalStrategy.detect(&history);
        // (12 - 10.5) / 1.118034 = 1.341641
        assert_eq!(detection.anomaly_score, 1.3416);
        assert!(!detection.is_anomaly);
        assert_eq!(detection.details, DETAILS_STATISTICAL);
    }
}
