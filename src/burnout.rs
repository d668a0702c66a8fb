//! Burnout risk analysis
//!
//! Applies four independent heuristics over a lookback window of daily
//! signals. Each triggered rule adds one point to the risk score.

use crate::numeric::mean;
use crate::types::{BurnoutReport, BurnoutSignals, RiskLevel};
use tracing::debug;

/// Mean late-night minutes per day that triggers the late-night rule
const LATE_NIGHT_MEAN_MINUTES: f64 = 45.0;

/// Days with weekend activity that trigger the weekend rule
const WEEKEND_DAYS_THRESHOLD: usize = 2;

/// Engagement at or above this counts as highly engaged
const HIGH_ENGAGEMENT: f64 = 0.8;

/// Break minutes at or below this count as too few breaks
const MAX_BREAK_MINUTES: f64 = 15.0;

/// Tracked minutes at or above this count as a long day (6 hours)
const LONG_DAY_MINUTES: f64 = 360.0;

/// Over-engaged days that trigger the no-breaks rule
const OVER_ENGAGED_DAYS_THRESHOLD: usize = 3;

/// Deep work slope (minutes/day) at or below this counts as declining
const DEEP_WORK_DECLINE_SLOPE: f64 = -5.0;

pub const FACTOR_LATE_NIGHT: &str = "Consistent late-night activity detected.";
pub const FACTOR_WEEKEND: &str = "Frequent weekend activity detected.";
pub const FACTOR_NO_BREAKS: &str = "High engagement without enough breaks detected.";
pub const FACTOR_DEEP_WORK_DECLINE: &str = "Deep-work trend is declining.";
pub const FACTOR_NONE: &str = "No strong burnout signals detected.";
pub const FACTOR_NO_HISTORY: &str = "Not enough history yet.";

/// Analyzer for burnout risk over a window of days
pub struct BurnoutAnalyzer;

impl BurnoutAnalyzer {
    /// Analyze an ordered (oldest first) window of daily signals
    pub fn analyze(days: &[BurnoutSignals], lookback_days: u32) -> BurnoutReport {
        if days.is_empty() {
            return BurnoutReport {
                risk_level: RiskLevel::Low,
                risk_score: 0,
                factors: vec![FACTOR_NO_HISTORY.to_string()],
                lookback_days,
            };
        }

        let late_night: Vec<f64> = days.iter().map(|d| d.late_night_minutes).collect();
        let late_night_mean = mean(&late_night);

        let weekend_days = days.iter().filter(|d| d.weekend_minutes > 0.0).count();

        let over_engaged_days = days.iter().filter(|d| is_over_engaged(d)).count();

        let deep_work: Vec<f64> = days.iter().map(|d| d.deep_work_minutes).collect();
        let deep_work_slope = linear_slope(&deep_work);

        let rules = [
            (late_night_mean >= LATE_NIGHT_MEAN_MINUTES, FACTOR_LATE_NIGHT),
            (weekend_days >= WEEKEND_DAYS_THRESHOLD, FACTOR_WEEKEND),
            (over_engaged_days >= OVER_ENGAGED_DAYS_THRESHOLD, FACTOR_NO_BREAKS),
            (deep_work_slope <= DEEP_WORK_DECLINE_SLOPE, FACTOR_DEEP_WORK_DECLINE),
        ];

        let mut factors: Vec<String> = rules
            .iter()
            .filter(|(triggered, _)| *triggered)
            .map(|(_, factor)| factor.to_string())
            .collect();
        let risk_score = factors.len() as u32;

        debug!(
            late_night_mean,
            weekend_days,
            over_engaged_days,
            deep_work_slope,
            risk_score,
            "Evaluated burnout rules"
        );

        if factors.is_empty() {
            factors.push(FACTOR_NONE.to_string());
        }

        BurnoutReport {
            risk_level: RiskLevel::from_risk_score(risk_score),
            risk_score,
            factors,
            lookback_days,
        }
    }
}

/// High engagement, few breaks and a long day, all at once
fn is_over_engaged(day: &BurnoutSignals) -> bool {
    day.engagement_norm >= HIGH_ENGAGEMENT
        && day.break_minutes <= MAX_BREAK_MINUTES
        && day.tracked_minutes >= LONG_DAY_MINUTES
}

/// Ordinary least squares slope of `values` against their index.
///
/// Returns 0 for fewer than two points.
pub fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);

    let (numerator, denominator) = values.iter().enumerate().fold(
        (0.0, 0.0),
        |(num, den), (i, y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        },
    );

    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}
