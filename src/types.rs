//! Core data types for Workload Flux
//!
//! This module defines the activity intervals consumed by the pipeline and the
//! derived value objects (aggregates, features, scores, reports) it produces.
//! Every derived type is created fresh per query and never mutated afterwards.

use crate::error::ValidationError;
use crate::numeric::round_to;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Timestamp layout used for serialized interval bounds (naive UTC)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse an interval timestamp into naive UTC.
///
/// Offset-qualified RFC3339 values are converted to UTC; naive values are
/// taken as already being UTC.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Ok(with_offset.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
}

/// Serde adapter for naive UTC timestamps that also accepts offsets on input
pub mod naive_utc {
    use super::{parse_timestamp, TIMESTAMP_FORMAT};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Activity intervals (caller-owned input)
// ============================================================================

/// A period during which the user was idle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdleInterval {
    /// Idle start (inclusive)
    #[serde(with = "naive_utc")]
    pub start: NaiveDateTime,
    /// Idle end (exclusive)
    #[serde(with = "naive_utc")]
    pub end: NaiveDateTime,
}

impl IdleInterval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Check the structural invariant `end > start`
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_bounds("idle", self.start, self.end)
    }
}

/// A worked session with its effort metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkInterval {
    /// Session start (inclusive)
    #[serde(with = "naive_utc")]
    pub start: NaiveDateTime,
    /// Session end (exclusive)
    #[serde(with = "naive_utc")]
    pub end: NaiveDateTime,
    #[serde(default)]
    pub active_minutes: f64,
    #[serde(default)]
    pub deep_work_minutes: f64,
    /// Self-reported or producer-computed engagement (0-1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement_score: Option<f64>,
    #[serde(default)]
    pub context_switch_count: u32,
    #[serde(default)]
    pub assigned_tasks: u32,
    #[serde(default)]
    pub completed_tasks: u32,
    #[serde(default)]
    pub break_minutes: f64,
    #[serde(default)]
    pub late_night_minutes: f64,
    #[serde(default)]
    pub weekend_minutes: f64,
    /// Producer-declared tracked minutes.
    ///
    /// Caps the other minute fields on ingestion; aggregation always measures
    /// the in-day overlap from the interval bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracked_minutes: Option<f64>,
}

impl WorkInterval {
    /// Create a session with all metrics zeroed
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start,
            end,
            active_minutes: 0.0,
            deep_work_minutes: 0.0,
            engagement_score: None,
            context_switch_count: 0,
            assigned_tasks: 0,
            completed_tasks: 0,
            break_minutes: 0.0,
            late_night_minutes: 0.0,
            weekend_minutes: 0.0,
            tracked_minutes: None,
        }
    }

    /// Check bounds, metric signs and the engagement range
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_bounds("work", self.start, self.end)?;

        let minutes = [
            ("active_minutes", self.active_minutes),
            ("deep_work_minutes", self.deep_work_minutes),
            ("break_minutes", self.break_minutes),
            ("late_night_minutes", self.late_night_minutes),
            ("weekend_minutes", self.weekend_minutes),
        ];
        for (field, value) in minutes {
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteField { field });
            }
            if value < 0.0 {
                return Err(ValidationError::NegativeField { field, value });
            }
        }

        if let Some(engagement) = self.engagement_score {
            if !(0.0..=1.0).contains(&engagement) {
                return Err(ValidationError::EngagementOutOfRange(engagement));
            }
        }

        if let Some(tracked) = self.tracked_minutes {
            if tracked.is_nan() || tracked <= 0.0 {
                return Err(ValidationError::NonPositiveTrackedMinutes(tracked));
            }
        }

        Ok(())
    }

    /// Minutes tracked by this session: the declared value, else its length
    pub fn effective_tracked_minutes(&self) -> f64 {
        self.tracked_minutes
            .unwrap_or_else(|| (self.end - self.start).num_milliseconds() as f64 / 60_000.0)
    }

    /// Session as stored after ingestion.
    ///
    /// Active, deep work and break minutes are clamped into `[0, tracked]`,
    /// late-night and weekend minutes floored at 0, and every minute field
    /// rounded to 2 decimals. `tracked_minutes` is filled in from the bounds
    /// when the producer left it out.
    pub fn clamped_to_tracked(self) -> Self {
        let tracked = self.effective_tracked_minutes().max(0.0);
        let cap = |value: f64| round_to(value.clamp(0.0, tracked), 2);
        let floor = |value: f64| round_to(value.max(0.0), 2);

        Self {
            active_minutes: cap(self.active_minutes),
            deep_work_minutes: cap(self.deep_work_minutes),
            break_minutes: cap(self.break_minutes),
            late_night_minutes: floor(self.late_night_minutes),
            weekend_minutes: floor(self.weekend_minutes),
            tracked_minutes: Some(round_to(tracked, 2)),
            ..self
        }
    }
}

fn check_bounds(
    kind: &'static str,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<(), ValidationError> {
    if end <= start {
        return Err(ValidationError::NonPositiveDuration {
            kind,
            start: start.format(TIMESTAMP_FORMAT).to_string(),
            end: end.format(TIMESTAMP_FORMAT).to_string(),
        });
    }
    Ok(())
}

/// Either kind of activity interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityInterval {
    Idle(IdleInterval),
    Work(WorkInterval),
}

impl ActivityInterval {
    pub fn start(&self) -> NaiveDateTime {
        match self {
            ActivityInterval::Idle(idle) => idle.start,
            ActivityInterval::Work(work) => work.start,
        }
    }

    pub fn end(&self) -> NaiveDateTime {
        match self {
            ActivityInterval::Idle(idle) => idle.end,
            ActivityInterval::Work(work) => work.end,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ActivityInterval::Idle(_) => "idle",
            ActivityInterval::Work(_) => "work",
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            ActivityInterval::Idle(idle) => idle.validate(),
            ActivityInterval::Work(work) => work.validate(),
        }
    }

    /// Interval as stored after ingestion; idle intervals pass through
    pub fn normalized(self) -> Self {
        match self {
            ActivityInterval::Work(work) => ActivityInterval::Work(work.clamped_to_tracked()),
            idle => idle,
        }
    }
}

/// An interval tagged with the user it belongs to (one line of input)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalRecord {
    pub user_id: String,
    #[serde(flatten)]
    pub interval: ActivityInterval,
}

// ============================================================================
// Derived values
// ============================================================================

/// One calendar day of intervals reduced to additive totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    /// Number of idle intervals overlapping the day
    pub isolation_count: u32,
    pub total_isolation_minutes: f64,
    pub avg_isolation_duration_minutes: f64,
    pub longest_isolation_minutes: f64,
    /// In-day overlap of all work intervals (minutes)
    pub tracked_minutes: f64,
    pub active_minutes: f64,
    pub deep_work_minutes: f64,
    /// Ratio-redistributed, so may be fractional
    pub context_switch_count: f64,
    pub assigned_tasks: f64,
    pub completed_tasks: f64,
    pub break_minutes: f64,
    pub late_night_minutes: f64,
    pub weekend_minutes: f64,
    /// Overlap-weighted engagement; absent when no interval supplied one
    pub engagement_score: Option<f64>,
}

/// Dimensionless daily features, each bounded to 0-1
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub deep_work_norm: f64,
    pub engagement_norm: f64,
    pub task_completion_norm: f64,
    pub switch_norm: f64,
    pub isolation_rate: f64,
    pub tracked_minutes: f64,
    pub active_minutes: f64,
    pub deep_work_minutes: f64,
}

/// Weighted contributions behind a productivity score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub deep_work_component: f64,
    pub engagement_component: f64,
    pub task_component: f64,
    pub switch_penalty_component: f64,
    /// Weighted sum before clamping to 0-1
    pub score_raw: f64,
}

/// Productivity score (0-100) with its component breakdown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Daily summary document exposed to HTTP/CLI layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub user_id: String,
    pub date: NaiveDate,
    pub isolation_count: u32,
    pub total_isolation_minutes: f64,
    pub avg_isolation_duration_minutes: f64,
    pub longest_isolation_minutes: f64,
    pub isolation_rate: f64,
    pub tracked_minutes: f64,
    pub active_minutes: f64,
    pub deep_work_minutes: f64,
    pub deep_work_norm: f64,
    pub engagement_norm: f64,
    pub task_completion_norm: f64,
    pub switch_norm: f64,
    pub productivity_score: f64,
    pub breakdown: ScoreBreakdown,
    pub break_minutes: f64,
    pub late_night_minutes: f64,
    pub weekend_minutes: f64,
}

impl DailySummary {
    /// Assemble the summary document from the pipeline stages
    pub fn compose(
        user_id: &str,
        date: NaiveDate,
        aggregate: &DailyAggregate,
        features: &FeatureVector,
        score: ScoreResult,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            date,
            isolation_count: aggregate.isolation_count,
            total_isolation_minutes: aggregate.total_isolation_minutes,
            avg_isolation_duration_minutes: aggregate.avg_isolation_duration_minutes,
            longest_isolation_minutes: aggregate.longest_isolation_minutes,
            isolation_rate: features.isolation_rate,
            tracked_minutes: features.tracked_minutes,
            active_minutes: features.active_minutes,
            deep_work_minutes: features.deep_work_minutes,
            deep_work_norm: features.deep_work_norm,
            engagement_norm: features.engagement_norm,
            task_completion_norm: features.task_completion_norm,
            switch_norm: features.switch_norm,
            productivity_score: score.score,
            breakdown: score.breakdown,
            break_minutes: aggregate.break_minutes,
            late_night_minutes: aggregate.late_night_minutes,
            weekend_minutes: aggregate.weekend_minutes,
        }
    }
}

/// Per-day inputs to burnout analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BurnoutSignals {
    pub late_night_minutes: f64,
    pub weekend_minutes: f64,
    pub engagement_norm: f64,
    pub break_minutes: f64,
    pub tracked_minutes: f64,
    pub deep_work_minutes: f64,
}

impl From<&DailySummary> for BurnoutSignals {
    fn from(summary: &DailySummary) -> Self {
        Self {
            late_night_minutes: summary.late_night_minutes,
            weekend_minutes: summary.weekend_minutes,
            engagement_norm: summary.engagement_norm,
            break_minutes: summary.break_minutes,
            tracked_minutes: summary.tracked_minutes,
            deep_work_minutes: summary.deep_work_minutes,
        }
    }
}

/// Per-day inputs to anomaly detection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalySignals {
    pub deep_work_norm: f64,
    pub engagement_norm: f64,
    pub task_completion_norm: f64,
    pub switch_norm: f64,
    pub isolation_rate: f64,
    pub productivity_score: f64,
}

impl AnomalySignals {
    /// Number of features the outlier model sees
    pub const FEATURE_COUNT: usize = 5;

    /// Feature row in model column order
    pub fn feature_row(&self) -> Vec<f64> {
        vec![
            self.deep_work_norm,
            self.engagement_norm,
            self.task_completion_norm,
            self.switch_norm,
            self.isolation_rate,
        ]
    }
}

impl From<&DailySummary> for AnomalySignals {
    fn from(summary: &DailySummary) -> Self {
        Self {
            deep_work_norm: summary.deep_work_norm,
            engagement_norm: summary.engagement_norm,
            task_completion_norm: summary.task_completion_norm,
            switch_norm: summary.switch_norm,
            isolation_rate: summary.isolation_rate,
            productivity_score: summary.productivity_score,
        }
    }
}

/// Burnout risk classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Map a count of triggered rules to a level
    pub fn from_risk_score(risk_score: u32) -> Self {
        match risk_score {
            0 | 1 => RiskLevel::Low,
            2 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

/// Burnout report document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnoutReport {
    pub risk_level: RiskLevel,
    /// Number of triggered rules
    pub risk_score: u32,
    /// Human-readable trigger descriptions, never empty
    pub factors: Vec<String>,
    pub lookback_days: u32,
}

/// Which detection path produced an anomaly report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyMethod {
    Model,
    Statistical,
    InsufficientData,
}

/// Anomaly report document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub is_anomaly: bool,
    pub method: AnomalyMethod,
    /// Decision margin for `model` (lower is more anomalous), z-score for `statistical`
    pub anomaly_score: f64,
    pub details: String,
    pub lookback_days: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_interval_record_deserialization() {
        let json = r#"{
            "user_id": "user-1",
            "kind": "work",
            "start": "2024-01-15T09:00:00Z",
            "end": "2024-01-15T13:00:00Z",
            "active_minutes": 200,
            "deep_work_minutes": 150,
            "context_switch_count": 10,
            "assigned_tasks": 4,
            "completed_tasks": 3
        }"#;

        let record: IntervalRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.user_id, "user-1");
        match record.interval {
            ActivityInterval::Work(work) => {
                assert_eq!(work.active_minutes, 200.0);
                assert_eq!(work.context_switch_count, 10);
                assert_eq!(work.engagement_score, None);
                assert_eq!(work.break_minutes, 0.0);
            }
            other => panic!("expected work interval, got {:?}", other),
        }
    }

    #[test]
    fn test_offset_timestamps_normalize_to_utc() {
        let json = r#"{
            "user_id": "user-1",
            "kind": "idle",
            "start": "2024-01-15T10:00:00+02:00",
            "end": "2024-01-15T08:30:00"
        }"#;

        let record: IntervalRecord = serde_json::from_str(json).unwrap();
        let expected_start = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert_eq!(record.interval.start(), expected_start);
        assert_eq!(record.interval.kind(), "idle");
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        let json = r#"{"user_id": "u", "kind": "idle", "start": "yesterday", "end": "today"}"#;
        assert!(serde_json::from_str::<IntervalRecord>(json).is_err());
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_interval_bounds_validation() {
        assert!(IdleInterval::new(at(9, 0), at(9, 30)).validate().is_ok());
        assert!(matches!(
            IdleInterval::new(at(9, 30), at(9, 30)).validate(),
            Err(ValidationError::NonPositiveDuration { kind: "idle", .. })
        ));
        assert!(matches!(
            WorkInterval::new(at(10, 0), at(9, 0)).validate(),
            Err(ValidationError::NonPositiveDuration { kind: "work", .. })
        ));
    }

    #[test]
    fn test_work_metric_validation() {
        let negative = WorkInterval {
            break_minutes: -1.0,
            ..WorkInterval::new(at(9, 0), at(10, 0))
        };
        assert_eq!(
            negative.validate(),
            Err(ValidationError::NegativeField {
                field: "break_minutes",
                value: -1.0
            })
        );

        let engagement = WorkInterval {
            engagement_score: Some(1.2),
            ..WorkInterval::new(at(9, 0), at(10, 0))
        };
        assert_eq!(
            engagement.validate(),
            Err(ValidationError::EngagementOutOfRange(1.2))
        );

        let tracked = WorkInterval {
            tracked_minutes: Some(0.0),
            ..WorkInterval::new(at(9, 0), at(10, 0))
        };
        assert_eq!(
            tracked.validate(),
            Err(ValidationError::NonPositiveTrackedMinutes(0.0))
        );
    }

    #[test]
    fn test_enum_serialization() {
        assert_eq!(serde_json::to_string(&RiskLevel::Medium).unwrap(), "\"medium\"");
        assert_eq!(
            serde_json::to_string(&AnomalyMethod::InsufficientData).unwrap(),
            "\"insufficient_data\""
        );
    }

    #[test]
    fn test_risk_level_thresholds() {
        assert_eq!(RiskLevel::from_risk_score(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_risk_score(1), RiskLevel::Low);
        assert_eq!(RiskLevel::from_risk_score(2), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_risk_score(3), RiskLevel::High);
        assert_eq!(RiskLevel::from_risk_score(4), RiskLevel::High);
    }

    #[test]
    fn test_minutes_clamped_to_interval_length() {
        let work = WorkInterval {
            active_minutes: 500.0,
            deep_work_minutes: 300.0,
            break_minutes: 400.0,
            late_night_minutes: 30.123,
            ..WorkInterval::new(at(9, 0), at(13, 0))
        }
        .clamped_to_tracked();

        assert_eq!(work.tracked_minutes, Some(240.0));
        assert_eq!(work.active_minutes, 240.0);
        assert_eq!(work.deep_work_minutes, 240.0);
        assert_eq!(work.break_minutes, 240.0);
        assert_eq!(work.late_night_minutes, 30.12);
    }

    #[test]
    fn test_declared_tracked_minutes_caps_metrics() {
        let work = WorkInterval {
            active_minutes: 150.0,
            deep_work_minutes: 80.456,
            tracked_minutes: Some(100.0),
            ..WorkInterval::new(at(9, 0), at(13, 0))
        }
        .clamped_to_tracked();

        assert_eq!(work.tracked_minutes, Some(100.0));
        assert_eq!(work.active_minutes, 100.0);
        assert_eq!(work.deep_work_minutes, 80.46);
        assert_eq!(work.start, at(9, 0));
    }

    #[test]
    fn test_idle_interval_normalizes_unchanged() {
        let idle = ActivityInterval::Idle(IdleInterval::new(at(12, 0), at(12, 30)));
        assert_eq!(idle.clone().normalized(), idle);
    }
}
