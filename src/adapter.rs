//! Interval record ingestion
//!
//! Parses interval records from a JSON array or NDJSON and checks them against
//! the ingestion rules before they reach an interval source.

use crate::aggregator::minutes_between;
use crate::config::Targets;
use crate::error::{AnalyticsError, ValidationError};
use crate::types::{ActivityInterval, IntervalRecord};
use serde::Serialize;

/// Input layouts accepted by [`IntervalAdapter::parse`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// One JSON object per line
    Ndjson,
    /// A single JSON array
    JsonArray,
}

/// Adapter for parsing interval records
pub struct IntervalAdapter;

impl IntervalAdapter {
    /// Parse input in the given layout
    pub fn parse(input: &str, format: InputFormat) -> Result<Vec<IntervalRecord>, AnalyticsError> {
        match format {
            InputFormat::Ndjson => Self::parse_ndjson(input),
            InputFormat::JsonArray => Self::parse_array(input),
        }
    }

    /// Parse a JSON string containing an array of interval records
    pub fn parse_array(json: &str) -> Result<Vec<IntervalRecord>, AnalyticsError> {
        let records: Vec<IntervalRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing interval records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<IntervalRecord>, AnalyticsError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<IntervalRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(AnalyticsError::Parse(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }
}

/// Ingestion rules for interval records
pub struct IntervalValidator;

impl IntervalValidator {
    /// Check one record: structure first, then the idle threshold
    pub fn validate(record: &IntervalRecord, targets: &Targets) -> Result<(), ValidationError> {
        record.interval.validate()?;

        if let ActivityInterval::Idle(idle) = &record.interval {
            let duration = minutes_between(idle.start, idle.end);
            if duration < targets.idle_threshold_minutes {
                return Err(ValidationError::IdleBelowThreshold {
                    threshold: targets.idle_threshold_minutes,
                    actual: duration,
                });
            }
        }
        Ok(())
    }

    /// Validate a batch, reporting only the failing records
    pub fn validate_records(records: &[IntervalRecord], targets: &Targets) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                Self::validate(record, targets)
                    .err()
                    .map(|error| ValidationResult {
                        index,
                        user_id: record.user_id.clone(),
                        kind: record.interval.kind(),
                        error: error.to_string(),
                    })
            })
            .collect()
    }

    /// Keep the valid records, returning the failures alongside
    pub fn partition(
        records: Vec<IntervalRecord>,
        targets: &Targets,
    ) -> (Vec<IntervalRecord>, Vec<ValidationResult>) {
        let mut valid = Vec::with_capacity(records.len());
        let mut failures = Vec::new();
        for (index, record) in records.into_iter().enumerate() {
            match Self::validate(&record, targets) {
                Ok(()) => valid.push(record),
                Err(error) => failures.push(ValidationResult {
                    index,
                    user_id: record.user_id.clone(),
                    kind: record.interval.kind(),
                    error: error.to_string(),
                }),
            }
        }
        (valid, failures)
    }
}

/// One failing record in a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub index: usize,
    pub user_id: String,
    pub kind: &'static str,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_test_ndjson() -> &'static str {
        r#"{"user_id":"u1","kind":"work","start":"2024-01-15T09:00:00Z","end":"2024-01-15T13:00:00Z","active_minutes":200,"deep_work_minutes":150,"assigned_tasks":4,"completed_tasks":3,"context_switch_count":10}

{"user_id":"u1","kind":"idle","start":"2024-01-15T13:00:00Z","end":"2024-01-15T13:30:00Z"}
{"user_id":"u2","kind":"idle","start":"2024-01-15T14:00:00","end":"2024-01-15T14:02:00"}
"#
    }

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let records = IntervalAdapter::parse_ndjson(make_test_ndjson()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].interval.kind(), "work");
        assert_eq!(records[2].user_id, "u2");
    }

    #[test]
    fn test_parse_ndjson_reports_line_number() {
        let input = "{\"user_id\":\"u1\",\"kind\":\"idle\",\"start\":\"2024-01-15T13:00:00\",\"end\":\"2024-01-15T13:30:00\"}\n{not json}\n";
        match IntervalAdapter::parse_ndjson(input) {
            Err(AnalyticsError::Parse(message)) => assert!(message.contains("line 2")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_array() {
        let json = r#"[
            {"user_id":"u1","kind":"idle","start":"2024-01-15T13:00:00","end":"2024-01-15T13:30:00"},
            {"user_id":"u1","kind":"work","start":"2024-01-15T09:00:00","end":"2024-01-15T10:00:00"}
        ]"#;
        let records = IntervalAdapter::parse(json, InputFormat::JsonArray).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let json = r#"[{"user_id":"u1","kind":"meeting","start":"2024-01-15T13:00:00","end":"2024-01-15T13:30:00"}]"#;
        assert!(matches!(
            IntervalAdapter::parse_array(json),
            Err(AnalyticsError::Json(_))
        ));
    }

    #[test]
    fn test_validate_records_flags_short_idle() {
        let records = IntervalAdapter::parse_ndjson(make_test_ndjson()).unwrap();
        let failures = IntervalValidator::validate_records(&records, &Targets::default());
        assert_eq!(
            failures,
            vec![ValidationResult {
                index: 2,
                user_id: "u2".to_string(),
                kind: "idle",
                error: "Idle interval must be at least 5 minutes, got 2.00".to_string(),
            }]
        );
    }

    #[test]
    fn test_idle_exactly_at_threshold_is_accepted() {
        let json = r#"{"user_id":"u1","kind":"idle","start":"2024-01-15T13:00:00","end":"2024-01-15T13:05:00"}"#;
        let records = IntervalAdapter::parse_ndjson(json).unwrap();
        assert!(IntervalValidator::validate(&records[0], &Targets::default()).is_ok());
    }

    #[test]
    fn test_partition_keeps_valid_records() {
        let json = r#"[
            {"user_id":"u1","kind":"work","start":"2024-01-15T10:00:00","end":"2024-01-15T09:00:00"},
            {"user_id":"u1","kind":"work","start":"2024-01-15T09:00:00","end":"2024-01-15T10:00:00","engagement_score":1.5},
            {"user_id":"u1","kind":"work","start":"2024-01-15T09:00:00","end":"2024-01-15T10:00:00","tracked_minutes":0},
            {"user_id":"u1","kind":"work","start":"2024-01-15T11:00:00","end":"2024-01-15T12:00:00"}
        ]"#;
        let records = IntervalAdapter::parse_array(json).unwrap();
        let (valid, failures) = IntervalValidator::partition(records, &Targets::default());

        assert_eq!(valid.len(), 1);
        let indices: Vec<usize> = failures.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }
}
