//! Interval source
//!
//! The pipeline reads intervals through [`IntervalSource`]; durable storage is
//! somebody else's concern. [`InMemoryIntervalSource`] backs the CLI and tests.

use crate::error::AnalyticsError;
use crate::types::{ActivityInterval, IdleInterval, IntervalRecord, WorkInterval};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;

/// Half-open time range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    /// Range covering whole calendar days `first..=last`.
    ///
    /// `None` when the midnight after `last` is not representable.
    pub fn days(first: NaiveDate, last: NaiveDate) -> Option<Self> {
        let start = first.and_time(NaiveTime::MIN);
        let end = last
            .and_time(NaiveTime::MIN)
            .checked_add_signed(Duration::days(1))?;
        Some(Self { start, end })
    }

    /// Whether `[start, end)` overlaps this range
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        start < self.end && end > self.start
    }
}

/// Intervals returned by a range query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalSet {
    pub idle: Vec<IdleInterval>,
    pub work: Vec<WorkInterval>,
}

impl IntervalSet {
    pub fn is_empty(&self) -> bool {
        self.idle.is_empty() && self.work.is_empty()
    }

    pub fn len(&self) -> usize {
        self.idle.len() + self.work.len()
    }
}

/// Read-only access to stored intervals
pub trait IntervalSource {
    /// Every interval of `user_id` overlapping `range`, ordered by start
    fn get_intervals(&self, user_id: &str, range: &TimeRange)
        -> Result<IntervalSet, AnalyticsError>;
}

impl<S: IntervalSource + ?Sized> IntervalSource for &S {
    fn get_intervals(
        &self,
        user_id: &str,
        range: &TimeRange,
    ) -> Result<IntervalSet, AnalyticsError> {
        (**self).get_intervals(user_id, range)
    }
}

/// Interval store held in memory, keyed by user
#[derive(Debug, Clone, Default)]
pub struct InMemoryIntervalSource {
    users: HashMap<String, IntervalSet>,
}

impl InMemoryIntervalSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source from records, rejecting the first invalid one
    pub fn from_records<I>(records: I) -> Result<Self, AnalyticsError>
    where
        I: IntoIterator<Item = IntervalRecord>,
    {
        let mut source = Self::new();
        for record in records {
            source.insert(record)?;
        }
        Ok(source)
    }

    /// Store one record after structural validation.
    ///
    /// Work minutes are clamped to the session's tracked time before storing.
    pub fn insert(&mut self, record: IntervalRecord) -> Result<(), AnalyticsError> {
        record.interval.validate()?;
        let set = self.users.entry(record.user_id).or_default();
        match record.interval.normalized() {
            ActivityInterval::Idle(idle) => set.idle.push(idle),
            ActivityInterval::Work(work) => set.work.push(work),
        }
        Ok(())
    }

    /// Users with at least one stored interval, sorted
    pub fn users(&self) -> Vec<&str> {
        let mut users: Vec<&str> = self.users.keys().map(String::as_str).collect();
        users.sort_unstable();
        users
    }

    pub fn len(&self) -> usize {
        self.users.values().map(IntervalSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IntervalSource for InMemoryIntervalSource {
    fn get_intervals(
        &self,
        user_id: &str,
        range: &TimeRange,
    ) -> Result<IntervalSet, AnalyticsError> {
        let Some(stored) = self.users.get(user_id) else {
            return Ok(IntervalSet::default());
        };

        let mut idle: Vec<IdleInterval> = stored
            .idle
            .iter()
            .filter(|i| range.overlaps(i.start, i.end))
            .cloned()
            .collect();
        idle.sort_by_key(|i| i.start);

        let mut work: Vec<WorkInterval> = stored
            .work
            .iter()
            .filter(|w| range.overlaps(w.start, w.end))
            .cloned()
            .collect();
        work.sort_by_key(|w| w.start);

        Ok(IntervalSet { idle, work })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn work_record(user: &str, start: NaiveDateTime, end: NaiveDateTime) -> IntervalRecord {
        IntervalRecord {
            user_id: user.to_string(),
            interval: ActivityInterval::Work(WorkInterval::new(start, end)),
        }
    }

    fn idle_record(user: &str, start: NaiveDateTime, end: NaiveDateTime) -> IntervalRecord {
        IntervalRecord {
            user_id: user.to_string(),
            interval: ActivityInterval::Idle(IdleInterval::new(start, end)),
        }
    }

    #[test]
    fn test_day_range() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let range = TimeRange::days(day, day).unwrap();
        assert_eq!(range.start, at(15, 0, 0));
        assert_eq!(range.end, at(16, 0, 0));
        assert!(TimeRange::days(NaiveDate::MAX, NaiveDate::MAX).is_none());
    }

    #[test]
    fn test_query_returns_overlapping_intervals() {
        let source = InMemoryIntervalSource::from_records(vec![
            work_record("u1", at(15, 22, 0), at(16, 2, 0)),
            work_record("u1", at(16, 9, 0), at(16, 10, 0)),
            // Ends exactly at the range start
            work_record("u1", at(15, 20, 0), at(16, 0, 0)),
            idle_record("u1", at(16, 12, 0), at(16, 12, 30)),
            work_record("u2", at(16, 9, 0), at(16, 10, 0)),
        ])
        .unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        let set = source.get_intervals("u1", &TimeRange::days(day, day).unwrap()).unwrap();

        assert_eq!(set.work.len(), 2);
        assert_eq!(set.work[0].start, at(15, 22, 0));
        assert_eq!(set.work[1].start, at(16, 9, 0));
        assert_eq!(set.idle.len(), 1);
        assert_eq!(source.users(), vec!["u1", "u2"]);
        assert_eq!(source.len(), 5);
    }

    #[test]
    fn test_unknown_user_is_empty() {
        let source = InMemoryIntervalSource::new();
        let day = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        let set = source.get_intervals("nobody", &TimeRange::days(day, day).unwrap()).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_insert_rejects_reversed_interval() {
        let mut source = InMemoryIntervalSource::new();
        let err = source
            .insert(work_record("u1", at(15, 10, 0), at(15, 9, 0)))
            .unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::Validation(ValidationError::NonPositiveDuration { .. })
        ));
        assert!(source.is_empty());
    }

    #[test]
    fn test_insert_clamps_work_minutes() {
        let mut record = work_record("u1", at(15, 9, 0), at(15, 13, 0));
        if let ActivityInterval::Work(work) = &mut record.interval {
            work.active_minutes = 500.0;
            work.break_minutes = 400.0;
        }
        let source = InMemoryIntervalSource::from_records(vec![record]).unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let set = source.get_intervals("u1", &TimeRange::days(day, day).unwrap()).unwrap();
        assert_eq!(set.work[0].active_minutes, 240.0);
        assert_eq!(set.work[0].break_minutes, 240.0);
        assert_eq!(set.work[0].tracked_minutes, Some(240.0));
    }
}
