//! Daily interval aggregation
//!
//! Reduces the idle and work intervals that overlap one calendar day into a
//! single `DailyAggregate`. Work metrics are apportioned to the day by the
//! fraction of each session that falls inside it, so a session spanning
//! midnight contributes proportionally to both days.

use crate::error::ValidationError;
use crate::numeric::{round_to, safe_divide};
use crate::types::{DailyAggregate, IdleInterval, WorkInterval};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

/// Half-open `[start, end)` bounds of one calendar day in naive UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DayWindow {
    /// Bounds of `date`; `None` when the next midnight is not representable
    pub fn for_date(date: NaiveDate) -> Option<Self> {
        let start = date.and_time(NaiveTime::MIN);
        let end = start.checked_add_signed(Duration::days(1))?;
        Some(Self { date, start, end })
    }
}

/// Minutes from `start` to `end`, floored at 0
pub fn minutes_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let minutes = (end - start).num_milliseconds() as f64 / 60_000.0;
    minutes.max(0.0)
}

/// Minutes of `[start, end)` that fall inside `[window_start, window_end)`
pub fn overlap_minutes(
    start: NaiveDateTime,
    end: NaiveDateTime,
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
) -> f64 {
    let overlap_start = start.max(window_start);
    let overlap_end = end.min(window_end);
    if overlap_end <= overlap_start {
        return 0.0;
    }
    minutes_between(overlap_start, overlap_end)
}

/// Aggregator for one user-day of intervals
pub struct DailyAggregator;

impl DailyAggregator {
    /// Aggregate every interval overlapping `day`.
    ///
    /// Intervals outside the day contribute nothing. Any interval with
    /// `end <= start` or invalid metrics is rejected rather than skipped.
    pub fn aggregate(
        idle: &[IdleInterval],
        work: &[WorkInterval],
        day: &DayWindow,
    ) -> Result<DailyAggregate, ValidationError> {
        for interval in idle {
            interval.validate()?;
        }
        for interval in work {
            interval.validate()?;
        }

        let isolation = aggregate_idle(idle, day);
        let worked = work
            .iter()
            .fold(WorkAccumulator::default(), |acc, interval| {
                acc.absorb(interval, day)
            });

        debug!(
            date = %day.date,
            isolation_count = isolation.count,
            work_intervals = worked.contributing,
            tracked_minutes = worked.tracked_minutes,
            "Aggregated day"
        );

        Ok(DailyAggregate {
            isolation_count: isolation.count,
            total_isolation_minutes: round_to(isolation.total_minutes, 2),
            avg_isolation_duration_minutes: round_to(isolation.average_minutes(), 2),
            longest_isolation_minutes: round_to(isolation.longest_minutes, 2),
            tracked_minutes: round_to(worked.tracked_minutes, 2),
            active_minutes: round_to(worked.active_minutes, 2),
            deep_work_minutes: round_to(worked.deep_work_minutes, 2),
            context_switch_count: round_to(worked.context_switch_count, 2),
            assigned_tasks: round_to(worked.assigned_tasks, 2),
            completed_tasks: round_to(worked.completed_tasks, 2),
            break_minutes: round_to(worked.break_minutes, 2),
            late_night_minutes: round_to(worked.late_night_minutes, 2),
            weekend_minutes: round_to(worked.weekend_minutes, 2),
            engagement_score: worked.engagement_score().map(|e| round_to(e, 4)),
        })
    }
}

/// Isolation statistics for one day
struct IsolationStats {
    count: u32,
    total_minutes: f64,
    longest_minutes: f64,
}

impl IsolationStats {
    fn average_minutes(&self) -> f64 {
        safe_divide(self.total_minutes, self.count as f64)
    }
}

fn aggregate_idle(idle: &[IdleInterval], day: &DayWindow) -> IsolationStats {
    idle.iter()
        .map(|interval| overlap_minutes(interval.start, interval.end, day.start, day.end))
        .filter(|overlap| *overlap > 0.0)
        .fold(
            IsolationStats {
                count: 0,
                total_minutes: 0.0,
                longest_minutes: 0.0,
            },
            |stats, overlap| IsolationStats {
                count: stats.count + 1,
                total_minutes: stats.total_minutes + overlap,
                longest_minutes: stats.longest_minutes.max(overlap),
            },
        )
}

/// Running totals of ratio-redistributed work metrics
#[derive(Debug, Default)]
struct WorkAccumulator {
    contributing: u32,
    tracked_minutes: f64,
    active_minutes: f64,
    deep_work_minutes: f64,
    context_switch_count: f64,
    assigned_tasks: f64,
    completed_tasks: f64,
    break_minutes: f64,
    late_night_minutes: f64,
    weekend_minutes: f64,
    engagement_weighted_sum: f64,
    engagement_weight: f64,
}

impl WorkAccumulator {
    fn absorb(mut self, interval: &WorkInterval, day: &DayWindow) -> Self {
        let overlap = overlap_minutes(interval.start, interval.end, day.start, day.end);
        if overlap <= 0.0 {
            return self;
        }

        let window_minutes = minutes_between(interval.start, interval.end);
        if window_minutes <= 0.0 {
            return self;
        }
        let ratio = overlap / window_minutes;

        self.contributing += 1;
        self.tracked_minutes += overlap;
        self.active_minutes += interval.active_minutes * ratio;
        self.deep_work_minutes += interval.deep_work_minutes * ratio;
        self.context_switch_count += interval.context_switch_count as f64 * ratio;
        self.assigned_tasks += interval.assigned_tasks as f64 * ratio;
        self.completed_tasks += interval.completed_tasks as f64 * ratio;
        self.break_minutes += interval.break_minutes * ratio;
        self.late_night_minutes += interval.late_night_minutes * ratio;
        self.weekend_minutes += interval.weekend_minutes * ratio;

        if let Some(engagement) = interval.engagement_score {
            self.engagement_weighted_sum += engagement * overlap;
            self.engagement_weight += overlap;
        }

        self
    }

    fn engagement_score(&self) -> Option<f64> {
        if self.engagement_weight > 0.0 {
            Some(self.engagement_weighted_sum / self.engagement_weight)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day() -> DayWindow {
        DayWindow::for_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()).unwrap()
    }

    fn at(day_offset: i64, hour: u32, minute: u32) -> NaiveDateTime {
        day().start + Duration::days(day_offset) + Duration::hours(hour as i64)
            + Duration::minutes(minute as i64)
    }

    fn make_morning_session() -> WorkInterval {
        WorkInterval {
            active_minutes: 200.0,
            deep_work_minutes: 150.0,
            context_switch_count: 10,
            assigned_tasks: 4,
            completed_tasks: 3,
            ..WorkInterval::new(at(0, 9, 0), at(0, 13, 0))
        }
    }

    #[test]
    fn test_day_window_bounds() {
        let window = day();
        assert_eq!(window.end - window.start, Duration::days(1));
        assert_eq!(minutes_between(window.start, window.end), 1440.0);
    }

    #[test]
    fn test_day_window_at_calendar_end() {
        assert!(DayWindow::for_date(NaiveDate::MAX).is_none());
        assert!(DayWindow::for_date(NaiveDate::MIN).is_some());
    }

    #[test]
    fn test_overlap_minutes() {
        let window = day();
        // Fully inside
        assert_eq!(overlap_minutes(at(0, 9, 0), at(0, 10, 0), window.start, window.end), 60.0);
        // Straddling the start of the day
        assert_eq!(overlap_minutes(at(-1, 23, 0), at(0, 0, 30), window.start, window.end), 30.0);
        // Entirely on the next day
        assert_eq!(overlap_minutes(at(1, 1, 0), at(1, 2, 0), window.start, window.end), 0.0);
        // Touching the end boundary only
        assert_eq!(overlap_minutes(at(1, 0, 0), at(1, 1, 0), window.start, window.end), 0.0);
    }

    #[test]
    fn test_empty_day_is_all_zero() {
        let aggregate = DailyAggregator::aggregate(&[], &[], &day()).unwrap();
        assert_eq!(aggregate, DailyAggregate::default());
        assert!(aggregate.engagement_score.is_none());
    }

    #[test]
    fn test_single_session_within_day() {
        let aggregate = DailyAggregator::aggregate(&[], &[make_morning_session()], &day()).unwrap();

        assert_eq!(aggregate.tracked_minutes, 240.0);
        assert_eq!(aggregate.active_minutes, 200.0);
        assert_eq!(aggregate.deep_work_minutes, 150.0);
        assert_eq!(aggregate.context_switch_count, 10.0);
        assert_eq!(aggregate.assigned_tasks, 4.0);
        assert_eq!(aggregate.completed_tasks, 3.0);
        assert_eq!(aggregate.isolation_count, 0);
    }

    #[test]
    fn test_idle_statistics() {
        let idle = vec![
            IdleInterval::new(at(0, 10, 0), at(0, 10, 30)),
            IdleInterval::new(at(0, 14, 0), at(0, 15, 0)),
            // 30 of its 90 minutes fall on this day
            IdleInterval::new(at(-1, 23, 0), at(0, 0, 30)),
            // Outside the day entirely
            IdleInterval::new(at(1, 9, 0), at(1, 10, 0)),
        ];

        let aggregate = DailyAggregator::aggregate(&idle, &[], &day()).unwrap();
        assert_eq!(aggregate.isolation_count, 3);
        assert_eq!(aggregate.total_isolation_minutes, 120.0);
        assert_eq!(aggregate.avg_isolation_duration_minutes, 40.0);
        assert_eq!(aggregate.longest_isolation_minutes, 60.0);
    }

    #[test]
    fn test_session_split_across_midnight() {
        let overnight = WorkInterval {
            active_minutes: 120.0,
            deep_work_minutes: 90.0,
            context_switch_count: 3,
            assigned_tasks: 1,
            completed_tasks: 1,
            late_night_minutes: 200.0,
            ..WorkInterval::new(at(0, 22, 0), at(1, 2, 0))
        };

        let first = DailyAggregator::aggregate(&[], &[overnight.clone()], &day()).unwrap();
        let next_day = DayWindow::for_date(day().date.succ_opt().unwrap()).unwrap();
        let second = DailyAggregator::aggregate(&[], &[overnight], &next_day).unwrap();

        assert_eq!(first.tracked_minutes, 120.0);
        assert_eq!(second.tracked_minutes, 120.0);
        assert_eq!(first.active_minutes, 60.0);
        assert_eq!(first.active_minutes + second.active_minutes, 120.0);
        assert_eq!(first.deep_work_minutes + second.deep_work_minutes, 90.0);
        assert_eq!(first.late_night_minutes + second.late_night_minutes, 200.0);
        // Counts are apportioned too
        assert_eq!(first.context_switch_count, 1.5);
        assert_eq!(first.assigned_tasks, 0.5);
    }

    #[test]
    fn test_engagement_is_overlap_weighted() {
        let work = vec![
            WorkInterval {
                engagement_score: Some(0.9),
                ..WorkInterval::new(at(0, 8, 0), at(0, 9, 0))
            },
            WorkInterval {
                engagement_score: Some(0.6),
                ..WorkInterval::new(at(0, 10, 0), at(0, 12, 0))
            },
            // No score: excluded from both numerator and denominator
            WorkInterval::new(at(0, 13, 0), at(0, 17, 0)),
        ];

        let aggregate = DailyAggregator::aggregate(&[], &work, &day()).unwrap();
        // (0.9 * 60 + 0.6 * 120) / 180
        assert_eq!(aggregate.engagement_score, Some(0.7));
        assert_eq!(aggregate.tracked_minutes, 420.0);
    }

    #[test]
    fn test_invalid_interval_is_surfaced() {
        let reversed = WorkInterval::new(at(0, 13, 0), at(0, 9, 0));
        let result = DailyAggregator::aggregate(&[], &[reversed], &day());
        assert!(matches!(
            result,
            Err(ValidationError::NonPositiveDuration { kind: "work", .. })
        ));

        let zero_length = IdleInterval::new(at(0, 9, 0), at(0, 9, 0));
        assert!(DailyAggregator::aggregate(&[zero_length], &[], &day()).is_err());
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let idle = vec![IdleInterval::new(at(0, 12, 0), at(0, 12, 45))];
        let work = vec![
            make_morning_session(),
            WorkInterval {
                engagement_score: Some(0.55),
                break_minutes: 20.0,
                ..WorkInterval::new(at(0, 14, 0), at(0, 18, 20))
            },
        ];

        let first = DailyAggregator::aggregate(&idle, &work, &day()).unwrap();
        let second = DailyAggregator::aggregate(&idle, &work, &day()).unwrap();
        assert_eq!(first, second);
    }
}
