//! Pipeline orchestration
//!
//! This module provides the public API for Workload Flux. It reads intervals
//! from an [`IntervalSource`] and runs them through the stages:
//!
//! 1. DailyAggregator - Reduce one day's intervals to totals
//! 2. FeatureNormalizer - Map totals onto 0-1 features
//! 3. ProductivityScorer - Weighted 0-100 score
//! 4. BurnoutAnalyzer / AnomalyDetector - Trends over a lookback window

use crate::aggregator::{DailyAggregator, DayWindow};
use crate::anomaly::AnomalyDetector;
use crate::burnout::BurnoutAnalyzer;
use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::normalizer::FeatureNormalizer;
use crate::scorer::ProductivityScorer;
use crate::source::{IntervalSet, IntervalSource, TimeRange};
use crate::types::{AnomalyReport, AnomalySignals, BurnoutReport, BurnoutSignals, DailySummary};
use chrono::{Duration, NaiveDate};
use tracing::info;

/// Shortest lookback accepted for burnout analysis
pub const MIN_BURNOUT_LOOKBACK_DAYS: u32 = 2;

/// Shortest lookback accepted for anomaly analysis
pub const MIN_ANOMALY_LOOKBACK_DAYS: u32 = 3;

/// Longest lookback accepted for burnout analysis
pub const MAX_BURNOUT_LOOKBACK_DAYS: u32 = 90;

/// Longest lookback accepted for anomaly analysis
pub const MAX_ANOMALY_LOOKBACK_DAYS: u32 = 120;

/// Longest window of daily summaries one `history` call will build
pub const MAX_HISTORY_DAYS: u32 = 120;

/// Default lookback for burnout reports
pub const DEFAULT_BURNOUT_LOOKBACK_DAYS: u32 = 14;

/// Default lookback for anomaly reports
pub const DEFAULT_ANOMALY_LOOKBACK_DAYS: u32 = 30;

/// The `lookback_days` consecutive dates ending at `end_date`, oldest first.
///
/// Fails when the first date would fall before the start of the calendar.
pub fn date_range(
    end_date: NaiveDate,
    lookback_days: u32,
) -> Result<Vec<NaiveDate>, AnalyticsError> {
    if lookback_days == 0 {
        return Ok(Vec::new());
    }
    let start = end_date
        .checked_sub_signed(Duration::days(i64::from(lookback_days) - 1))
        .ok_or(AnalyticsError::DateOutOfRange(end_date))?;
    Ok(start.iter_days().take(lookback_days as usize).collect())
}

/// Report pipeline over an interval source.
///
/// Holds no state between calls beyond the source and configuration, so one
/// instance can serve any number of users and days.
pub struct AnalyticsPipeline<S> {
    source: S,
    config: AnalyticsConfig,
    detector: AnomalyDetector,
}

impl<S: IntervalSource> AnalyticsPipeline<S> {
    /// Create a pipeline with the given configuration
    pub fn new(source: S, config: AnalyticsConfig) -> Self {
        let detector = AnomalyDetector::new(&config.anomaly);
        Self {
            source,
            config,
            detector,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Summarize one user-day
    pub fn daily_summary(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<DailySummary, AnalyticsError> {
        let range = TimeRange::days(date, date).ok_or(AnalyticsError::DateOutOfRange(date))?;
        let intervals = self.source.get_intervals(user_id, &range)?;
        let summary = self.summarize(user_id, date, &intervals)?;

        info!(
            user_id,
            %date,
            productivity_score = summary.productivity_score,
            "Computed daily summary"
        );
        Ok(summary)
    }

    /// Burnout report over the window ending at `end_date`
    pub fn burnout_report(
        &self,
        user_id: &str,
        end_date: NaiveDate,
        lookback_days: u32,
    ) -> Result<BurnoutReport, AnalyticsError> {
        check_lookback(
            lookback_days,
            MIN_BURNOUT_LOOKBACK_DAYS,
            MAX_BURNOUT_LOOKBACK_DAYS,
        )?;

        let history = self.history(user_id, end_date, lookback_days)?;
        let signals: Vec<BurnoutSignals> = history.iter().map(BurnoutSignals::from).collect();
        let report = BurnoutAnalyzer::analyze(&signals, lookback_days);

        info!(
            user_id,
            %end_date,
            lookback_days,
            risk_score = report.risk_score,
            "Computed burnout report"
        );
        Ok(report)
    }

    /// Anomaly report for `date` against the preceding days of the window
    pub fn anomaly_report(
        &self,
        user_id: &str,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Result<AnomalyReport, AnalyticsError> {
        check_lookback(
            lookback_days,
            MIN_ANOMALY_LOOKBACK_DAYS,
            MAX_ANOMALY_LOOKBACK_DAYS,
        )?;

        let history = self.history(user_id, date, lookback_days)?;
        let signals: Vec<AnomalySignals> = history.iter().map(AnomalySignals::from).collect();
        let report = self.detector.detect(&signals, lookback_days);

        info!(
            user_id,
            %date,
            lookback_days,
            method = ?report.method,
            is_anomaly = report.is_anomaly,
            "Computed anomaly report"
        );
        Ok(report)
    }

    /// Daily summaries for every day of the window, oldest first.
    ///
    /// `lookback_days` must be between 1 and [`MAX_HISTORY_DAYS`].
    pub fn history(
        &self,
        user_id: &str,
        end_date: NaiveDate,
        lookback_days: u32,
    ) -> Result<Vec<DailySummary>, AnalyticsError> {
        check_lookback(lookback_days, 1, MAX_HISTORY_DAYS)?;

        let days = date_range(end_date, lookback_days)?;
        let (Some(&first), Some(&last)) = (days.first(), days.last()) else {
            return Ok(Vec::new());
        };

        // One read for the whole window; each day keeps only its own overlap
        let range = TimeRange::days(first, last).ok_or(AnalyticsError::DateOutOfRange(last))?;
        let intervals = self.source.get_intervals(user_id, &range)?;

        days.into_iter()
            .map(|day| self.summarize(user_id, day, &intervals))
            .collect()
    }

    fn summarize(
        &self,
        user_id: &str,
        date: NaiveDate,
        intervals: &IntervalSet,
    ) -> Result<DailySummary, AnalyticsError> {
        let window = DayWindow::for_date(date).ok_or(AnalyticsError::DateOutOfRange(date))?;
        let aggregate = DailyAggregator::aggregate(&intervals.idle, &intervals.work, &window)?;
        let features = FeatureNormalizer::normalize(&aggregate, &self.config.targets);
        let score = ProductivityScorer::score(&features, &self.config.weights);
        Ok(DailySummary::compose(
            user_id, date, &aggregate, &features, score,
        ))
    }
}

fn check_lookback(lookback_days: u32, minimum: u32, maximum: u32) -> Result<(), AnalyticsError> {
    if !(minimum..=maximum).contains(&lookback_days) {
        return Err(AnalyticsError::InvalidLookback {
            minimum,
            maximum,
            actual: lookback_days,
        });
    }
    Ok(())
}
