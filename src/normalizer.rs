//! Feature normalization
//!
//! Maps a daily aggregate onto dimensionless features bounded to 0-1, using the
//! configured targets as saturation points.

use crate::config::Targets;
use crate::numeric::{clamp_unit, round_to, safe_divide};
use crate::types::{DailyAggregate, FeatureVector};

/// Normalizer for daily aggregates
pub struct FeatureNormalizer;

impl FeatureNormalizer {
    /// Normalize one day's aggregate into a feature vector
    pub fn normalize(aggregate: &DailyAggregate, targets: &Targets) -> FeatureVector {
        let tracked_minutes = aggregate.tracked_minutes.max(0.0);
        let active_minutes = aggregate.active_minutes.max(0.0);
        let deep_work_minutes = aggregate.deep_work_minutes.max(0.0);

        let deep_work_norm = clamp_unit(safe_divide(
            deep_work_minutes,
            targets.deep_work_target_minutes,
        ));

        // An explicit engagement score wins over the active/tracked ratio
        let engagement_norm = match aggregate.engagement_score {
            Some(score) => clamp_unit(score),
            None => clamp_unit(safe_divide(active_minutes, tracked_minutes)),
        };

        let task_completion_norm = compute_task_completion(
            aggregate.assigned_tasks.max(0.0),
            aggregate.completed_tasks.max(0.0),
        );

        let switch_norm = clamp_unit(safe_divide(
            aggregate.context_switch_count.max(0.0),
            targets.context_switch_target,
        ));

        let isolation_rate = clamp_unit(safe_divide(
            aggregate.total_isolation_minutes.max(0.0),
            tracked_minutes,
        ));

        FeatureVector {
            deep_work_norm: round_to(deep_work_norm, 4),
            engagement_norm: round_to(engagement_norm, 4),
            task_completion_norm: round_to(task_completion_norm, 4),
            switch_norm: round_to(switch_norm, 4),
            isolation_rate: round_to(isolation_rate, 4),
            tracked_minutes: round_to(tracked_minutes, 2),
            active_minutes: round_to(active_minutes, 2),
            deep_work_minutes: round_to(deep_work_minutes, 2),
        }
    }
}

/// Share of assigned tasks completed; 0 when nothing was assigned
fn compute_task_completion(assigned_tasks: f64, completed_tasks: f64) -> f64 {
    if assigned_tasks <= 0.0 {
        return 0.0;
    }
    clamp_unit(completed_tasks / assigned_tasks)
}
