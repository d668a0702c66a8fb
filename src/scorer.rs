//! Productivity scoring
//!
//! Combines a feature vector into a single 0-100 score.
//!
//! Formula:
//! ```text
//! raw   = deep_work_weight  * deep_work_norm
//!       + engagement_weight * engagement_norm
//!       + task_weight       * task_completion_norm
//!       - switch_penalty    * switch_norm
//! score = round(clamp(raw, 0, 1) * 100, 2)
//! ```

use crate::config::ScoreWeights;
use crate::numeric::{clamp_unit, round_to};
use crate::types::{FeatureVector, ScoreBreakdown, ScoreResult};

/// Scorer for daily feature vectors
pub struct ProductivityScorer;

impl ProductivityScorer {
    /// Score a feature vector with the given weights
    pub fn score(features: &FeatureVector, weights: &ScoreWeights) -> ScoreResult {
        let deep_work_component = weights.deep_work_weight * features.deep_work_norm;
        let engagement_component = weights.engagement_weight * features.engagement_norm;
        let task_component = weights.task_weight * features.task_completion_norm;
        let switch_penalty_component = weights.switch_penalty * features.switch_norm;

        let score_raw =
            deep_work_component + engagement_component + task_component - switch_penalty_component;

        ScoreResult {
            score: round_to(clamp_unit(score_raw) * 100.0, 2),
            breakdown: ScoreBreakdown {
                deep_work_component: round_to(deep_work_component, 4),
                engagement_component: round_to(engagement_component, 4),
                task_component: round_to(task_component, 4),
                switch_penalty_component: round_to(switch_penalty_component, 4),
                score_raw: round_to(score_raw, 4),
            },
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: score stays in 0-100 for any unit features and non-negative weights
        #[test]
        fn test_score_is_bounded(
            deep in 0.0f64..=1.0,
            engagement in 0.0f64..=1.0,
            task in 0.0f64..=1.0,
            switch in 0.0f64..=1.0,
            w in proptest::array::uniform4(0.0f64..5.0),
        ) {
            let features = FeatureVector {
                deep_work_norm: deep,
                engagement_norm: engagement,
                task_completion_norm: task,
                switch_norm: switch,
                ..FeatureVector::default()
            };
            let weights = ScoreWeights {
                deep_work_weight: w[0],
                engagement_weight: w[1],
                task_weight: w[2],
                switch_penalty: w[3],
            };
            let result = ProductivityScorer::score(&features, &weights);
            prop_assert!((0.0..=100.0).contains(&result.score));
        }
    }
}
