//! Condition score from past-run features.
//!
//! Starts at 100, subtracts penalties for poor average finish, popularity,
//! margin and closing time, and adds bonuses for class level and for
//! distance/ground fit. Weights are tuned for the 5-run window averages.

use super::bounded;
use crate::types::FeatureVector;

/// Weights of the condition formula
pub struct ConditionWeights;

impl ConditionWeights {
    pub const FINISH_RANK: f64 = 2.0;
    pub const POPULARITY: f64 = 1.5;
    pub const MARGIN: f64 = 5.0;
    pub const CLOSING_TIME: f64 = 3.0;
    /// 上り at or under this costs nothing
    pub const CLOSING_BASELINE: f64 = 34.0;
    pub const RACE_LEVEL: f64 = 3.0;
    pub const DISTANCE_FIT: f64 = 1.0;
    pub const TRACK_FIT: f64 = 2.0;
}

/// Condition score in [0, 100], rounded to 2 decimals
pub fn condition_score(f: &FeatureVector) -> f64 {
    let closing_penalty = (f.avg_closing_time - ConditionWeights::CLOSING_BASELINE).max(0.0);

    let raw = 100.0
        - f.avg_finish_rank * ConditionWeights::FINISH_RANK
        - f.avg_popularity * ConditionWeights::POPULARITY
        - f.avg_margin * ConditionWeights::MARGIN
        - closing_penalty * ConditionWeights::CLOSING_TIME
        + f.avg_race_level * ConditionWeights::RACE_LEVEL
        + f.distance_fit * ConditionWeights::DISTANCE_FIT
        + f.track_fit * ConditionWeights::TRACK_FIT;

    bounded(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::FeatureBuilder;
    use proptest::prelude::*;

    #[test]
    fn test_empty_history_scores_zero() {
        let features = FeatureBuilder::build(&[]);
        assert_eq!(condition_score(&features), 0.0);
    }

    #[test]
    fn test_strong_form() {
        let features = FeatureVector {
            avg_finish_rank: 2.0,
            avg_popularity: 2.4,
            avg_margin: 0.1,
            avg_closing_time: 34.5,
            avg_race_level: 4.0,
            distance_fit: 1.0,
            track_fit: 3.0,
        };
        // 100 - 4 - 3.6 - 0.5 - 1.5 + 12 + 1 + 6 = 109.4 -> clamped
        assert_eq!(condition_score(&features), 100.0);
    }

    #[test]
    fn test_average_form() {
        let features = FeatureVector {
            avg_finish_rank: 6.0,
            avg_popularity: 7.0,
            avg_margin: 0.8,
            avg_closing_time: 35.2,
            avg_race_level: 1.0,
            distance_fit: -2.0,
            track_fit: 1.0,
        };
        // 100 - 12 - 10.5 - 4 - 3.6 + 3 - 2 + 2 = 72.9
        assert_eq!(condition_score(&features), 72.9);
    }

    proptest! {
        #[test]
        fn prop_condition_score_bounded(
            rank in -1e6f64..1e6,
            pop in -1e6f64..1e6,
            margin in -1e6f64..1e6,
            agari in -1e6f64..1e6,
            level in 0f64..6.0,
            dist in -5f64..5.0,
            track in 0f64..5.0,
        ) {
            let features = FeatureVector {
                avg_finish_rank: rank,
                avg_popularity: pop,
                avg_margin: margin,
                avg_closing_time: agari,
                avg_race_level: level,
                distance_fit: dist,
                track_fit: track,
            };
            let score = condition_score(&features);
            prop_assert!((0.0..=100.0).contains(&score));
        }
    }
}
