//! Feature builder: past runs -> numeric feature vector.
//!
//! Every field parser returns an `Option`; unparseable values are left out of
//! the averages rather than counted as zero, and a field with no usable value
//! at all falls back to a default worse than any real observation.

use regex::Regex;
use std::sync::OnceLock;

use super::parsers::{classify_race, TRACK_CONDITIONS};
use crate::types::{FeatureVector, PastRunRecord};

/// Default values for missing data
pub struct Defaults;

impl Defaults {
    pub const FINISH_RANK: f64 = 99.0;
    pub const POPULARITY: f64 = 99.0;
    pub const MARGIN: f64 = 9.9;
    pub const CLOSING_TIME: f64 = 40.0; // 上り, slower than any real finish
    pub const RACE_LEVEL: f64 = 0.0;
}

/// Feature builder
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Build features from past runs, most recent first
    pub fn build(runs: &[PastRunRecord]) -> FeatureVector {
        FeatureVector {
            avg_finish_rank: Self::mean(runs.iter().filter_map(|r| r.finish_rank.map(f64::from)))
                .unwrap_or(Defaults::FINISH_RANK),
            avg_popularity: Self::mean(runs.iter().filter_map(|r| r.popularity_rank.map(f64::from)))
                .unwrap_or(Defaults::POPULARITY),
            avg_margin: Self::mean(runs.iter().filter_map(|r| r.margin)).unwrap_or(Defaults::MARGIN),
            avg_closing_time: Self::mean(runs.iter().filter_map(|r| r.closing_time))
                .unwrap_or(Defaults::CLOSING_TIME),
            avg_race_level: Self::mean(runs.iter().map(|r| f64::from(Self::race_level(r))))
                .unwrap_or(Defaults::RACE_LEVEL),
            distance_fit: Self::distance_fit(runs),
            track_fit: Self::track_fit(runs),
        }
    }

    /// Arithmetic mean over finite values; `None` if there are none
    fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
        let (sum, count) = values
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

        if count == 0 {
            return None;
        }
        Some(sum / count as f64).filter(|m| m.is_finite())
    }

    /// Class strength 0-6 from the class field, then the race name
    pub fn race_level(run: &PastRunRecord) -> u8 {
        classify_race(&run.race_class)
            .or_else(|| classify_race(&run.race_name))
            .map(|(_, level)| level)
            .unwrap_or(0)
    }

    /// Metres from "芝1800", "ダ1200m", "1800m"
    pub fn distance_meters(text: &str) -> Option<u32> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"(\d{3,4})").unwrap());
        re.captures(text).and_then(|caps| caps[1].parse().ok())
    }

    /// Sum of +1 (longer) / -1 (shorter) / 0 against the latest run's distance
    fn distance_fit(runs: &[PastRunRecord]) -> f64 {
        let Some(latest) = runs.first().and_then(|r| Self::distance_meters(&r.distance)) else {
            return 0.0;
        };

        runs.iter()
            .filter_map(|r| Self::distance_meters(&r.distance))
            .map(|d| match d.cmp(&latest) {
                std::cmp::Ordering::Greater => 1.0,
                std::cmp::Ordering::Less => -1.0,
                std::cmp::Ordering::Equal => 0.0,
            })
            .sum()
    }

    /// Count of runs on the same ground as the latest run
    fn track_fit(runs: &[PastRunRecord]) -> f64 {
        let Some(latest) = runs
            .first()
            .map(|r| r.track_condition.as_str())
            .filter(|c| TRACK_CONDITIONS.contains(c))
        else {
            return 0.0;
        };

        runs.iter().filter(|r| r.track_condition == latest).count() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn run(distance: &str, condition: &str, rank: Option<u32>) -> PastRunRecord {
        PastRunRecord {
            distance: distance.to_string(),
            track_condition: condition.to_string(),
            finish_rank: rank,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_history_uses_defaults() {
        let f = FeatureBuilder::build(&[]);
        assert_eq!(f.avg_finish_rank, 99.0);
        assert_eq!(f.avg_popularity, 99.0);
        assert_eq!(f.avg_margin, 9.9);
        assert_eq!(f.avg_closing_time, 40.0);
        assert_eq!(f.avg_race_level, 0.0);
        assert_eq!(f.distance_fit, 0.0);
        assert_eq!(f.track_fit, 0.0);
    }

    #[test]
    fn test_unparsed_values_excluded_from_mean() {
        let runs = vec![
            run("芝1600", "良", Some(1)),
            run("芝1600", "良", None),
            run("芝1600", "良", Some(5)),
        ];
        let f = FeatureBuilder::build(&runs);
        // (1 + 5) / 2, not (1 + 0 + 5) / 3
        assert_eq!(f.avg_finish_rank, 3.0);
        // No popularity parsed at all
        assert_eq!(f.avg_popularity, 99.0);
    }

    #[test]
    fn test_distance_fit_against_latest() {
        let runs = vec![
            run("芝1800", "良", Some(1)),
            run("芝2000", "良", Some(2)),
            run("芝1600", "良", Some(3)),
            run("ダ1200", "良", Some(4)),
            run("**", "良", Some(5)),
        ];
        let f = FeatureBuilder::build(&runs);
        // 0 (itself) + 1 - 1 - 1, unparseable skipped
        assert_eq!(f.distance_fit, -1.0);
    }

    #[test]
    fn test_track_fit_counts_same_condition() {
        let runs = vec![
            run("芝1800", "稍重", Some(1)),
            run("芝1800", "稍重", Some(1)),
            run("芝1800", "良", Some(1)),
            run("芝1800", "重", Some(1)),
        ];
        assert_eq!(FeatureBuilder::build(&runs).track_fit, 2.0);

        // Unknown latest condition gives no fit
        let runs = vec![run("芝1800", "", Some(1)), run("芝1800", "", Some(1))];
        assert_eq!(FeatureBuilder::build(&runs).track_fit, 0.0);
    }

    #[test]
    fn test_race_level() {
        let mut r = PastRunRecord {
            race_name: "有馬記念(G1)".to_string(),
            ..Default::default()
        };
        assert_eq!(FeatureBuilder::race_level(&r), 6);
        r.race_class = "OP".to_string();
        // Class field is consulted first
        assert_eq!(FeatureBuilder::race_level(&r), 3);
        assert_eq!(FeatureBuilder::race_level(&PastRunRecord::default()), 0);
    }

    #[test]
    fn test_distance_meters() {
        assert_eq!(FeatureBuilder::distance_meters("芝1800"), Some(1800));
        assert_eq!(FeatureBuilder::distance_meters("ダ1200m"), Some(1200));
        assert_eq!(FeatureBuilder::distance_meters("障3000"), Some(3000));
        assert_eq!(FeatureBuilder::distance_meters(""), None);
    }

    fn arb_run() -> impl Strategy<Value = PastRunRecord> {
        (
            ".{0,8}",
            ".{0,8}",
            ".{0,8}",
            proptest::option::of(any::<u32>()),
            proptest::option::of(any::<f64>()),
            proptest::option::of(any::<f64>()),
            proptest::option::of(any::<u32>()),
        )
            .prop_map(|(race_name, distance, track_condition, finish_rank, closing_time, margin, popularity_rank)| {
                PastRunRecord {
                    race_name,
                    distance,
                    track_condition,
                    finish_rank,
                    closing_time,
                    margin,
                    popularity_rank,
                    ..Default::default()
                }
            })
    }

    proptest! {
        #[test]
        fn prop_features_always_finite(runs in proptest::collection::vec(arb_run(), 0..6)) {
            let f = FeatureBuilder::build(&runs);
            for v in [
                f.avg_finish_rank,
                f.avg_popularity,
                f.avg_margin,
                f.avg_closing_time,
                f.avg_race_level,
                f.distance_fit,
                f.track_fit,
            ] {
                prop_assert!(v.is_finite());
            }
        }
    }
}
