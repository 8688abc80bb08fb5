//! Ranking combiner: base score plus ordering bonuses, sorted descending.

use std::cmp::Ordering;

use super::entry::jockey_bonus;
use crate::types::EntryRecord;

/// Ordering bonuses, independent of the entry score weights
pub struct RankingWeights;

impl RankingWeights {
    pub const GROUP_PER_STEP: f64 = 1.0;
    pub const JOCKEY_SCALE: f64 = 0.5;
    pub const ODDS_CEILING: f64 = 10.0;
    pub const ODDS_SCALE: f64 = 1.5;
    pub const NUMBER_PENALTY: f64 = 0.2;
}

/// Unbounded bonus added to a base score for ordering only
pub fn ranking_bonus(entry: &EntryRecord) -> f64 {
    let group = match entry.post_group {
        Some(g @ 1..=8) => f64::from(9 - g) * RankingWeights::GROUP_PER_STEP,
        _ => 0.0,
    };
    let jockey = jockey_bonus(&entry.jockey_name) * RankingWeights::JOCKEY_SCALE;
    let odds = match entry.odds {
        Some(o) if o.is_finite() && o > 0.0 => {
            (RankingWeights::ODDS_CEILING - o).max(0.0) * RankingWeights::ODDS_SCALE
        }
        _ => 0.0,
    };
    let number = entry
        .start_number
        .map(|n| -f64::from(n) * RankingWeights::NUMBER_PENALTY)
        .unwrap_or(0.0);

    group + jockey + odds + number
}

/// An item with its base and final ranking score
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<T> {
    pub item: T,
    pub base_score: f64,
    pub score: f64,
}

/// Add ranking bonuses and sort by final score, highest first.
///
/// The sort is stable: equal scores keep their input order.
pub fn rank<T, F>(scored: Vec<(T, f64)>, entry_of: F) -> Vec<Ranked<T>>
where
    F: Fn(&T) -> &EntryRecord,
{
    let mut ranked: Vec<Ranked<T>> = scored
        .into_iter()
        .map(|(item, base_score)| {
            let score = base_score + ranking_bonus(entry_of(&item));
            Ranked {
                item,
                base_score,
                score,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(name: &str, group: Option<u8>, number: Option<u8>, odds: Option<f64>) -> EntryRecord {
        EntryRecord {
            post_group: group,
            start_number: number,
            horse_name: name.to_string(),
            odds,
            ..Default::default()
        }
    }

    #[test]
    fn test_ranking_bonus() {
        let e = EntryRecord {
            jockey_name: "川田将雅".to_string(),
            ..entry("A", Some(1), Some(2), Some(4.0))
        };
        // 8 + 6 + 9 - 0.4
        assert!((ranking_bonus(&e) - 22.6).abs() < 1e-9);
        assert_eq!(ranking_bonus(&entry("B", None, None, None)), 0.0);
    }

    #[test]
    fn test_rank_sorts_descending() {
        let scored = vec![
            (entry("low", None, None, None), 10.0),
            (entry("high", None, None, None), 90.0),
            (entry("mid", None, None, None), 50.0),
        ];
        let ranked = rank(scored, |e| e);
        let names: Vec<_> = ranked.iter().map(|r| r.item.horse_name.as_str()).collect();
        assert_eq!(names, ["high", "mid", "low"]);
        assert_eq!(ranked[0].base_score, 90.0);
    }

    #[test]
    fn test_bonus_can_reorder() {
        let scored = vec![
            (entry("outside", Some(8), Some(16), Some(50.0)), 60.0),
            (entry("favourite", Some(1), Some(1), Some(1.5)), 55.0),
        ];
        let ranked = rank(scored, |e| e);
        assert_eq!(ranked[0].item.horse_name, "favourite");
        // 55 + 8 + 12.75 - 0.2
        assert!((ranked[0].score - 75.55).abs() < 1e-9);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let scored = vec![
            (entry("first", None, None, None), 40.0),
            (entry("second", None, None, None), 40.0),
            (entry("third", None, None, None), 40.0),
        ];
        let ranked = rank(scored, |e| e);
        let names: Vec<_> = ranked.iter().map(|r| r.item.horse_name.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    proptest! {
        #[test]
        fn prop_rank_is_stable(scores in proptest::collection::vec(0u8..5, 0..20)) {
            let scored: Vec<_> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| (entry(&i.to_string(), None, None, None), f64::from(*s)))
                .collect();
            let ranked = rank(scored, |e| e);

            for pair in ranked.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
                if pair[0].score == pair[1].score {
                    let a: usize = pair[0].item.horse_name.parse().unwrap();
                    let b: usize = pair[1].item.horse_name.parse().unwrap();
                    prop_assert!(a < b);
                }
            }
        }
    }
}
