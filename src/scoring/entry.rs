//! Pre-race entry score from the race card alone.

use super::bounded;
use crate::types::EntryRecord;

/// Jockeys with a bonus, checked in order; first substring match wins
pub const JOCKEY_BONUS: [(&str, f64); 10] = [
    ("ルメール", 15.0),
    ("モレイラ", 14.0),
    ("川田", 12.0),
    ("武豊", 10.0),
    ("坂井", 8.0),
    ("戸崎", 8.0),
    ("横山武", 8.0),
    ("松山", 6.0),
    ("岩田望", 6.0),
    ("西村淳", 5.0),
];

/// Bonus for a known jockey, 0 if unknown
pub fn jockey_bonus(name: &str) -> f64 {
    JOCKEY_BONUS
        .iter()
        .find(|(token, _)| !name.is_empty() && name.contains(token))
        .map(|(_, bonus)| *bonus)
        .unwrap_or(0.0)
}

/// Parameters of the entry formula
pub struct EntryWeights;

impl EntryWeights {
    pub const GROUP_TOP: f64 = 25.0;
    pub const GROUP_STEP: f64 = 2.5;
    pub const GROUP_FLOOR: f64 = 5.0;
    pub const WEIGHT_TOP: f64 = 20.0;
    pub const WEIGHT_BASELINE_KG: f64 = 55.0;
    pub const WEIGHT_PER_KG: f64 = 2.0;
    pub const ODDS_TOP: f64 = 30.0;
    pub const ODDS_STEP: f64 = 2.0;
    pub const NUMBER_TOP: f64 = 15.0;
    pub const NUMBER_STEP: f64 = 0.5;
}

fn group_term(post_group: Option<u8>) -> f64 {
    match post_group {
        Some(g) if g >= 1 => (EntryWeights::GROUP_TOP - EntryWeights::GROUP_STEP * f64::from(g - 1))
            .max(EntryWeights::GROUP_FLOOR),
        _ => 0.0,
    }
}

fn weight_term(carried_weight: Option<f64>) -> f64 {
    match carried_weight {
        Some(w) if w.is_finite() && w > 0.0 => {
            let over = (w - EntryWeights::WEIGHT_BASELINE_KG).max(0.0);
            (EntryWeights::WEIGHT_TOP - over * EntryWeights::WEIGHT_PER_KG).max(0.0)
        }
        _ => 0.0,
    }
}

fn odds_term(odds: Option<f64>) -> f64 {
    match odds {
        Some(o) if o.is_finite() && o > 0.0 => (EntryWeights::ODDS_TOP - o * EntryWeights::ODDS_STEP).max(0.0),
        _ => 0.0,
    }
}

fn number_term(start_number: Option<u8>) -> f64 {
    match start_number {
        Some(n) if n >= 1 => (EntryWeights::NUMBER_TOP - f64::from(n) * EntryWeights::NUMBER_STEP).max(0.0),
        _ => 0.0,
    }
}

/// Entry score in [0, 100], rounded to 2 decimals.
///
/// Fields that could not be parsed contribute nothing to their term.
pub fn entry_score(entry: &EntryRecord) -> f64 {
    let raw = group_term(entry.post_group)
        + jockey_bonus(&entry.jockey_name)
        + weight_term(entry.carried_weight)
        + odds_term(entry.odds)
        + number_term(entry.start_number);

    bounded(raw)
}
