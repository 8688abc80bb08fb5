//! Records, features and report types shared by the scraper, scorers and API.

use serde::{Deserialize, Serialize};

/// Entry in a race card (出馬表)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EntryRecord {
    pub post_group: Option<u8>,   // 枠番 1-8
    pub start_number: Option<u8>, // 馬番
    pub horse_name: String,
    pub horse_id: String,
    pub sex_age: String, // "牡4", "牝3", "セ5"
    pub carried_weight: Option<f64>,
    pub jockey_name: String,
    pub odds: Option<f64>,
}

impl EntryRecord {
    /// Stable identity: horse id when known, otherwise the name.
    pub fn identity(&self) -> &str {
        if self.horse_id.is_empty() {
            &self.horse_name
        } else {
            &self.horse_id
        }
    }
}

/// One row of a horse's result history, most recent first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PastRunRecord {
    pub date: String,
    pub race_name: String,
    pub race_class: String,     // "G1", "OP", "3勝", "" ...
    pub distance: String,       // "芝1800"
    pub track_condition: String, // "良", "稍重", "重", "不良" or ""
    pub finish_rank: Option<u32>,
    pub closing_time: Option<f64>, // 上り
    pub passing_positions: String, // "3-3-2-1"
    pub margin: Option<f64>,
    pub popularity_rank: Option<u32>,
    pub jockey_name: String,
}

/// Numeric summary of the recent past runs.
///
/// Every field is always populated; missing data falls back to a value worse
/// than any real observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub avg_finish_rank: f64,
    pub avg_popularity: f64,
    pub avg_margin: f64,
    pub avg_closing_time: f64,
    pub avg_race_level: f64,
    pub distance_fit: f64,
    pub track_fit: f64,
}

/// Which base score feeds the ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Past-run condition score
    #[default]
    Condition,
    /// Pre-race entry score
    Entry,
}

impl std::str::FromStr for ScoringMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "condition" => Ok(ScoringMode::Condition),
            "entry" => Ok(ScoringMode::Entry),
            other => Err(format!("unknown scoring mode: {}", other)),
        }
    }
}

/// Narrative judgment returned by the summarizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Judgment {
    #[serde(default)]
    pub strong: String,
    #[serde(default)]
    pub weak: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub suitability: String,
}

/// Context handed to the summarizer for one horse
#[derive(Debug, Clone, Serialize)]
pub struct HorseContext<'a> {
    pub entry: &'a EntryRecord,
    pub past_runs: &'a [PastRunRecord],
    pub features: &'a FeatureVector,
    pub pedigree: &'a str,
}

/// Per-horse display unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorseCard {
    pub rank: usize,
    pub entry: EntryRecord,
    /// Final ranking score (base score plus ranking bonuses)
    pub score: f64,
    pub entry_score: f64,
    pub condition_score: Option<f64>,
    pub features: Option<FeatureVector>,
    pub past_runs: Vec<PastRunRecord>,
    pub narrative: Option<Judgment>,
    /// Explanation when a stage failed for this horse
    pub error: Option<String>,
}

/// Ranked report for one race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedReport {
    pub race_id: String,
    pub title: String,
    pub mode: ScoringMode,
    pub horses: Vec<HorseCard>,
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_prefers_horse_id() {
        let entry = EntryRecord {
            horse_name: "ミライスター".to_string(),
            horse_id: "2021104567".to_string(),
            ..Default::default()
        };
        assert_eq!(entry.identity(), "2021104567");

        let nameless_id = EntryRecord {
            horse_name: "サクラブレイブ".to_string(),
            ..Default::default()
        };
        assert_eq!(nameless_id.identity(), "サクラブレイブ");
    }

    #[test]
    fn test_scoring_mode_from_str() {
        assert_eq!("condition".parse::<ScoringMode>(), Ok(ScoringMode::Condition));
        assert_eq!("ENTRY".parse::<ScoringMode>(), Ok(ScoringMode::Entry));
        assert!("odds".parse::<ScoringMode>().is_err());
    }

    #[test]
    fn test_judgment_tolerates_missing_fields() {
        let j: Judgment = serde_json::from_str(r#"{"strong": "末脚"}"#).unwrap();
        assert_eq!(j.strong, "末脚");
        assert!(j.weak.is_empty());
    }
}
