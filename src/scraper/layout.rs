//! Table layout descriptors.
//!
//! A layout pairs a table selector with the positional cell mapping for that
//! markup variant. Layouts are tried in list order and the first selector that
//! matches wins, so supporting a new page variant means adding one entry here
//! (or in the config file), not another parsing branch.

use serde::{Deserialize, Serialize};

/// How to find a table in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TableSelector {
    /// CSS selector matched against the whole document
    Css(String),
    /// First `<table>` with a header cell containing this text
    HeaderText(String),
}

/// Selector plus positional mapping for one markup variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLayout<C> {
    pub name: String,
    pub selector: TableSelector,
    /// Rows with fewer `<td>` cells are discarded
    pub min_cells: usize,
    pub columns: C,
}

/// Cell indices for a race card row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryColumns {
    pub post_group: usize,
    pub start_number: usize,
    pub horse: usize,
    pub sex_age: usize,
    pub carried_weight: usize,
    pub jockey: usize,
    #[serde(default)]
    pub odds: Option<usize>,
    /// Discard rows whose horse link carries no id
    #[serde(default = "default_true")]
    pub require_horse_id: bool,
}

/// Cell indices for a result history row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryColumns {
    pub date: usize,
    pub race_name: usize,
    pub popularity: usize,
    pub finish_rank: usize,
    pub jockey: usize,
    pub distance: usize,
    pub track_condition: usize,
    pub margin: usize,
    pub passing: usize,
    pub closing_time: usize,
}

fn default_true() -> bool {
    true
}

pub type EntryLayout = TableLayout<EntryColumns>;
pub type HistoryLayout = TableLayout<HistoryColumns>;

/// All known layouts, in priority order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layouts {
    #[serde(default = "default_entry_layouts")]
    pub entry: Vec<EntryLayout>,
    #[serde(default = "default_history_layouts")]
    pub history: Vec<HistoryLayout>,
}

impl Default for Layouts {
    fn default() -> Self {
        Self {
            entry: default_entry_layouts(),
            history: default_history_layouts(),
        }
    }
}

/// Race card layouts.
///
/// `Shutuba_Table` carries a check-mark column before the horse name and live
/// odds in column 9; `RaceTable01` has no check-mark column and no odds.
pub fn default_entry_layouts() -> Vec<EntryLayout> {
    let linked = EntryColumns {
        post_group: 0,
        start_number: 1,
        horse: 2,
        sex_age: 3,
        carried_weight: 4,
        jockey: 5,
        odds: None,
        require_horse_id: true,
    };

    vec![
        TableLayout {
            name: "shutuba_odds".to_string(),
            selector: TableSelector::Css(".Shutuba_Table".to_string()),
            min_cells: 10,
            columns: EntryColumns {
                post_group: 0,
                start_number: 1,
                horse: 3,
                sex_age: 4,
                carried_weight: 5,
                jockey: 6,
                odds: Some(9),
                require_horse_id: true,
            },
        },
        TableLayout {
            name: "shutuba_links".to_string(),
            selector: TableSelector::Css("table.RaceTable01".to_string()),
            min_cells: 6,
            columns: linked.clone(),
        },
        TableLayout {
            name: "shutuba_header_fallback".to_string(),
            selector: TableSelector::HeaderText("馬名".to_string()),
            min_cells: 6,
            columns: linked,
        },
    ]
}

/// Result history layouts.
///
/// The full horse page has a video column at index 5; the legacy fragment
/// endpoint omits it, shifting every later column left by one.
pub fn default_history_layouts() -> Vec<HistoryLayout> {
    let page = HistoryColumns {
        date: 0,
        race_name: 4,
        popularity: 10,
        finish_rank: 11,
        jockey: 12,
        distance: 14,
        track_condition: 15,
        margin: 18,
        passing: 20,
        closing_time: 22,
    };

    vec![
        TableLayout {
            name: "horse_results_page".to_string(),
            selector: TableSelector::Css("table.db_h_race_results".to_string()),
            min_cells: 23,
            columns: page.clone(),
        },
        TableLayout {
            name: "horse_results_fragment".to_string(),
            selector: TableSelector::Css("table.nk_tb_common".to_string()),
            min_cells: 22,
            columns: HistoryColumns {
                date: 0,
                race_name: 4,
                popularity: 9,
                finish_rank: 10,
                jockey: 11,
                distance: 13,
                track_condition: 14,
                margin: 17,
                passing: 19,
                closing_time: 21,
            },
        },
        TableLayout {
            name: "horse_results_header_fallback".to_string(),
            selector: TableSelector::HeaderText("上り".to_string()),
            min_cells: 23,
            columns: page,
        },
    ]
}
