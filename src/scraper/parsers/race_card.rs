//! Race card (shutuba) parser for netkeiba.com.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{cell_link_text, cell_text, element_text, horse_link, leading_int, parse_decimal};
use super::{td_selector, tr_selector};
use crate::error::{ScrapeError, TableKind};
use crate::scraper::layout::EntryLayout;
use crate::scraper::locator::TableLocator;
use crate::types::EntryRecord;

/// Parsed race card
#[derive(Debug, Clone, Default)]
pub struct RaceCard {
    pub race_name: String,
    /// Name of the layout that matched
    pub layout: String,
    pub entries: Vec<EntryRecord>,
}

/// Parser for race card pages
pub struct RaceCardParser;

impl RaceCardParser {
    /// Parse race card from HTML.
    ///
    /// Fails only when no known entry table is present; a table without
    /// usable rows yields an empty card.
    pub fn parse(html: &str, layouts: &[EntryLayout]) -> Result<RaceCard, ScrapeError> {
        let document = Html::parse_document(html);

        let located = TableLocator::locate(&document, layouts)
            .ok_or(ScrapeError::TableNotFound(TableKind::EntryList))?;

        let entries = Self::parse_rows(&located.table, located.layout);

        Ok(RaceCard {
            race_name: Self::parse_race_name(&document),
            layout: located.layout.name.clone(),
            entries,
        })
    }

    fn parse_race_name(document: &Html) -> String {
        for sel_str in [".RaceName", ".RaceList_Item02 h1", "dl.racedata h1"] {
            if let Ok(selector) = Selector::parse(sel_str) {
                if let Some(elem) = document.select(&selector).next() {
                    let text = element_text(&elem);
                    if !text.is_empty() {
                        return text;
                    }
                }
            }
        }
        String::new()
    }

    /// Parse every data row of a located entry table (header row skipped)
    pub fn parse_rows(table: &ElementRef, layout: &EntryLayout) -> Vec<EntryRecord> {
        table
            .select(tr_selector())
            .skip(1)
            .filter_map(|row| Self::parse_entry_row(&row, layout))
            .collect()
    }

    fn parse_entry_row(row: &ElementRef, layout: &EntryLayout) -> Option<EntryRecord> {
        let cells: Vec<_> = row.select(td_selector()).collect();
        if cells.len() < layout.min_cells {
            debug!(
                "Discarding row with {} cells (layout {} needs {})",
                cells.len(),
                layout.name,
                layout.min_cells
            );
            return None;
        }
        let cols = &layout.columns;

        // Horse link in its own cell first, then anywhere in the row
        let (horse_name, horse_id) = cells
            .get(cols.horse)
            .and_then(horse_link)
            .or_else(|| horse_link(row))
            .unwrap_or_else(|| (cell_text(&cells, cols.horse).unwrap_or_default(), String::new()));

        if horse_name.is_empty() || (cols.require_horse_id && horse_id.is_empty()) {
            debug!("Discarding row without horse identity: {:?}", horse_name);
            return None;
        }

        let text = |idx: usize| cell_text(&cells, idx).unwrap_or_default();

        Some(EntryRecord {
            post_group: leading_int(&text(cols.post_group)).and_then(|v| u8::try_from(v).ok()),
            start_number: leading_int(&text(cols.start_number)).and_then(|v| u8::try_from(v).ok()),
            horse_name,
            horse_id,
            sex_age: text(cols.sex_age),
            carried_weight: parse_decimal(&text(cols.carried_weight)),
            jockey_name: cell_link_text(&cells, cols.jockey).unwrap_or_default(),
            odds: cols.odds.and_then(|idx| parse_decimal(&text(idx))),
        })
    }
}
