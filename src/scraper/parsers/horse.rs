//! Horse page parser: result history and pedigree text.

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{cell_link_text, cell_text, classify_race, leading_int, parse_decimal, track_condition};
use super::{td_selector, tr_selector};
use crate::error::{ScrapeError, TableKind};
use crate::scraper::layout::HistoryLayout;
use crate::scraper::locator::TableLocator;
use crate::types::PastRunRecord;

/// Parser for horse result pages and fragments
pub struct HorseParser;

impl HorseParser {
    /// Parse up to `limit` past runs, most recent first.
    pub fn parse_history(
        html: &str,
        layouts: &[HistoryLayout],
        limit: usize,
    ) -> Result<Vec<PastRunRecord>, ScrapeError> {
        let document = Html::parse_document(html);

        let located = TableLocator::locate(&document, layouts)
            .ok_or(ScrapeError::TableNotFound(TableKind::ResultHistory))?;

        Ok(Self::parse_rows(&located.table, located.layout, limit))
    }

    /// Parse rows of a located history table (header row skipped)
    pub fn parse_rows(table: &ElementRef, layout: &HistoryLayout, limit: usize) -> Vec<PastRunRecord> {
        table
            .select(tr_selector())
            .skip(1)
            .filter_map(|row| Self::parse_past_run_row(&row, layout))
            .take(limit)
            .collect()
    }

    fn parse_past_run_row(row: &ElementRef, layout: &HistoryLayout) -> Option<PastRunRecord> {
        let cells: Vec<_> = row.select(td_selector()).collect();
        if cells.len() < layout.min_cells {
            debug!(
                "Discarding history row with {} cells (layout {} needs {})",
                cells.len(),
                layout.name,
                layout.min_cells
            );
            return None;
        }
        let cols = &layout.columns;
        let text = |idx: usize| cell_text(&cells, idx).unwrap_or_default();

        let race_name = cell_link_text(&cells, cols.race_name).unwrap_or_default();
        let race_class = classify_race(&race_name)
            .map(|(label, _)| label.to_string())
            .unwrap_or_default();

        Some(PastRunRecord {
            date: Self::normalize_date(&text(cols.date)),
            race_class,
            race_name,
            distance: text(cols.distance),
            track_condition: track_condition(&text(cols.track_condition))
                .unwrap_or_default()
                .to_string(),
            finish_rank: leading_int(&text(cols.finish_rank)),
            closing_time: parse_decimal(&text(cols.closing_time)),
            passing_positions: text(cols.passing),
            margin: parse_decimal(&text(cols.margin)),
            popularity_rank: leading_int(&text(cols.popularity)),
            jockey_name: cell_link_text(&cells, cols.jockey).unwrap_or_default(),
        })
    }

    /// "2024/05/12" -> "2024-05-12"; anything else is kept as displayed
    fn normalize_date(text: &str) -> String {
        NaiveDate::parse_from_str(text, "%Y/%m/%d")
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|_| text.to_string())
    }

    /// Pedigree table collapsed into a single whitespace-normalized line
    pub fn parse_pedigree(html: &str) -> String {
        let document = Html::parse_document(html);

        for sel_str in ["table.blood_table", ".pedigree_table", "table.blood"] {
            if let Ok(selector) = Selector::parse(sel_str) {
                if let Some(table) = document.select(&selector).next() {
                    return table
                        .text()
                        .flat_map(str::split_whitespace)
                        .collect::<Vec<_>>()
                        .join(" ");
                }
            }
        }

        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::layout::default_history_layouts;

    fn page_row(cells: [&str; 23]) -> String {
        let tds: String = cells.iter().map(|c| format!("<td>{}</td>", c)).collect();
        format!("<tr>{}</tr>", tds)
    }

    fn sample_page() -> String {
        // 日付 開催 天気 R レース名 映像 頭数 枠番 馬番 オッズ 人気 着順 騎手 斤量 距離 馬場 指数 タイム 着差 ﾀｲﾑ指数 通過 ペース 上り
        let rows = [
            page_row([
                "2024/05/12", "2東京6", "晴", "11", "<a href='/race/1'>NHKマイルC(G1)</a>", "", "18", "3",
                "5", "4.2", "2", "1", "<a href='/jockey/1'>ルメール</a>", "57", "芝1600", "良", "**",
                "1:32.4", "-0.1", "**", "5-4", "34.8-34.6", "33.9",
            ]),
            page_row([
                "2024/04/06", "3中山4", "曇", "11", "ニュージーランドT(G2)", "", "16", "2", "3",
                "3.1", "1", "3", "ルメール", "56", "芝1600", "稍重", "**", "1:34.0", "0.3", "**",
                "3-3", "35.1-35.0", "34.6",
            ]),
            page_row([
                "2024/02/18", "1東京8", "晴", "9", "3歳1勝クラス", "", "12", "6", "8", "5.5", "3",
                "中", "戸崎圭太", "57", "芝1800", "不良", "**", "", "", "**", "", "", "",
            ]),
        ];
        format!(
            r#"<html><body><table class="db_h_race_results nk_tb_common">
            <thead><tr><th>日付</th><th>レース名</th><th>上り</th></tr></thead>
            <tbody>{}<tr><td colspan="23">地方</td></tr></tbody></table>
            <table class="blood_table"><tr><td rowspan="2">ドゥラメンテ</td><td>キングカメハメハ</td></tr>
            <tr><td>アドマイヤグルーヴ</td></tr></table></body></html>"#,
            rows.join("")
        )
    }

    #[test]
    fn test_parse_history_page() {
        let runs = HorseParser::parse_history(&sample_page(), &default_history_layouts(), 5).unwrap();
        assert_eq!(runs.len(), 3);

        let latest = &runs[0];
        assert_eq!(latest.date, "2024-05-12");
        assert_eq!(latest.race_name, "NHKマイルC(G1)");
        assert_eq!(latest.race_class, "G1");
        assert_eq!(latest.distance, "芝1600");
        assert_eq!(latest.track_condition, "良");
        assert_eq!(latest.finish_rank, Some(1));
        assert_eq!(latest.popularity_rank, Some(2));
        assert_eq!(latest.margin, Some(-0.1));
        assert_eq!(latest.closing_time, Some(33.9));
        assert_eq!(latest.passing_positions, "5-4");
        assert_eq!(latest.jockey_name, "ルメール");

        assert_eq!(runs[1].race_class, "G2");
        assert_eq!(runs[1].track_condition, "稍重");
    }

    #[test]
    fn test_unparseable_fields_are_none() {
        let runs = HorseParser::parse_history(&sample_page(), &default_history_layouts(), 5).unwrap();
        let stopped = &runs[2];
        assert_eq!(stopped.finish_rank, None);
        assert_eq!(stopped.margin, None);
        assert_eq!(stopped.closing_time, None);
        assert_eq!(stopped.track_condition, "不良");
        assert_eq!(stopped.race_class, "");
    }

    #[test]
    fn test_history_limit() {
        let runs = HorseParser::parse_history(&sample_page(), &default_history_layouts(), 2).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].date, "2024-05-12");
    }

    #[test]
    fn test_fragment_layout_shifts_columns() {
        // Fragment has no 映像 column
        let cells = [
            "2023/12/28", "5中山9", "晴", "11", "ホープフルS(G1)", "18", "1", "1", "6.0", "3", "2",
            "武豊", "56", "芝2000", "重", "**", "2:01.1", "0.2", "**", "7-7-6-5", "35.9-36.2", "35.4",
        ];
        let tds: String = cells.iter().map(|c| format!("<td>{}</td>", c)).collect();
        let html = format!(
            r#"<table class="nk_tb_common race_table_01"><tr><th>日付</th></tr><tr>{}</tr></table>"#,
            tds
        );

        let runs = HorseParser::parse_history(&html, &default_history_layouts(), 5).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].popularity_rank, Some(3));
        assert_eq!(runs[0].finish_rank, Some(2));
        assert_eq!(runs[0].distance, "芝2000");
        assert_eq!(runs[0].track_condition, "重");
        assert_eq!(runs[0].closing_time, Some(35.4));
    }

    #[test]
    fn test_missing_history_table() {
        let err = HorseParser::parse_history("<html></html>", &default_history_layouts(), 5).unwrap_err();
        assert!(matches!(err, ScrapeError::TableNotFound(TableKind::ResultHistory)));
    }

    #[test]
    fn test_parse_pedigree() {
        let text = HorseParser::parse_pedigree(&sample_page());
        assert_eq!(text, "ドゥラメンテ キングカメハメハ アドマイヤグルーヴ");
        assert_eq!(HorseParser::parse_pedigree("<html></html>"), "");
    }
}
