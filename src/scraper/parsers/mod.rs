//! HTML parsers for netkeiba.com race cards and horse pages.
//!
//! Cell access is positional and never panics: a missing cell or unparseable
//! text yields `None` and the caller decides what that means.

pub mod horse;
pub mod race_card;

pub use horse::HorseParser;
pub use race_card::{RaceCard, RaceCardParser};

use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::OnceLock;

/// Track conditions, longest first so "不良" is not read as "良"
pub const TRACK_CONDITIONS: [&str; 4] = ["不良", "稍重", "重", "良"];

/// Race class tokens with their strength ordinal (0-6)
const RACE_CLASSES: [(&str, &str, u8); 17] = [
    ("G1", "G1", 6),
    ("Ｇ１", "G1", 6),
    ("GⅠ", "G1", 6),
    ("G2", "G2", 5),
    ("Ｇ２", "G2", 5),
    ("GⅡ", "G2", 5),
    ("G3", "G3", 4),
    ("Ｇ３", "G3", 4),
    ("GⅢ", "G3", 4),
    ("OP", "OP", 3),
    ("(L)", "OP", 3),
    ("（L）", "OP", 3),
    ("オープン", "OP", 3),
    ("3勝", "3勝", 2),
    ("1600万", "3勝", 2),
    ("2勝", "2勝", 1),
    ("1000万", "2勝", 1),
];

/// Highest-ranked class token found in `text`, as (label, level)
pub fn classify_race(text: &str) -> Option<(&'static str, u8)> {
    RACE_CLASSES
        .iter()
        .filter(|(token, _, _)| text.contains(token))
        .max_by_key(|(_, _, level)| *level)
        .map(|(_, label, level)| (*label, *level))
}

/// Track condition mentioned in `text`, if any
pub fn track_condition(text: &str) -> Option<&'static str> {
    TRACK_CONDITIONS.iter().copied().find(|c| text.contains(c))
}

fn selector(css: &'static str, cell: &'static OnceLock<Selector>) -> &'static Selector {
    cell.get_or_init(|| Selector::parse(css).expect("static selector"))
}

pub(crate) fn td_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector("td", &SEL)
}

pub(crate) fn tr_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector("tr", &SEL)
}

fn anchor_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector("a", &SEL)
}

fn horse_link_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector("a[href*='/horse/']", &SEL)
}

/// Whitespace-trimmed text of an element
pub fn element_text(elem: &ElementRef) -> String {
    elem.text().collect::<String>().trim().to_string()
}

/// Trimmed text of cell `idx`, or `None` when the row is too short
pub fn cell_text(cells: &[ElementRef], idx: usize) -> Option<String> {
    cells.get(idx).map(element_text)
}

/// Text of the first link in cell `idx`, falling back to the cell text
pub fn cell_link_text(cells: &[ElementRef], idx: usize) -> Option<String> {
    let cell = cells.get(idx)?;
    let text = cell
        .select(anchor_selector())
        .next()
        .map(|a| element_text(&a))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| element_text(cell));
    Some(text)
}

/// Leading integer of a cell ("3", "2(降)"); `None` for "取", "中", "" ...
pub fn leading_int(text: &str) -> Option<u32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^\s*(\d+)").expect("static regex"));
    re.captures(text).and_then(|caps| caps[1].parse().ok())
}

/// Finite decimal ("34.5", "-0.2"); `None` for "---.-" and friends
pub fn parse_decimal(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Name and id from a horse-detail link.
///
/// The id is the trailing path segment of the link target, e.g.
/// `https://db.netkeiba.com/horse/2021104567/` -> `2021104567`.
pub fn horse_link(scope: &ElementRef) -> Option<(String, String)> {
    let link = scope.select(horse_link_selector()).next()?;
    let name = element_text(&link);
    let id = link
        .value()
        .attr("href")
        .and_then(trailing_segment)
        .unwrap_or_default();
    Some((name, id))
}

fn trailing_segment(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next()?;
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    if segment.chars().all(|c| c.is_ascii_alphanumeric())
        && segment.chars().any(|c| c.is_ascii_digit())
    {
        Some(segment.to_string())
    } else {
        None
    }
}
