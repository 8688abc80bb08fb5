//! Web scraper module for netkeiba.com
//!
//! Provides page fetching, table location, row parsing and feature extraction.

pub mod feature_builder;
pub mod fetcher;
pub mod layout;
pub mod locator;
pub mod parsers;

pub use feature_builder::FeatureBuilder;
pub use fetcher::{HttpFetcher, PageSource, StaticPages};
pub use layout::Layouts;

use regex::Regex;
use std::sync::OnceLock;

use crate::error::ScrapeError;

/// Base URLs for netkeiba.com
pub const BASE_URL: &str = "https://race.netkeiba.com";
pub const DB_URL: &str = "https://db.netkeiba.com";

/// URL builder over configurable hosts
#[derive(Debug, Clone)]
pub struct SiteUrls {
    pub race_base: String,
    pub db_base: String,
}

impl Default for SiteUrls {
    fn default() -> Self {
        Self {
            race_base: BASE_URL.to_string(),
            db_base: DB_URL.to_string(),
        }
    }
}

impl SiteUrls {
    /// Build race card URL
    pub fn race_card(&self, race_id: &str) -> String {
        format!("{}/race/shutuba.html?race_id={}", self.race_base, race_id)
    }

    /// Build horse profile URL (full page with results table)
    pub fn horse(&self, horse_id: &str) -> String {
        format!("{}/horse/{}/", self.db_base, horse_id)
    }

    /// Build horse results fragment URL (legacy encoding)
    pub fn horse_results_fragment(&self, horse_id: &str) -> String {
        format!("{}/horse/ajax_horse_results.html?id={}", self.db_base, horse_id)
    }

    /// Build pedigree page URL
    pub fn pedigree(&self, horse_id: &str) -> String {
        format!("{}/horse/ped/{}/", self.db_base, horse_id)
    }
}

/// Extract the race id from an entry-list URL or a bare id.
///
/// `race_id=NNNNNNNNNNNN` is tried first, then any standalone 12-13 digit run.
pub fn extract_race_id(input: &str) -> Option<String> {
    static STRICT: OnceLock<Regex> = OnceLock::new();
    static LOOSE: OnceLock<Regex> = OnceLock::new();

    let strict = STRICT.get_or_init(|| Regex::new(r"race_id=(\d{12,13})(?:\D|$)").unwrap());
    if let Some(caps) = strict.captures(input) {
        return Some(caps[1].to_string());
    }

    let loose = LOOSE.get_or_init(|| Regex::new(r"(?:^|\D)(\d{12,13})(?:\D|$)").unwrap());
    loose.captures(input).map(|caps| caps[1].to_string())
}

/// Race selector accepted by the CLI and API: a race id or an entry-list URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceInput {
    pub race_id: String,
    /// Entry-list URL given by the caller, if any
    pub url: Option<String>,
}

impl RaceInput {
    /// Resolve from whichever of `race_id` / `url` is present
    pub fn resolve(race_id: Option<&str>, url: Option<&str>) -> Result<Self, ScrapeError> {
        let race_id = race_id.map(str::trim).filter(|s| !s.is_empty());
        let url = url.map(str::trim).filter(|s| !s.is_empty());

        if let Some(id) = race_id {
            let id = extract_race_id(id).unwrap_or_else(|| id.to_string());
            return Ok(Self {
                race_id: id,
                url: url.map(str::to_string),
            });
        }

        let url = url.ok_or(ScrapeError::InputMissing)?;
        let id = extract_race_id(url).ok_or(ScrapeError::InputMissing)?;
        Ok(Self {
            race_id: id,
            url: Some(url.to_string()),
        })
    }

    /// Parse a single CLI argument that may be either form
    pub fn from_arg(arg: &str) -> Result<Self, ScrapeError> {
        if arg.contains("://") {
            Self::resolve(None, Some(arg))
        } else {
            Self::resolve(Some(arg), None)
        }
    }

    /// URL of the entry list to fetch
    pub fn entry_url(&self, urls: &SiteUrls) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| urls.race_card(&self.race_id))
    }
}
