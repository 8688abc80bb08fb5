//! Race analysis pipeline.
//!
//! Fetch -> locate -> parse -> extract -> score -> summarize -> render, one
//! horse at a time. The entry list is request-fatal; anything that fails for a
//! single horse turns into an error card for that horse and the run goes on.

use encoding_rs::Encoding;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, HistorySource};
use crate::error::ScrapeError;
use crate::report::ReportAssembler;
use crate::scoring::{condition_score, entry_score, rank};
use crate::scraper::fetcher::encoding_for_label;
use crate::scraper::parsers::{HorseParser, RaceCard, RaceCardParser};
use crate::scraper::{FeatureBuilder, Layouts, PageSource, RaceInput, SiteUrls};
use crate::summarizer::Summarizer;
use crate::types::{
    EntryRecord, FeatureVector, HorseContext, Judgment, PastRunRecord, RankedReport, ScoringMode,
};

/// Pipeline settings derived from the app config
#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    pub urls: SiteUrls,
    pub history_source: HistorySource,
    pub fragment_encoding: Option<&'static Encoding>,
    pub fetch_pedigree: bool,
    pub mode: ScoringMode,
    pub history_limit: usize,
    pub summarize: bool,
    pub layouts: Layouts,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl AnalyzerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let fragment_encoding = encoding_for_label(&config.fetch.fragment_encoding);
        if fragment_encoding.is_none() {
            warn!(
                "Unknown fragment encoding {:?}, decoding as UTF-8",
                config.fetch.fragment_encoding
            );
        }

        Self {
            urls: SiteUrls {
                race_base: config.fetch.race_base_url.clone(),
                db_base: config.fetch.db_base_url.clone(),
            },
            history_source: config.fetch.history_source,
            fragment_encoding,
            fetch_pedigree: config.fetch.fetch_pedigree,
            mode: config.scoring.mode,
            history_limit: config.scoring.history_limit,
            summarize: config.summarizer.enabled,
            layouts: config.layouts.clone(),
        }
    }
}

/// Everything gathered for one horse before ranking
#[derive(Debug, Clone)]
pub struct HorseAnalysis {
    pub entry: EntryRecord,
    pub entry_score: f64,
    pub condition_score: Option<f64>,
    pub features: Option<FeatureVector>,
    pub past_runs: Vec<PastRunRecord>,
    pub narrative: Option<Judgment>,
    pub error: Option<String>,
}

impl HorseAnalysis {
    /// Base score for the ranking in the given mode.
    ///
    /// A horse whose history could not be read scores 0 in condition mode.
    pub fn base_score(&self, mode: ScoringMode) -> f64 {
        match mode {
            ScoringMode::Condition => self.condition_score.unwrap_or(0.0),
            ScoringMode::Entry => self.entry_score,
        }
    }
}

/// Race analyzer over any page source and summarizer
pub struct Analyzer<S> {
    source: S,
    summarizer: Arc<dyn Summarizer>,
    settings: AnalyzerSettings,
}

impl<S: PageSource> Analyzer<S> {
    pub fn new(source: S, summarizer: Arc<dyn Summarizer>, settings: AnalyzerSettings) -> Self {
        Self {
            source,
            summarizer,
            settings,
        }
    }

    /// Fetch and parse the race card. Any failure here is request-fatal.
    pub async fn fetch_card(&self, input: &RaceInput) -> Result<RaceCard, ScrapeError> {
        let url = input.entry_url(&self.settings.urls);
        info!("Fetching race card: {}", url);

        let html = self.source.fetch(&url, None).await?;
        let card = RaceCardParser::parse(&html, &self.settings.layouts.entry)?;

        info!(
            "Race {}: {} entries (layout {})",
            input.race_id,
            card.entries.len(),
            card.layout
        );
        Ok(card)
    }

    /// Full pipeline for one race
    pub async fn analyze(&self, input: &RaceInput) -> Result<RankedReport, ScrapeError> {
        let card = self.fetch_card(input).await?;

        let mut analyses = Vec::with_capacity(card.entries.len());
        for entry in card.entries {
            analyses.push(self.analyze_horse(entry).await);
        }

        let mode = self.settings.mode;
        let scored: Vec<_> = analyses
            .into_iter()
            .map(|a| {
                let base = a.base_score(mode);
                (a, base)
            })
            .collect();
        let ranked = rank(scored, |a| &a.entry);

        Ok(ReportAssembler::assemble(&input.race_id, &card.race_name, mode, ranked))
    }

    /// Score one horse. Never fails: errors end up in `error`.
    pub async fn analyze_horse(&self, entry: EntryRecord) -> HorseAnalysis {
        debug!("Scoring {}", entry.identity());
        let mut analysis = HorseAnalysis {
            entry_score: entry_score(&entry),
            entry,
            condition_score: None,
            features: None,
            past_runs: Vec::new(),
            narrative: None,
            error: None,
        };

        // Entry scoring reads the card only; history is needed for the summary
        if self.settings.mode == ScoringMode::Entry && !self.settings.summarize {
            return analysis;
        }

        let past_runs = match self.fetch_history(&analysis.entry).await {
            Ok(runs) => runs,
            Err(e) => {
                warn!("{}: history unavailable: {}", analysis.entry.horse_name, e);
                analysis.error = Some(e.to_string());
                return analysis;
            }
        };

        let features = FeatureBuilder::build(&past_runs);
        analysis.condition_score = Some(condition_score(&features));
        analysis.features = Some(features);
        analysis.past_runs = past_runs;

        if self.settings.summarize {
            let pedigree = self.fetch_pedigree(&analysis.entry).await;
            let context = HorseContext {
                entry: &analysis.entry,
                past_runs: &analysis.past_runs,
                features: &features,
                pedigree: &pedigree,
            };
            let judgment = self.summarizer.summarize(&context).await;
            match judgment {
                Ok(judgment) => analysis.narrative = Some(judgment),
                Err(e) => {
                    warn!("{}: {}", analysis.entry.horse_name, e);
                    analysis.error = Some(e.to_string());
                }
            }
        }

        analysis
    }

    async fn fetch_history(&self, entry: &EntryRecord) -> Result<Vec<PastRunRecord>, ScrapeError> {
        if entry.horse_id.is_empty() {
            return Err(ScrapeError::MissingHorseId(entry.horse_name.clone()));
        }

        let (url, encoding) = match self.settings.history_source {
            HistorySource::Page => (self.settings.urls.horse(&entry.horse_id), None),
            HistorySource::Fragment => (
                self.settings.urls.horse_results_fragment(&entry.horse_id),
                self.settings.fragment_encoding,
            ),
        };

        let html = self.source.fetch(&url, encoding).await?;
        HorseParser::parse_history(&html, &self.settings.layouts.history, self.settings.history_limit)
    }

    /// Pedigree text, or empty when disabled or unavailable
    async fn fetch_pedigree(&self, entry: &EntryRecord) -> String {
        if !self.settings.fetch_pedigree || entry.horse_id.is_empty() {
            return String::new();
        }

        let url = self.settings.urls.pedigree(&entry.horse_id);
        match self.source.fetch(&url, None).await {
            Ok(html) => HorseParser::parse_pedigree(&html),
            Err(e) => {
                warn!("{}: pedigree unavailable: {}", entry.horse_name, e);
                String::new()
            }
        }
    }
}
