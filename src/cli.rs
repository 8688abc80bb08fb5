//! CLI commands for keiba-scraper.
//!
//! Supports API server mode, live race analysis and offline analysis of
//! captured HTML.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{AppConfig, HistorySource};
use crate::pipeline::{Analyzer, AnalyzerSettings};
use crate::report::render_text;
use crate::scraper::parsers::RaceCardParser;
use crate::scraper::{extract_race_id, HttpFetcher, RaceInput, StaticPages};
use crate::summarizer;
use crate::types::{RankedReport, ScoringMode};

#[derive(Parser)]
#[command(name = "keiba-scraper")]
#[command(version, about = "Keiba scraper: race card analysis API and CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the horse names of a race card
    Entries {
        /// Race id or entry-list URL
        #[arg(value_name = "RACE")]
        race: String,
    },

    /// Fetch, score and rank a race
    Analyze {
        /// Race id or entry-list URL
        #[arg(value_name = "RACE")]
        race: String,

        /// Scoring mode (condition, entry)
        #[arg(short, long)]
        mode: Option<ScoringMode>,

        /// Skip the LLM summary
        #[arg(long)]
        no_summary: bool,

        /// Output format (json, table)
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Analyze captured HTML files without network access
    Offline {
        /// Saved race card HTML
        #[arg(value_name = "ENTRY_HTML")]
        entry_html: PathBuf,

        /// Directory holding `{horse_id}.html` result pages
        #[arg(long)]
        history_dir: Option<PathBuf>,

        /// Scoring mode (condition, entry)
        #[arg(short, long)]
        mode: Option<ScoringMode>,

        /// Output format (json, table)
        #[arg(short, long, default_value = "json")]
        format: String,
    },
}

fn http_fetcher(config: &AppConfig) -> anyhow::Result<HttpFetcher> {
    HttpFetcher::new(
        Duration::from_secs(config.fetch.timeout_secs),
        &config.fetch.user_agent,
    )
}

fn print_report(report: &RankedReport, format: &str) -> anyhow::Result<()> {
    match format {
        "table" => print!("{}", render_text(report)),
        _ => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

/// Print the roster of a race.
pub async fn run_entries(race: String) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let input = RaceInput::from_arg(&race)?;

    let analyzer = Analyzer::new(
        http_fetcher(&config)?,
        summarizer::from_config(&config.summarizer),
        AnalyzerSettings::from_config(&config),
    );
    let card = analyzer.fetch_card(&input).await?;

    let names: Vec<_> = card.entries.into_iter().map(|e| e.horse_name).collect();
    println!("{}", serde_json::to_string_pretty(&names)?);
    Ok(())
}

/// Run the full pipeline against the live site.
pub async fn run_analyze(
    race: String,
    mode: Option<ScoringMode>,
    no_summary: bool,
    format: String,
) -> anyhow::Result<()> {
    let mut config = AppConfig::load()?;

    // Override with CLI args
    if let Some(mode) = mode {
        config.scoring.mode = mode;
    }
    if no_summary {
        config.summarizer.enabled = false;
    }

    let input = RaceInput::from_arg(&race)?;
    info!("Analyzing race {}", input.race_id);

    let analyzer = Analyzer::new(
        http_fetcher(&config)?,
        summarizer::from_config(&config.summarizer),
        AnalyzerSettings::from_config(&config),
    );
    let report = analyzer.analyze(&input).await?;

    print_report(&report, &format)
}

/// Build an in-memory page source from a saved race card and history files
fn load_offline_pages(
    entry_html: &Path,
    history_dir: Option<&Path>,
    settings: &AnalyzerSettings,
) -> anyhow::Result<(RaceInput, StaticPages)> {
    let html = std::fs::read_to_string(entry_html)
        .with_context(|| format!("failed to read {}", entry_html.display()))?;

    let race_id = extract_race_id(&entry_html.to_string_lossy())
        .or_else(|| extract_race_id(&html))
        .unwrap_or_else(|| "offline".to_string());
    let input = RaceInput {
        url: Some(format!("file://{}", entry_html.display())),
        race_id,
    };

    let card = RaceCardParser::parse(&html, &settings.layouts.entry)?;
    let mut pages = StaticPages::new().with_page(input.entry_url(&settings.urls), html);

    if let Some(dir) = history_dir {
        for entry in card.entries.iter().filter(|e| !e.horse_id.is_empty()) {
            let path = dir.join(format!("{}.html", entry.horse_id));
            match std::fs::read_to_string(&path) {
                Ok(history) => pages.insert(settings.urls.horse(&entry.horse_id), history),
                Err(e) => warn!("{}: {}", path.display(), e),
            }
        }
    }

    Ok((input, pages))
}

/// Run the pipeline over captured HTML.
pub async fn run_offline(
    entry_html: PathBuf,
    history_dir: Option<PathBuf>,
    mode: Option<ScoringMode>,
    format: String,
) -> anyhow::Result<()> {
    let mut config = AppConfig::load()?;
    if let Some(mode) = mode {
        config.scoring.mode = mode;
    }

    let mut settings = AnalyzerSettings::from_config(&config);
    // Saved files are full horse pages and there is nobody to ask for a summary
    settings.history_source = HistorySource::Page;
    settings.fetch_pedigree = false;
    settings.summarize = false;

    let (input, pages) = load_offline_pages(&entry_html, history_dir.as_deref(), &settings)?;
    let analyzer = Analyzer::new(pages, summarizer::from_config(&config.summarizer), settings);
    let report = analyzer.analyze(&input).await?;

    print_report(&report, &format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::PageSource;

    const CARD_HTML: &str = r#"<html><body><div class="RaceName">新馬戦</div>
<table class="Shutuba_Table">
<tr><th>枠</th><th>馬番</th></tr>
<tr><td>1</td><td>1</td><td></td><td><a href="/horse/2023104567/">ハヤテ</a></td><td>牡2</td><td>55.0</td><td>戸崎圭太</td><td>美浦</td><td>460(0)</td><td>3.2</td><td>1</td></tr>
<tr><td>2</td><td>2</td><td></td><td><a href="/horse/2023104568/">シズカ</a></td><td>牝2</td><td>55.0</td><td>松山弘平</td><td>栗東</td><td>440(0)</td><td>8.1</td><td>3</td></tr>
</table></body></html>"#;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("keiba-scraper-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_offline_pages_from_files() {
        let dir = temp_dir("offline");
        let card_path = dir.join("202606010701.html");
        std::fs::write(&card_path, CARD_HTML).unwrap();
        std::fs::write(dir.join("2023104567.html"), "<table class=\"db_h_race_results\"></table>").unwrap();

        let settings = AnalyzerSettings::default();
        let (input, pages) = load_offline_pages(&card_path, Some(&dir), &settings).unwrap();

        assert_eq!(input.race_id, "202606010701");
        assert!(pages.fetch(&input.entry_url(&settings.urls), None).await.is_ok());
        assert!(pages
            .fetch(&settings.urls.horse("2023104567"), None)
            .await
            .is_ok());
        // No file for the second horse
        assert!(pages
            .fetch(&settings.urls.horse("2023104568"), None)
            .await
            .is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_offline_missing_file() {
        let settings = AnalyzerSettings::default();
        let err = load_offline_pages(Path::new("/nonexistent/card.html"), None, &settings).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_cli_parses_analyze() {
        let cli = Cli::parse_from([
            "keiba-scraper",
            "analyze",
            "202606010701",
            "--mode",
            "entry",
            "--no-summary",
            "--format",
            "table",
        ]);
        match cli.command {
            Commands::Analyze {
                race,
                mode,
                no_summary,
                format,
            } => {
                assert_eq!(race, "202606010701");
                assert_eq!(mode, Some(ScoringMode::Entry));
                assert!(no_summary);
                assert_eq!(format, "table");
            }
            _ => panic!("expected analyze"),
        }
    }
}
