//! Error types for fetching, scraping and summarizing.

use std::fmt;
use thiserror::Error;

/// Which table a locator was looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    EntryList,
    ResultHistory,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::EntryList => write!(f, "entry list"),
            TableKind::ResultHistory => write!(f, "result history"),
        }
    }
}

/// Document fetch failure (single attempt, no retry)
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url {url}: {detail}")]
    InvalidUrl { url: String, detail: String },

    #[error("request to {url} failed: {detail}")]
    Request { url: String, detail: String },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
}

/// Pipeline failures. Whether one is fatal depends on which stage raised it.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("raceId is required")]
    InputMissing,

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("{0} table not found")]
    TableNotFound(TableKind),

    #[error("horse id unavailable for {0}")]
    MissingHorseId(String),
}

/// Summarizer failure, always scoped to one horse
#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("summarizer unavailable: {0}")]
    Unavailable(String),

    #[error("summarizer request failed: {0}")]
    Request(String),

    #[error("summarizer API error: {0}")]
    Api(String),

    #[error("failed to parse summarizer response: {0}")]
    Parse(String),
}
