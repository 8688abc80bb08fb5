//! API route handlers.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::ScrapeError;
use crate::pipeline::{Analyzer, AnalyzerSettings};
use crate::scraper::{HttpFetcher, RaceInput};
use crate::summarizer::Summarizer;
use crate::types::{ErrorResponse, HealthResponse, RankedReport, ScoringMode};

/// Application state shared across handlers.
pub struct AppState {
    pub config: AppConfig,
    pub fetcher: HttpFetcher,
    pub summarizer: Arc<dyn Summarizer>,
}

impl AppState {
    fn analyzer(&self, mode: Option<ScoringMode>) -> Analyzer<HttpFetcher> {
        let mut settings = AnalyzerSettings::from_config(&self.config);
        if let Some(mode) = mode {
            settings.mode = mode;
        }
        Analyzer::new(self.fetcher.clone(), self.summarizer.clone(), settings)
    }
}

/// Error type for API handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl From<ScrapeError> for ApiError {
    fn from(err: ScrapeError) -> Self {
        match err {
            ScrapeError::InputMissing => Self::bad_request(err.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Race selector accepted in the query string or a JSON body
#[derive(Debug, Default, Deserialize)]
pub struct RaceQuery {
    #[serde(rename = "raceId", alias = "race_id")]
    pub race_id: Option<String>,
    pub url: Option<String>,
    /// Kept as text so a bad value is reported as a JSON error, not dropped
    pub mode: Option<String>,
}

/// String field of a JSON body; numbers are accepted for ids
fn body_field(body: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| body.get(key))
        .find_map(|value| match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl RaceQuery {
    /// Query values win; the body fills whatever the query left empty.
    ///
    /// Body fields are read one at a time so a bad field never hides the others.
    fn merge(self, body: &[u8]) -> Self {
        let body: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
        Self {
            race_id: non_blank(self.race_id).or_else(|| body_field(&body, &["raceId", "race_id"])),
            url: non_blank(self.url).or_else(|| body_field(&body, &["url"])),
            mode: non_blank(self.mode).or_else(|| body_field(&body, &["mode"])),
        }
    }

    fn input(&self) -> Result<RaceInput, ScrapeError> {
        RaceInput::resolve(self.race_id.as_deref(), self.url.as_deref())
    }

    fn scoring_mode(&self) -> Result<Option<ScoringMode>, ApiError> {
        self.mode
            .as_deref()
            .map(|m| m.trim().parse::<ScoringMode>())
            .transpose()
            .map_err(ApiError::bad_request)
    }
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Roster endpoint: horse names in entry order.
pub async fn shutuba(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RaceQuery>,
    body: Bytes,
) -> Result<Json<Vec<String>>, ApiError> {
    let query = query.merge(&body);
    let input = query.input()?;
    let mode = query.scoring_mode()?;
    info!("Roster request for race {}", input.race_id);

    let card = state.analyzer(mode).fetch_card(&input).await.map_err(|e| {
        warn!("Roster failed for {}: {}", input.race_id, e);
        ApiError::from(e)
    })?;

    Ok(Json(card.entries.into_iter().map(|e| e.horse_name).collect()))
}

/// Analysis endpoint: full ranked report.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RaceQuery>,
    body: Bytes,
) -> Result<Json<RankedReport>, ApiError> {
    let query = query.merge(&body);
    let input = query.input()?;
    let mode = query.scoring_mode()?;
    info!("Analyze request for race {}", input.race_id);

    let report = state.analyzer(mode).analyze(&input).await.map_err(|e| {
        warn!("Analysis failed for {}: {}", input.race_id, e);
        ApiError::from(e)
    })?;

    Ok(Json(report))
}
