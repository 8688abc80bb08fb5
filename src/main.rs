//! Keiba scraper
//!
//! Fetches a race card, scores each horse from its entry fields and recent
//! results, and serves or prints a ranked report.

mod cli;
mod config;
mod error;
mod pipeline;
mod report;
mod routes;
mod scoring;
mod scraper;
mod summarizer;
mod types;

use axum::{routing::get, Router};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::routes::AppState;
use crate::scraper::HttpFetcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (stderr keeps stdout clean for reports)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keiba_scraper=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => run_server(host, port).await,
        Commands::Entries { race } => cli::run_entries(race).await,
        Commands::Analyze {
            race,
            mode,
            no_summary,
            format,
        } => cli::run_analyze(race, mode, no_summary, format).await,
        Commands::Offline {
            entry_html,
            history_dir,
            mode,
            format,
        } => cli::run_offline(entry_html, history_dir, mode, format).await,
    }
}

/// Run the API server.
async fn run_server(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    // Load configuration
    let mut config = AppConfig::load()?;

    // Override with CLI args
    if let Some(h) = host {
        config.server.host = h;
    }
    if let Some(p) = port {
        config.server.port = p;
    }

    tracing::info!("Configuration loaded");
    tracing::info!(
        "Scoring mode: {:?}, history source: {:?}",
        config.scoring.mode,
        config.fetch.history_source
    );

    let fetcher = HttpFetcher::new(
        Duration::from_secs(config.fetch.timeout_secs),
        &config.fetch.user_agent,
    )?;
    let summarizer = summarizer::from_config(&config.summarizer);

    // Create application state
    let state = Arc::new(AppState {
        config: config.clone(),
        fetcher,
        summarizer,
    });

    // Build router
    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/api/shutuba", get(routes::shutuba).post(routes::shutuba))
        .route("/api/analyze", get(routes::analyze).post(routes::analyze))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
