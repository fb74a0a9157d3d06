use anyhow::{Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;

mod api;
mod config;
mod db;
mod engine;
mod service;

use api::AppState;
use config::{Command, Config};
use db::models::GradedPick;
use db::Database;
use engine::{Rollout, SegmentationReport};
use service::{RecommendationRequest, RecommendationService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    config.validate()?;

    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);
    let service = RecommendationService::new(db, config.gate_threshold);

    match config.command {
        Command::Serve { addr } => {
            let app = api::router(AppState { service });
            let addr: SocketAddr = addr.parse().context("Invalid API address")?;
            info!("API listening on http://{}", addr);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
        Command::Recommend { input, caller } => {
            let mut request: RecommendationRequest = read_json(&input)?;
            if caller.is_some() {
                request.caller_id = caller;
            }
            print_json(&service.recommend(&request)?)?;
        }
        Command::ImportPicks { input } => {
            let picks: Vec<GradedPick> = read_json(&input)?;
            let n = service.import_picks(&picks)?;
            info!("Stored {} picks", n);
        }
        Command::Gate => {
            let gate = service.gate()?;
            if gate.passed {
                info!(
                    "✅ Gate passed: {:.1}% over {} decided games",
                    gate.ats_win_rate, gate.decided_games
                );
            } else {
                info!(
                    "⛔ Gate failed: {:.1}% over {} decided games (need {:.1}% over {}+)",
                    gate.ats_win_rate,
                    gate.decided_games,
                    gate.threshold,
                    engine::gate::MIN_GATE_SAMPLE
                );
            }
            print_json(&gate)?;
        }
        Command::Tune {
            report,
            rollout_mode,
            experiment,
            variant,
        } => {
            let report: Option<SegmentationReport> =
                report.as_deref().map(read_json::<SegmentationReport>).transpose()?;
            let rollout = rollout_mode.map(|mode| Rollout {
                mode: mode.into(),
                experiment,
                variant,
            });
            let next = service.tune(report, rollout)?;
            print_json(&next)?;
        }
        Command::Config => {
            print_json(&service.manager().get_effective_config()?)?;
        }
    }

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
