// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FitQuest command-line companion
//!
//! Connects Google Fit, keeps today's totals flowing to the FitQuest API
//! server while running, and prints the shared player map.

use clap::{Parser, Subcommand};
use fitquest::{
    config::Config,
    db::TokenStore,
    services::{players::DEFAULT_ZOOM, BrowserFlow},
    AppState,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often `run` picks up storage changes made by other processes.
const STORAGE_RELOAD_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "fitquest")]
#[command(about = "Google Fit companion for the FitQuest player map")]
struct Cli {
    /// Storage file (overrides FITQUEST_STORAGE).
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect a Google Fit account.
    Login,
    /// Poll fitness data and report location until interrupted.
    Run,
    /// Fetch today's totals once.
    Poll,
    /// Show the player map.
    Players,
    /// Show the session state and cached profile.
    Status,
    /// Force an access-token refresh.
    Refresh,
    /// Forget the connected account.
    Disconnect,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging();

    let mut config = Config::from_env()?;
    if let Some(storage) = cli.storage {
        config.storage_path = storage;
    }

    let store = TokenStore::open(&config.storage_path)?;
    let flow = Arc::new(BrowserFlow::from_config(&config));
    let geolocation = AppState::configured_geolocation(&config);
    let state = AppState::new(config, store, flow, geolocation);

    tracing::info!(
        command = ?cli.command,
        state = ?state.session.state(),
        "Starting FitQuest"
    );

    match cli.command {
        Command::Login => {
            state.session.login().await?;
            print_json(&json!({ "state": state.session.state() }))?;
        }
        Command::Run => run(&state).await?,
        Command::Poll => {
            let result = state.poller.poll_now().await;
            print_json(&state.poller.view())?;
            result?;
        }
        Command::Players => {
            let result = state.players.fetch_players().await;
            print_json(&json!({
                "center": state.players.map_center(),
                "zoom": DEFAULT_ZOOM,
                "markers": state.players.markers(),
                "error": state.players.view().error,
            }))?;
            result?;
        }
        Command::Status => {
            print_json(&json!({
                "state": state.session.state(),
                "email": state.store.email(),
                "name": state.store.display_name(),
                "current_steps": state.store.cached_steps(),
            }))?;
        }
        Command::Refresh => {
            state.session.refresh().await?;
            print_json(&json!({ "state": state.session.state() }))?;
        }
        Command::Disconnect => {
            state.session.disconnect();
            print_json(&json!({ "state": state.session.state() }))?;
        }
    }

    Ok(())
}

async fn run(state: &AppState) -> anyhow::Result<()> {
    if !state.session.is_connected() {
        tracing::warn!("Not connected; run `fitquest login` to start polling");
    }

    let dashboard = state.dashboard().spawn();
    let identity_watch = Arc::clone(&state.players).watch_identity();

    if let Err(e) = state.players.fetch_players().await {
        tracing::warn!(error = %e, "Initial player fetch failed");
    }

    let mut reload = tokio::time::interval(STORAGE_RELOAD_INTERVAL);
    reload.tick().await;

    loop {
        tokio::select! {
            _ = reload.tick() => {
                match state.store.reload() {
                    Ok(events) if !events.is_empty() => {
                        tracing::debug!(changed = events.len(), "Storage changed on disk");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "Failed to reload storage"),
                }
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    identity_watch.abort();
    dashboard.shutdown().await;
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize structured JSON logging on stderr.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true)
        .with_writer(std::io::stderr);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("fitquest=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
