// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Player map: the shared list of players and how it is laid out on a map.

use crate::db::{keys, TokenStore};
use crate::error::{AppError, Notice};
use crate::models::{LatLng, Marker, Player};
use crate::services::api::ApiClient;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Center used when there are no players to center on.
pub const WORLD_VIEW_CENTER: LatLng = LatLng { lat: 20.0, lng: 0.0 };
pub const DEFAULT_ZOOM: u8 = 12;
/// Per-index marker offset in degrees, to pull apart coincident players.
pub const MARKER_NUDGE_DEGREES: f64 = 0.00001;

/// Map center: the local user, else the first player, else the world view.
pub fn select_center(players: &[Player], local_email: Option<&str>) -> LatLng {
    local_email
        .and_then(|email| players.iter().find(|p| p.email == email))
        .or_else(|| players.first())
        .map(Player::position)
        .unwrap_or(WORLD_VIEW_CENTER)
}

/// Display-only position for the `index`th marker.
pub fn nudged_position(player: &Player, index: usize) -> LatLng {
    let offset = index as f64 * MARKER_NUDGE_DEGREES;
    LatLng {
        lat: player.latitude + offset,
        lng: player.longitude + offset,
    }
}

fn whole_calories(calories: f64) -> u64 {
    calories.round().max(0.0) as u64
}

/// Info window for a selected player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerDetail {
    pub name: String,
    pub email: String,
    pub steps: u64,
    pub calories: u64,
    pub position: LatLng,
}

/// What the map widget shows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerMapView {
    pub players: Vec<Player>,
    pub loading: bool,
    /// Set on failure; the user can retry with another fetch.
    pub error: Option<Notice>,
}

pub struct PlayerMap {
    api: ApiClient,
    store: TokenStore,
    view: Mutex<PlayerMapView>,
}

impl PlayerMap {
    pub fn new(api: ApiClient, store: TokenStore) -> Self {
        Self {
            api,
            store,
            view: Mutex::new(PlayerMapView::default()),
        }
    }

    pub fn view(&self) -> PlayerMapView {
        self.lock().clone()
    }

    pub fn players(&self) -> Vec<Player> {
        self.lock().players.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PlayerMapView> {
        self.view.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Load the player list. On failure the previous list is kept and the
    /// error is shown alongside a retry affordance.
    pub async fn fetch_players(&self) -> Result<usize, AppError> {
        self.lock().loading = true;
        let result = self.api.players_location().await;

        let mut view = self.lock();
        view.loading = false;
        match result {
            Ok(players) => {
                let count = players.len();
                tracing::info!(count, "Loaded player locations");
                view.players = players;
                view.error = None;
                Ok(count)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error fetching players");
                view.error = Some(e.notice());
                Err(e)
            }
        }
    }

    pub fn map_center(&self) -> LatLng {
        let email = self.store.email();
        select_center(&self.lock().players, email.as_deref())
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.lock()
            .players
            .iter()
            .enumerate()
            .map(|(index, player)| Marker {
                email: player.email.clone(),
                title: player.name.clone(),
                position: nudged_position(player, index),
                steps: player.steps,
                calories: whole_calories(player.calories),
            })
            .collect()
    }

    /// Detail for a selected marker, anchored at the true position.
    pub fn select(&self, email: &str) -> Option<PlayerDetail> {
        self.lock()
            .players
            .iter()
            .find(|p| p.email == email)
            .map(|p| PlayerDetail {
                name: p.name.clone(),
                email: p.email.clone(),
                steps: p.steps,
                calories: whole_calories(p.calories),
                position: p.position(),
            })
    }

    /// Refetch whenever the locally-identified user changes.
    pub fn watch_identity(self: Arc<Self>) -> JoinHandle<()> {
        let mut events = self.store.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.key == keys::EMAIL => {
                        tracing::debug!("Signed-in user changed, refetching players");
                        let _ = self.fetch_players().await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Storage events lagged, refetching players");
                        let _ = self.fetch_players().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
