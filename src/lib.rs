// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FitQuest: Google Fit companion for the FitQuest player map
//!
//! This crate connects a Google Fit account, keeps today's step and calorie
//! totals in sync with the FitQuest API server, reports the device location,
//! and shows where the other players are.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::TokenStore;
use models::LatLng;
use services::{
    ApiClient, AuthSession, AuthorizationFlow, Dashboard, FitnessClient, FitnessPoller,
    FixedPosition, GeolocationProvider, LocationReporter, NoGeolocation, PlayerMap,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: TokenStore,
    pub session: Arc<AuthSession>,
    pub poller: Arc<FitnessPoller>,
    pub reporter: Arc<LocationReporter>,
    pub players: Arc<PlayerMap>,
}

impl AppState {
    /// Wire every component against one store and one API server.
    pub fn new(
        config: Config,
        store: TokenStore,
        flow: Arc<dyn AuthorizationFlow>,
        geolocation: Arc<dyn GeolocationProvider>,
    ) -> Self {
        let api = ApiClient::new(&config.api_base_url);
        let fitness = FitnessClient::new(&config.fitness_api_url, &config.userinfo_url);

        let session = Arc::new(AuthSession::new(api.clone(), flow, store.clone()));
        let poller = Arc::new(FitnessPoller::new(
            Arc::clone(&session),
            fitness,
            api.clone(),
            store.clone(),
        ));
        let reporter = Arc::new(LocationReporter::new(api.clone(), store.clone(), geolocation));
        let players = Arc::new(PlayerMap::new(api, store.clone()));

        Self {
            config,
            store,
            session,
            poller,
            reporter,
            players,
        }
    }

    /// Geolocation from configuration, or none.
    pub fn configured_geolocation(config: &Config) -> Arc<dyn GeolocationProvider> {
        match config.device_position {
            Some((lat, lng)) => Arc::new(FixedPosition(LatLng { lat, lng })),
            None => Arc::new(NoGeolocation),
        }
    }

    /// Supervisor that polls while the session is connected.
    pub fn dashboard(&self) -> Dashboard {
        Dashboard::new(
            Arc::clone(&self.session),
            Arc::clone(&self.poller),
            Arc::clone(&self.reporter),
            self.config.poll_interval,
        )
    }
}
