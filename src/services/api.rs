// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for the FitQuest API server.
//!
//! Handles:
//! - Authorization code exchange and access token refresh
//! - Location and fitness-data writes to the shared datastore
//! - Reading the player list

use crate::error::AppError;
use crate::models::{FitnessRecord, LocationUpdate, Player, RefreshedToken, TokenPair};
use serde::Serialize;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// FitQuest API server client.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Exchange an authorization code for a token pair.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenPair, AppError> {
        let response = self
            .http
            .post(self.url("exchange-code"))
            .json(&serde_json::json!({ "code": code }))
            .send()
            .await
            .map_err(|e| AppError::ExchangeError(format!("request failed: {}", e)))?;

        let status = response.status();
        tracing::debug!(status = %status, "Exchange code response");

        let text = response
            .text()
            .await
            .map_err(|e| AppError::ExchangeError(format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %text, "Token exchange failed");
            return Err(AppError::ExchangeError(format!("HTTP {}", status)));
        }

        serde_json::from_str(&text).map_err(|e| {
            AppError::MalformedResponse(format!("failed to parse token exchange response: {}", e))
        })
    }

    /// Trade a refresh token for a new access token.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, AppError> {
        let response = self
            .http
            .post(self.url("refresh-token"))
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| AppError::RefreshError(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Token refresh rejected");
            return Err(AppError::RefreshError(format!("HTTP {}", status)));
        }

        let refreshed: RefreshedToken = response
            .json()
            .await
            .map_err(|e| AppError::RefreshError(format!("invalid refresh response: {}", e)))?;

        Ok(refreshed.access_token)
    }

    /// Record the device position for the signed-in player.
    pub async fn update_location(&self, update: &LocationUpdate) -> Result<(), AppError> {
        self.post_ack("update-location", update).await
    }

    /// Record today's totals for the signed-in player.
    pub async fn save_fitness_data(&self, record: &FitnessRecord) -> Result<(), AppError> {
        self.post_ack("save-fitness-data", record).await
    }

    /// All players' last-known locations, in server order.
    pub async fn players_location(&self) -> Result<Vec<Player>, AppError> {
        let response = self
            .http
            .get(self.url("players-location"))
            .send()
            .await
            .map_err(|e| AppError::FetchPlayersError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::FetchPlayersError(format!("HTTP {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::FetchPlayersError(format!("JSON parse error: {}", e)))
    }

    /// POST a JSON body and only care that the server accepted it.
    async fn post_ack<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), AppError> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("{}: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Backend(format!("{}: HTTP {}: {}", path, status, body)));
        }

        Ok(())
    }
}
