// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth redirect target: receives the authorization code from Google.

use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::error::{AppError, Result};
use crate::services::oauth::{now_millis, verify_state};

type CodeSender = oneshot::Sender<std::result::Result<String, AppError>>;

/// State for one pending login.
pub struct CallbackState {
    state_key: Vec<u8>,
    expected_nonce: String,
    max_age: Duration,
    sender: Mutex<Option<CodeSender>>,
}

impl CallbackState {
    pub fn new(state_key: Vec<u8>, expected_nonce: String, max_age: Duration, sender: CodeSender) -> Self {
        Self {
            state_key,
            expected_nonce,
            max_age,
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Hand the outcome to the waiting login. Only the first call wins.
    fn complete(&self, outcome: std::result::Result<String, AppError>) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match sender {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }

    fn state_is_valid(&self, state: &str) -> bool {
        let Some(verified) = verify_state(state, &self.state_key) else {
            return false;
        };
        let age_millis = now_millis().saturating_sub(verified.issued_at_millis);
        verified.nonce == self.expected_nonce && age_millis <= self.max_age.as_millis()
    }
}

pub fn routes(path: &str) -> Router<Arc<CallbackState>> {
    let path = if path.is_empty() { "/" } else { path };
    Router::new().route(path, get(oauth_callback))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

const CONNECTED_PAGE: &str = "<!doctype html><title>FitQuest</title>\
    <p>Google Fit connected. You can close this window.</p>";

async fn oauth_callback(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<&'static str>> {
    // Anything without our signed state is not the redirect we asked for.
    let state_ok = params
        .state
        .as_deref()
        .is_some_and(|s| state.state_is_valid(s));
    if !state_ok {
        tracing::warn!("OAuth callback with missing or invalid state, ignoring");
        return Err(AppError::LoginFailed("invalid state parameter".to_string()));
    }

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        state.complete(Err(AppError::LoginFailed(error.clone())));
        return Err(AppError::LoginFailed(error));
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return Err(AppError::LoginFailed("missing authorization code".to_string()));
    };

    if !state.complete(Ok(code)) {
        return Err(AppError::LoginFailed("login already completed".to_string()));
    }

    tracing::info!("Authorization code received");
    Ok(Html(CONNECTED_PAGE))
}
