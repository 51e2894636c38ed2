// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session manager: login, code exchange, refresh, and disconnect.
//!
//! The in-memory `Session` is the source of truth for the running process;
//! the token store is a durable mirror so the session survives restarts.
//! State transitions are published on a `watch` channel that the dashboard
//! supervisor uses to start and stop polling.

use crate::db::TokenStore;
use crate::error::AppError;
use crate::models::{Session, SessionState};
use crate::services::api::ApiClient;
use crate::services::oauth::AuthorizationFlow;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Owns the user's authorization and its lifecycle.
pub struct AuthSession {
    api: ApiClient,
    flow: Arc<dyn AuthorizationFlow>,
    store: TokenStore,
    session: Mutex<Session>,
    state: watch::Sender<SessionState>,
}

impl AuthSession {
    /// Restore the session from durable storage.
    ///
    /// A stored access token means we start out `Connected`.
    pub fn new(api: ApiClient, flow: Arc<dyn AuthorizationFlow>, store: TokenStore) -> Self {
        let session = Session {
            access_token: store.access_token(),
            refresh_token: store.refresh_token(),
        };
        let initial = if session.is_active() {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        };
        let (state, _) = watch::channel(initial);

        tracing::debug!(state = ?initial, "Session restored from storage");

        Self {
            api,
            flow,
            store,
            session: Mutex::new(session),
            state,
        }
    }

    // ─── Accessors ───────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn session(&self) -> Session {
        self.lock().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.lock().refresh_token.clone()
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn transition(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::info!(from = ?previous, to = ?next, "Session state changed");
        }
    }

    // ─── Lifecycle ───────────────────────────────────────────────

    /// Run the authorization-code flow and exchange the code for tokens.
    pub async fn login(&self) -> Result<(), AppError> {
        self.transition(SessionState::Connecting);

        let code = match self.flow.authorize().await {
            Ok(code) => code,
            Err(e) => {
                tracing::error!(error = %e, "Login failed");
                // Disconnected always means no tokens, even if we had some.
                self.disconnect();
                return Err(match e {
                    AppError::LoginFailed(_) => e,
                    other => AppError::LoginFailed(other.to_string()),
                });
            }
        };

        self.exchange_code(&code).await
    }

    /// Exchange an authorization code, persist the tokens, and connect.
    pub async fn exchange_code(&self, code: &str) -> Result<(), AppError> {
        if self.state() != SessionState::Connecting {
            self.transition(SessionState::Connecting);
        }

        let tokens = match self.api.exchange_code(code).await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::error!(error = %e, "Token exchange failed");
                self.disconnect();
                return Err(e);
            }
        };

        if let Err(e) = self.store.set_tokens(&tokens.access_token, &tokens.refresh_token) {
            // The in-memory session still works for this run.
            tracing::warn!(error = %e, "Failed to persist tokens");
        }

        {
            let mut session = self.lock();
            session.access_token = Some(tokens.access_token);
            session.refresh_token = Some(tokens.refresh_token);
        }

        self.transition(SessionState::Connected);
        Ok(())
    }

    /// Obtain a new access token. Any failure tears the session down.
    pub async fn refresh(&self) -> Result<String, AppError> {
        let Some(refresh_token) = self.refresh_token() else {
            self.disconnect();
            return Err(AppError::RefreshError("no refresh token".to_string()));
        };

        let access_token = match self.api.refresh_access_token(&refresh_token).await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(error = %e, "Token refresh failed, disconnecting");
                self.disconnect();
                return Err(match e {
                    AppError::RefreshError(_) => e,
                    other => AppError::RefreshError(other.to_string()),
                });
            }
        };

        // A disconnect may have raced the request; don't resurrect the session.
        {
            let mut session = self.lock();
            if session.refresh_token.as_deref() != Some(refresh_token.as_str()) {
                return Err(AppError::NotConnected);
            }
            session.access_token = Some(access_token.clone());
        }

        if let Err(e) = self.store.set_access_token(&access_token) {
            tracing::warn!(error = %e, "Failed to persist refreshed access token");
        }

        tracing::info!("Access token refreshed");
        Ok(access_token)
    }

    /// Forget the session, in memory and on disk. Idempotent.
    ///
    /// Dependents see the transition to `Disconnected` and drop their caches.
    pub fn disconnect(&self) {
        {
            let mut session = self.lock();
            *session = Session::default();
        }

        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "Failed to clear token store");
        }

        self.transition(SessionState::Disconnected);
    }
}
