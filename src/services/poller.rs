// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitness poller: today's steps and calories for the connected user.
//!
//! Handles the core workflow:
//! 1. Query step and calorie aggregates since local midnight
//! 2. On a 401, refresh the access token and retry once
//! 3. Skip empty (not yet synced) days without touching anything
//! 4. Refresh the cached profile and persist totals to the datastore
//! 5. Publish the new snapshot to the display state

use crate::db::TokenStore;
use crate::error::{AppError, Notice};
use crate::models::{FitnessRecord, FitnessSnapshot, FitnessTotals, UserProfile};
use crate::services::api::ApiClient;
use crate::services::fitness::FitnessClient;
use crate::services::session::AuthSession;
use crate::time_utils::{format_utc_rfc3339, QueryWindow};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// A 401 gets one refresh-and-retry; the next 401 is final.
pub const MAX_AUTH_RETRIES: u32 = 1;

/// What the dashboard shows for the fitness widget.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FitnessView {
    pub snapshot: Option<FitnessSnapshot>,
    pub profile: Option<UserProfile>,
    pub loading: bool,
    pub error: Option<Notice>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Polls the fitness API on behalf of the current session.
pub struct FitnessPoller {
    session: Arc<AuthSession>,
    fitness: FitnessClient,
    api: ApiClient,
    store: TokenStore,
    view: Mutex<FitnessView>,
}

impl FitnessPoller {
    pub fn new(
        session: Arc<AuthSession>,
        fitness: FitnessClient,
        api: ApiClient,
        store: TokenStore,
    ) -> Self {
        Self {
            session,
            fitness,
            api,
            store,
            view: Mutex::new(FitnessView::default()),
        }
    }

    /// Current display state. Empty once the session has left `Connected`.
    pub fn view(&self) -> FitnessView {
        self.displayed().clone()
    }

    pub fn snapshot(&self) -> Option<FitnessSnapshot> {
        self.displayed().snapshot.clone()
    }

    fn displayed(&self) -> std::sync::MutexGuard<'_, FitnessView> {
        let mut view = self.lock();
        if !self.session.is_connected() {
            *view = FitnessView::default();
        }
        view
    }

    /// Drop everything shown; used when the session ends.
    pub fn clear(&self) {
        *self.lock() = FitnessView::default();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FitnessView> {
        self.view.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Poll with the session's current access token (manual refresh).
    pub async fn poll_now(&self) -> Result<FitnessSnapshot, AppError> {
        let token = self.session.access_token().ok_or(AppError::NotConnected)?;
        self.poll(&token).await
    }

    /// Fetch today's totals with `token` and update the display state.
    pub async fn poll(&self, token: &str) -> Result<FitnessSnapshot, AppError> {
        if !self.session.is_connected() {
            return Err(AppError::NotConnected);
        }

        self.lock().loading = true;
        let result = self.fetch(token, Local::now()).await;

        // The session may have ended while we were waiting on the network.
        if !self.session.is_connected() {
            tracing::debug!("Session ended during poll, discarding result");
            self.clear();
            return result;
        }

        let mut view = self.lock();
        view.loading = false;
        match &result {
            Ok(snapshot) => {
                tracing::info!(
                    steps = snapshot.steps,
                    calories = snapshot.calories,
                    captured_at = %format_utc_rfc3339(snapshot.captured_at),
                    "Fitness snapshot updated"
                );
                view.snapshot = Some(snapshot.clone());
                view.profile = self.store_profile();
                view.error = None;
                view.last_updated = Some(snapshot.captured_at);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Fitness poll failed");
                view.error = Some(e.notice());
            }
        }
        drop(view);

        if let Err(e) = &result {
            if e.ends_session() {
                self.session.disconnect();
                self.clear();
            }
        }

        result
    }

    fn store_profile(&self) -> Option<UserProfile> {
        Some(UserProfile {
            email: self.store.email()?,
            display_name: self.store.display_name().unwrap_or_default(),
        })
    }

    async fn fetch(
        &self,
        token: &str,
        now: DateTime<Local>,
    ) -> Result<FitnessSnapshot, AppError> {
        let window = QueryWindow::since_midnight(&now);
        let mut token = token.to_string();
        let mut retries = 0;

        let totals = loop {
            match self.fitness.daily_totals(&token, window).await {
                Ok(totals) => break totals,
                Err(e) if e.is_unauthorized() => token = self.reauthorize(&mut retries).await?,
                Err(e) => return Err(e),
            }
        };

        tracing::info!(
            steps = totals.steps,
            calories = totals.calories,
            start = window.start_millis,
            end = window.end_millis,
            "Fetched fitness totals"
        );

        if totals.is_empty() {
            return Err(AppError::NoDataAvailable);
        }

        // Shares the retry budget with the aggregate queries.
        let info = loop {
            match self.fitness.user_info(&token).await {
                Ok(info) => break info,
                Err(e) if e.is_unauthorized() => token = self.reauthorize(&mut retries).await?,
                Err(e) => return Err(e),
            }
        };
        let profile = info
            .into_profile()
            .ok_or_else(|| AppError::FitnessApi("Failed to fetch user info".to_string()))?;

        // Nothing below may outlive a disconnect.
        if !self.session.is_connected() {
            return Err(AppError::NotConnected);
        }

        if let Err(e) = self.store.set_profile(&profile.email, &profile.display_name) {
            tracing::warn!(error = %e, "Failed to cache profile");
        }

        self.persist(&profile, totals);

        if let Err(e) = self.store.set_cached_steps(totals.steps) {
            tracing::warn!(error = %e, "Failed to cache step count");
        }

        Ok(FitnessSnapshot::from_totals(totals, now.with_timezone(&Utc)))
    }

    /// Refresh the access token after a 401, at most `MAX_AUTH_RETRIES`
    /// times per poll.
    async fn reauthorize(&self, retries: &mut u32) -> Result<String, AppError> {
        if *retries >= MAX_AUTH_RETRIES || !self.session.session().can_refresh() {
            tracing::warn!(retries = *retries, "Access token rejected, giving up");
            return Err(AppError::AuthExpired);
        }
        *retries += 1;
        tracing::info!(attempt = *retries, "Access token rejected, refreshing");
        self.session.refresh().await
    }

    /// Send totals to the shared datastore without waiting on it.
    fn persist(&self, profile: &UserProfile, totals: FitnessTotals) {
        let api = self.api.clone();
        let record = FitnessRecord {
            email: profile.email.clone(),
            steps: totals.steps,
            calories: totals.calories,
            name: profile.display_name.clone(),
        };

        tokio::spawn(async move {
            match api.save_fitness_data(&record).await {
                Ok(()) => tracing::debug!(email = %record.email, "Fitness data saved"),
                Err(e) => tracing::warn!(error = %e, "Failed to save fitness data"),
            }
        });
    }
}
