// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One-shot device location reporting.
//!
//! Failures here feed a background store only, so they are logged and
//! dropped; the user never sees them.

use crate::db::TokenStore;
use crate::error::AppError;
use crate::models::{LatLng, LocationUpdate};
use crate::services::api::ApiClient;
use async_trait::async_trait;
use std::sync::Arc;

/// Source of the device's current position.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<LatLng, AppError>;
}

/// A position fixed by configuration.
pub struct FixedPosition(pub LatLng);

#[async_trait]
impl GeolocationProvider for FixedPosition {
    async fn current_position(&self) -> Result<LatLng, AppError> {
        Ok(self.0)
    }
}

/// No position available (the equivalent of a denied permission prompt).
pub struct NoGeolocation;

#[async_trait]
impl GeolocationProvider for NoGeolocation {
    async fn current_position(&self) -> Result<LatLng, AppError> {
        Err(AppError::Geolocation(
            "no device position configured".to_string(),
        ))
    }
}

/// Result of a report attempt, for callers that care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Reported,
    PositionUnavailable,
    Rejected,
}

/// Reports the device position once per session activation.
pub struct LocationReporter {
    api: ApiClient,
    store: TokenStore,
    provider: Arc<dyn GeolocationProvider>,
}

impl LocationReporter {
    pub fn new(api: ApiClient, store: TokenStore, provider: Arc<dyn GeolocationProvider>) -> Self {
        Self {
            api,
            store,
            provider,
        }
    }

    /// Read the position and send it. Never fails, never retries.
    pub async fn report_once(&self) -> ReportOutcome {
        let position = match self.provider.current_position().await {
            Ok(position) => position,
            Err(e) => {
                tracing::warn!(error = %e, "Error getting location");
                return ReportOutcome::PositionUnavailable;
            }
        };

        let update = LocationUpdate {
            email: self.store.email(),
            latitude: position.lat,
            longitude: position.lng,
        };

        tracing::info!(
            email = ?update.email,
            latitude = update.latitude,
            longitude = update.longitude,
            "Sending location update"
        );

        match self.api.update_location(&update).await {
            Ok(()) => ReportOutcome::Reported,
            Err(e) => {
                tracing::warn!(error = %e, "Error updating location");
                ReportOutcome::Rejected
            }
        }
    }
}
