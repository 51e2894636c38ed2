// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod api;
pub mod dashboard;
pub mod fitness;
pub mod location;
pub mod oauth;
pub mod players;
pub mod poller;
pub mod session;

pub use api::ApiClient;
pub use dashboard::{Dashboard, DashboardHandle};
pub use fitness::FitnessClient;
pub use location::{FixedPosition, GeolocationProvider, LocationReporter, NoGeolocation, ReportOutcome};
pub use oauth::{AuthorizationFlow, BrowserFlow};
pub use players::{PlayerDetail, PlayerMap, PlayerMapView};
pub use poller::{FitnessPoller, FitnessView, MAX_AUTH_RETRIES};
pub use session::AuthSession;
