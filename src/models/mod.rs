// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod fitness;
pub mod player;
pub mod session;
pub mod user;

pub use fitness::{AggregateRequest, AggregateResponse, FitnessRecord, FitnessSnapshot, FitnessTotals};
pub use player::{LatLng, LocationUpdate, Marker, Player};
pub use session::{RefreshedToken, Session, SessionState, TokenPair};
pub use user::{UserInfo, UserProfile};
