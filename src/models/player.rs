// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Player records from the shared datastore and map geometry.

use serde::{de, Deserialize, Deserializer, Serialize};

/// A player's last-known location and today's totals.
///
/// Owned by the API server; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "number_or_string")]
    pub latitude: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub longitude: f64,
    #[serde(default, deserialize_with = "optional_count")]
    pub steps: u64,
    #[serde(default, deserialize_with = "optional_number")]
    pub calories: f64,
}

impl Player {
    /// True (un-nudged) position.
    pub fn position(&self) -> LatLng {
        LatLng {
            lat: self.latitude,
            lng: self.longitude,
        }
    }
}

/// A map coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// A rendered map marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub email: String,
    pub title: String,
    /// Display position, nudged to separate coincident players.
    pub position: LatLng,
    pub steps: u64,
    /// Whole kilocalories for display.
    pub calories: u64,
}

/// Body of `POST /update-location`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationUpdate {
    /// Absent when the profile has not been fetched yet.
    pub email: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

// The datastore has been seen returning coordinates as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n,
        NumberOrString::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid coordinate: {:?}", s)))?,
    };
    if !value.is_finite() {
        return Err(de::Error::custom("coordinate is not finite"));
    }
    Ok(value)
}

fn optional_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(NumberOrString::Number(n)) if n.is_finite() => n,
        Some(NumberOrString::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn optional_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let n = optional_number(deserializer)?;
    Ok(if n > 0.0 { n.round() as u64 } else { 0 })
}
