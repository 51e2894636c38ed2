// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local development.

use ring::rand::{SecureRandom, SystemRandom};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_FITNESS_API_URL: &str = "https://www.googleapis.com/fitness/v1/users/me";
const DEFAULT_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_REDIRECT_URI: &str = "http://localhost:5175/";
const DEFAULT_STORAGE_PATH: &str = "fitquest-storage.json";

/// Hourly, as on the dashboard.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the FitQuest API server (exchange-code, refresh-token, ...)
    pub api_base_url: String,
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// Where Google sends the user back with the authorization code
    pub oauth_redirect_uri: String,
    /// HMAC key for signing the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
    /// Google authorization endpoint
    pub auth_url: String,
    /// Google Fit REST base (`.../users/me`)
    pub fitness_api_url: String,
    /// Identity provider user-info endpoint
    pub userinfo_url: String,
    /// Durable key/value storage file
    pub storage_path: PathBuf,
    pub poll_interval: Duration,
    /// How long `login` waits for the browser to come back
    pub login_timeout: Duration,
    /// Fixed device position (latitude, longitude), if configured
    pub device_position: Option<(f64, f64)>,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:9".to_string(),
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            oauth_redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            oauth_state_key: b"test_state_key_32_bytes_minimum!".to_vec(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            fitness_api_url: "http://127.0.0.1:9/fitness".to_string(),
            userinfo_url: "http://127.0.0.1:9/userinfo".to_string(),
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            poll_interval: DEFAULT_POLL_INTERVAL,
            login_timeout: Duration::from_secs(5),
            device_position: None,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let oauth_state_key = match env::var("OAUTH_STATE_KEY") {
            Ok(key) if !key.trim().is_empty() => key.trim().as_bytes().to_vec(),
            _ => random_key()?,
        };

        Ok(Self {
            api_base_url: env::var("API_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("API_BASE_URL"))?,
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            oauth_redirect_uri: env::var("OAUTH_REDIRECT_URI")
                .unwrap_or_else(|_| DEFAULT_REDIRECT_URI.to_string()),
            oauth_state_key,
            auth_url: env::var("GOOGLE_AUTH_URL").unwrap_or_else(|_| DEFAULT_AUTH_URL.to_string()),
            fitness_api_url: env::var("FITNESS_API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_FITNESS_API_URL.to_string()),
            userinfo_url: env::var("USERINFO_URL")
                .unwrap_or_else(|_| DEFAULT_USERINFO_URL.to_string()),
            storage_path: env::var("FITQUEST_STORAGE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORAGE_PATH)),
            poll_interval: env::var("POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
            login_timeout: env::var("LOGIN_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_LOGIN_TIMEOUT),
            device_position: parse_position(
                env::var("DEVICE_LATITUDE").ok().as_deref(),
                env::var("DEVICE_LONGITUDE").ok().as_deref(),
            )?,
        })
    }
}

/// Both coordinates or neither; each must be a finite number in range.
fn parse_position(
    lat: Option<&str>,
    lng: Option<&str>,
) -> Result<Option<(f64, f64)>, ConfigError> {
    let (lat, lng) = match (lat, lng) {
        (Some(lat), Some(lng)) => (lat, lng),
        (None, None) => return Ok(None),
        _ => {
            return Err(ConfigError::Invalid(
                "DEVICE_LATITUDE and DEVICE_LONGITUDE must be set together",
            ))
        }
    };

    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid("DEVICE_LATITUDE is not a number"))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid("DEVICE_LONGITUDE is not a number"))?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(ConfigError::Invalid("device position out of range"));
    }

    Ok(Some((lat, lng)))
}

fn random_key() -> Result<Vec<u8>, ConfigError> {
    let mut key = vec![0u8; 32];
    SystemRandom::new()
        .fill(&mut key)
        .map_err(|_| ConfigError::Invalid("system randomness unavailable"))?;
    Ok(key)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}
