// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types.
//!
//! Errors that affect the primary displayed metric carry a user-facing
//! message; errors from background side stores are logged by their callers
//! and never reach the user.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Identity provider declined, or the user cancelled the consent screen.
    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Token exchange failed: {0}")]
    ExchangeError(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Token refresh failed: {0}")]
    RefreshError(String),

    /// A single 401 from the fitness API. Triggers one refresh-and-retry.
    #[error("Access token rejected")]
    Unauthorized,

    /// Second consecutive 401, or a 401 with no refresh token to fall back on.
    #[error("Authorization expired")]
    AuthExpired,

    #[error("No fitness data available for today")]
    NoDataAvailable,

    #[error("Failed to fetch player locations: {0}")]
    FetchPlayersError(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Fitness API error: {0}")]
    FitnessApi(String),

    #[error("API server error: {0}")]
    Backend(String),

    #[error("Geolocation unavailable: {0}")]
    Geolocation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Coarse classification used by display state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    LoginFailed,
    ExchangeFailed,
    RefreshFailed,
    AuthExpired,
    NoDataAvailable,
    FetchPlayersFailed,
    NotConnected,
    Other,
}

/// An error as shown to the user: what went wrong and what they can do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    /// True for a single authorization failure that a token refresh may fix.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Unauthorized)
    }

    /// True when the error leaves the user logged out.
    pub fn ends_session(&self) -> bool {
        matches!(self, AppError::RefreshError(_) | AppError::AuthExpired)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::LoginFailed(_) => ErrorKind::LoginFailed,
            AppError::ExchangeError(_) | AppError::MalformedResponse(_) => {
                ErrorKind::ExchangeFailed
            }
            AppError::RefreshError(_) => ErrorKind::RefreshFailed,
            AppError::Unauthorized | AppError::AuthExpired => ErrorKind::AuthExpired,
            AppError::NoDataAvailable => ErrorKind::NoDataAvailable,
            AppError::FetchPlayersError(_) => ErrorKind::FetchPlayersFailed,
            AppError::NotConnected => ErrorKind::NotConnected,
            _ => ErrorKind::Other,
        }
    }

    /// Message suitable for the dashboard.
    pub fn user_message(&self) -> String {
        match self {
            AppError::LoginFailed(_) => "Failed to login to Google Fit".to_string(),
            AppError::ExchangeError(_) | AppError::MalformedResponse(_) => {
                "Failed to complete Google Fit connection".to_string()
            }
            AppError::RefreshError(_) | AppError::AuthExpired | AppError::Unauthorized => {
                "Your Google Fit session expired. Please connect again.".to_string()
            }
            AppError::NoDataAvailable => "No fitness data found for today. If you just set up \
                 Google Fit, please wait a few hours for data to sync."
                .to_string(),
            AppError::FetchPlayersError(_) => "Failed to load player locations".to_string(),
            AppError::NotConnected => "Connect with Google Fit to see your data".to_string(),
            other => format!("Error fetching fitness data: {}", other),
        }
    }

    pub fn notice(&self) -> Notice {
        Notice {
            kind: self.kind(),
            message: self.user_message(),
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::LoginFailed(msg) => {
                (StatusCode::BAD_REQUEST, "login_failed", Some(msg.clone()))
            }
            AppError::ExchangeError(msg) | AppError::MalformedResponse(msg) => {
                (StatusCode::BAD_GATEWAY, "exchange_failed", Some(msg.clone()))
            }
            AppError::NotConnected => (StatusCode::UNAUTHORIZED, "not_connected", None),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            other => {
                tracing::warn!(error = %other, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "request_failed", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;
