// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session model: the token pair and the connection state machine.

use serde::{Deserialize, Serialize};

/// The user's authorization, as held by the running process.
///
/// Both fields absent means logged out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }
}

/// Connection state. Polling only happens while `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Token pair returned by the API server's code exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    #[serde(alias = "accessToken")]
    pub access_token: String,
    #[serde(alias = "refreshToken")]
    pub refresh_token: String,
}

/// Refresh response. The refresh token is not rotated.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedToken {
    #[serde(alias = "accessToken")]
    pub access_token: String,
}
