// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google authorization-code flow.
//!
//! The flow is a seam: `AuthSession` only needs something that eventually
//! yields an authorization code. `BrowserFlow` is the interactive
//! implementation. It prints the consent URL and runs a one-shot callback
//! listener on the redirect URI.

use crate::config::Config;
use crate::error::AppError;
use crate::routes::callback::CallbackState;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
use tokio::sync::oneshot;

type HmacSha256 = Hmac<Sha256>;

/// Fitness read scopes plus identity scopes.
pub const SCOPES: [&str; 4] = [
    "https://www.googleapis.com/auth/fitness.activity.read",
    "https://www.googleapis.com/auth/fitness.body.read",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

/// Something that produces an authorization code, or `LoginFailed`.
#[async_trait]
pub trait AuthorizationFlow: Send + Sync {
    async fn authorize(&self) -> Result<String, AppError>;
}

/// Build the consent URL: offline access (so a refresh token is issued) and
/// forced consent.
pub fn authorization_url(auth_url: &str, client_id: &str, redirect_uri: &str, state: &str) -> String {
    let scope = SCOPES.join(" ");
    let params = [
        ("client_id", client_id),
        ("redirect_uri", redirect_uri),
        ("response_type", "code"),
        ("scope", scope.as_str()),
        ("access_type", "offline"),
        ("prompt", "consent"),
        ("include_granted_scopes", "true"),
        ("state", state),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", auth_url, query)
}

// ─── Signed State ────────────────────────────────────────────────
//
// base64url("nonce|timestamp_hex|hmac_hex")

/// Decoded and verified `state` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedState {
    pub nonce: String,
    pub issued_at_millis: u128,
}

pub fn sign_state(secret: &[u8], nonce: &str, issued_at_millis: u128) -> Result<String, AppError> {
    let payload = format!("{}|{:x}", nonce, issued_at_millis);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify the HMAC and decode the state. `None` if tampered or malformed.
pub fn verify_state(state: &str, secret: &[u8]) -> Option<VerifiedState> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let (nonce, timestamp_hex, signature_hex) = (parts[0], parts[1], parts[2]);
    let payload = format!("{}|{}", nonce, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    Some(VerifiedState {
        nonce: nonce.to_string(),
        issued_at_millis: u128::from_str_radix(timestamp_hex, 16).ok()?,
    })
}

pub(crate) fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

fn random_nonce() -> Result<String, AppError> {
    let mut bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("system randomness unavailable")))?;
    Ok(hex::encode(bytes))
}

// ─── Browser Flow ────────────────────────────────────────────────

/// Interactive flow: the user opens the URL, Google redirects back to us.
pub struct BrowserFlow {
    auth_url: String,
    client_id: String,
    redirect_uri: String,
    state_key: Vec<u8>,
    timeout: Duration,
}

impl BrowserFlow {
    pub fn from_config(config: &Config) -> Self {
        Self {
            auth_url: config.auth_url.clone(),
            client_id: config.google_client_id.clone(),
            redirect_uri: config.oauth_redirect_uri.clone(),
            state_key: config.oauth_state_key.clone(),
            timeout: config.login_timeout,
        }
    }
}

#[async_trait]
impl AuthorizationFlow for BrowserFlow {
    async fn authorize(&self) -> Result<String, AppError> {
        let redirect = reqwest::Url::parse(&self.redirect_uri)
            .map_err(|e| AppError::LoginFailed(format!("invalid redirect URI: {}", e)))?;
        let host = redirect.host_str().unwrap_or("localhost").to_string();
        let port = redirect.port_or_known_default().unwrap_or(80);
        let path = redirect.path().to_string();

        let nonce = random_nonce()?;
        let state = sign_state(&self.state_key, &nonce, now_millis())?;
        let url = authorization_url(&self.auth_url, &self.client_id, &self.redirect_uri, &state);

        let listener = tokio::net::TcpListener::bind((host.as_str(), port))
            .await
            .map_err(|e| {
                AppError::LoginFailed(format!("cannot listen on {}:{}: {}", host, port, e))
            })?;

        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let callback_state = Arc::new(CallbackState::new(
            self.state_key.clone(),
            nonce,
            self.timeout,
            code_tx,
        ));
        let app = crate::routes::create_router(callback_state, &path);

        let server = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                tracing::warn!(error = %e, "OAuth callback listener stopped");
            }
        });

        tracing::info!(
            client_id = %self.client_id,
            redirect_uri = %self.redirect_uri,
            "Waiting for Google authorization"
        );
        eprintln!("Open this URL in your browser to connect Google Fit:\n\n  {}\n", url);

        let outcome = tokio::time::timeout(self.timeout, code_rx).await;

        let _ = shutdown_tx.send(());
        let _ = server.await;

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AppError::LoginFailed("callback listener closed".to_string())),
            Err(_) => Err(AppError::LoginFailed("timed out waiting for consent".to_string())),
        }
    }
}
