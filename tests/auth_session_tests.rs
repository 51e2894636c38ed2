// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

mod common;

use axum::http::StatusCode;
use common::{connected_store, test_app, MockConfig, MockServer, StubFlow};
use fitquest::db::{keys, TokenStore};
use fitquest::error::AppError;
use fitquest::models::SessionState;

#[tokio::test]
async fn test_restored_token_starts_connected() {
    let server = MockServer::start(MockConfig::default()).await;
    let app = test_app(&server, connected_store("access-1", Some("refresh-1")), StubFlow::cancelled());

    assert_eq!(app.session.state(), SessionState::Connected);
    assert_eq!(app.session.access_token().as_deref(), Some("access-1"));
    assert_eq!(app.session.refresh_token().as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_empty_store_starts_disconnected() {
    let server = MockServer::start(MockConfig::default()).await;
    let app = test_app(&server, TokenStore::in_memory(), StubFlow::cancelled());

    assert_eq!(app.session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_login_exchanges_code_and_persists_tokens() {
    let server = MockServer::start(MockConfig::default()).await;
    let flow = StubFlow::granting("4/auth-code");
    let app = test_app(&server, TokenStore::in_memory(), flow.clone());
    let mut states = app.session.subscribe();

    app.session.login().await.unwrap();

    assert_eq!(app.session.state(), SessionState::Connected);
    assert_eq!(server.count(|c| &c.exchange), 1);
    assert_eq!(app.store.get(keys::ACCESS_TOKEN).as_deref(), Some("access-1"));
    assert_eq!(app.store.get(keys::REFRESH_TOKEN).as_deref(), Some("refresh-1"));
    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), SessionState::Connected);
}

#[tokio::test]
async fn test_login_cancelled_returns_to_disconnected() {
    let server = MockServer::start(MockConfig::default()).await;
    let app = test_app(&server, TokenStore::in_memory(), StubFlow::cancelled());

    let err = app.session.login().await.unwrap_err();

    assert!(matches!(err, AppError::LoginFailed(_)));
    assert_eq!(app.session.state(), SessionState::Disconnected);
    assert_eq!(server.count(|c| &c.exchange), 0);
}

#[tokio::test]
async fn test_exchange_http_error() {
    let server = MockServer::start(MockConfig {
        exchange_status: StatusCode::INTERNAL_SERVER_ERROR,
        exchange_body: "boom".to_string(),
        ..MockConfig::default()
    })
    .await;
    let app = test_app(&server, TokenStore::in_memory(), StubFlow::granting("code"));

    let err = app.session.login().await.unwrap_err();

    assert!(matches!(err, AppError::ExchangeError(_)));
    assert_eq!(app.session.state(), SessionState::Disconnected);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_exchange_malformed_body() {
    let server = MockServer::start(MockConfig {
        exchange_body: "{\"access_token\": 42".to_string(),
        ..MockConfig::default()
    })
    .await;
    let app = test_app(&server, TokenStore::in_memory(), StubFlow::granting("code"));

    let err = app.session.exchange_code("code").await.unwrap_err();

    assert!(matches!(err, AppError::MalformedResponse(_)));
    assert_eq!(app.session.state(), SessionState::Disconnected);
    assert_eq!(app.session.access_token(), None);
}

#[tokio::test]
async fn test_refresh_updates_access_token_only() {
    let server = MockServer::start(MockConfig::default()).await;
    let app = test_app(&server, connected_store("access-1", Some("refresh-1")), StubFlow::cancelled());

    let token = app.session.refresh().await.unwrap();

    assert_eq!(token, "access-2");
    assert_eq!(app.session.access_token().as_deref(), Some("access-2"));
    assert_eq!(app.session.refresh_token().as_deref(), Some("refresh-1"));
    assert_eq!(app.store.access_token().as_deref(), Some("access-2"));
    assert_eq!(app.store.refresh_token().as_deref(), Some("refresh-1"));
    assert_eq!(app.session.state(), SessionState::Connected);
}

#[tokio::test]
async fn test_refresh_server_error_disconnects() {
    let server = MockServer::start(MockConfig {
        refresh_status: StatusCode::INTERNAL_SERVER_ERROR,
        ..MockConfig::default()
    })
    .await;
    let store = connected_store("access-1", Some("refresh-1"));
    store.set_profile("walker@example.com", "Walker").unwrap();
    let app = test_app(&server, store, StubFlow::cancelled());

    let err = app.session.refresh().await.unwrap_err();

    assert!(matches!(err, AppError::RefreshError(_)));
    assert_eq!(app.session.state(), SessionState::Disconnected);
    assert_eq!(app.store.access_token(), None);
    assert_eq!(app.store.refresh_token(), None);
    assert!(app.store.is_empty());
    assert!(!app.session.session().is_active());
}

#[tokio::test]
async fn test_refresh_without_refresh_token() {
    let server = MockServer::start(MockConfig::default()).await;
    let app = test_app(&server, connected_store("access-1", None), StubFlow::cancelled());

    let err = app.session.refresh().await.unwrap_err();

    assert!(matches!(err, AppError::RefreshError(_)));
    assert_eq!(server.count(|c| &c.refresh), 0);
    assert_eq!(app.session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let server = MockServer::start(MockConfig::default()).await;
    let store = connected_store("access-1", Some("refresh-1"));
    store.set_profile("walker@example.com", "Walker").unwrap();
    store.set_cached_steps(1234).unwrap();
    let app = test_app(&server, store, StubFlow::cancelled());

    app.session.disconnect();
    app.session.disconnect();

    assert_eq!(app.session.state(), SessionState::Disconnected);
    assert_eq!(app.session.access_token(), None);
    assert_eq!(app.session.refresh_token(), None);
    assert!(app.store.is_empty());
    assert_eq!(server.count(|c| &c.refresh), 0);
}

#[tokio::test]
async fn test_failed_relogin_leaves_no_tokens() {
    let server = MockServer::start(MockConfig::default()).await;
    let app = test_app(&server, connected_store("access-1", Some("refresh-1")), StubFlow::cancelled());

    let err = app.session.login().await.unwrap_err();

    assert!(matches!(err, AppError::LoginFailed(_)));
    assert_eq!(app.session.state(), SessionState::Disconnected);
    assert_eq!(app.session.access_token(), None);
    assert_eq!(app.session.refresh_token(), None);
    assert!(app.store.is_empty());
    assert!(matches!(app.poller.poll_now().await, Err(AppError::NotConnected)));
}

#[tokio::test]
async fn test_failed_exchange_from_connected_leaves_no_tokens() {
    let server = MockServer::start(MockConfig {
        exchange_status: StatusCode::BAD_GATEWAY,
        ..MockConfig::default()
    })
    .await;
    let app = test_app(&server, connected_store("access-1", Some("refresh-1")), StubFlow::granting("code"));

    let err = app.session.login().await.unwrap_err();

    assert!(matches!(err, AppError::ExchangeError(_)));
    assert_eq!(app.session.state(), SessionState::Disconnected);
    assert!(!app.session.session().is_active());
    assert!(app.store.is_empty());
}
