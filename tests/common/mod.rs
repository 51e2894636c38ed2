// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fitquest::config::Config;
use fitquest::db::TokenStore;
use fitquest::error::AppError;
use fitquest::models::LatLng;
use fitquest::services::{AuthorizationFlow, FixedPosition, GeolocationProvider};
use fitquest::AppState;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned responses for the mock API server and fitness API.
#[allow(dead_code)]
pub struct MockConfig {
    pub exchange_status: StatusCode,
    pub exchange_body: String,
    pub refresh_status: StatusCode,
    /// Access token handed out by `/refresh-token`.
    pub refreshed_token: String,
    /// Bearer token the fitness API accepts.
    pub valid_token: String,
    /// A second accepted token, e.g. the one handed out on refresh.
    pub also_valid_token: Option<String>,
    /// Calorie queries with this token get a 401 even if it is valid.
    pub reject_calories_token: Option<String>,
    /// User-info requests with this token get a 401 even if it is valid.
    pub reject_userinfo_token: Option<String>,
    pub steps: Value,
    pub calories: Value,
    pub userinfo: Value,
    pub location_status: StatusCode,
    pub save_status: StatusCode,
    pub players_status: StatusCode,
    pub players: Value,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            exchange_status: StatusCode::OK,
            exchange_body: json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
            })
            .to_string(),
            refresh_status: StatusCode::OK,
            refreshed_token: "access-2".to_string(),
            valid_token: "access-1".to_string(),
            also_valid_token: None,
            reject_calories_token: None,
            reject_userinfo_token: None,
            steps: aggregate_int(&[3000, 1500]),
            calories: aggregate_fp(&[210.4]),
            userinfo: json!({ "email": "walker@example.com", "name": "Walker" }),
            location_status: StatusCode::OK,
            save_status: StatusCode::OK,
            players_status: StatusCode::OK,
            players: json!([]),
        }
    }
}

/// Request counters and recorded bodies.
#[derive(Default)]
pub struct MockCounters {
    pub exchange: AtomicUsize,
    pub refresh: AtomicUsize,
    pub aggregate: AtomicUsize,
    pub unauthorized: AtomicUsize,
    pub userinfo: AtomicUsize,
    pub location: AtomicUsize,
    pub save: AtomicUsize,
    pub players: AtomicUsize,
}

pub struct MockState {
    pub config: Mutex<MockConfig>,
    pub counters: MockCounters,
    pub locations: Mutex<Vec<Value>>,
    pub saved: Mutex<Vec<Value>>,
}

/// Mock of the FitQuest API server and the fitness API, on an ephemeral port.
pub struct MockServer {
    pub url: String,
    pub state: Arc<MockState>,
}

#[allow(dead_code)]
impl MockServer {
    pub async fn start(config: MockConfig) -> Self {
        let state = Arc::new(MockState {
            config: Mutex::new(config),
            counters: MockCounters::default(),
            locations: Mutex::new(Vec::new()),
            saved: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/exchange-code", post(exchange_code))
            .route("/refresh-token", post(refresh_token))
            .route("/update-location", post(update_location))
            .route("/save-fitness-data", post(save_fitness_data))
            .route("/players-location", get(players_location))
            .route("/fitness/dataset:aggregate", post(aggregate))
            .route("/userinfo", get(userinfo))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server");
        });

        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    pub fn configure(&self, f: impl FnOnce(&mut MockConfig)) {
        f(&mut self.state.config.lock().unwrap());
    }

    pub fn count(&self, counter: impl Fn(&MockCounters) -> &AtomicUsize) -> usize {
        counter(&self.state.counters).load(Ordering::SeqCst)
    }

    pub fn saved(&self) -> Vec<Value> {
        self.state.saved.lock().unwrap().clone()
    }

    pub fn locations(&self) -> Vec<Value> {
        self.state.locations.lock().unwrap().clone()
    }

    /// Config pointing every endpoint at this server.
    pub fn config(&self) -> Config {
        Config {
            api_base_url: self.url.clone(),
            fitness_api_url: format!("{}/fitness", self.url),
            userinfo_url: format!("{}/userinfo", self.url),
            device_position: Some((37.4, -122.1)),
            ..Config::test_default()
        }
    }
}

async fn exchange_code(State(state): State<Arc<MockState>>) -> Response {
    state.counters.exchange.fetch_add(1, Ordering::SeqCst);
    let config = state.config.lock().unwrap();
    (config.exchange_status, config.exchange_body.clone()).into_response()
}

async fn refresh_token(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.counters.refresh.fetch_add(1, Ordering::SeqCst);
    assert!(body["refresh_token"].is_string(), "refresh body: {}", body);
    let config = state.config.lock().unwrap();
    if !config.refresh_status.is_success() {
        return (config.refresh_status, "refresh rejected").into_response();
    }
    Json(json!({ "access_token": config.refreshed_token })).into_response()
}

async fn update_location(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.counters.location.fetch_add(1, Ordering::SeqCst);
    state.locations.lock().unwrap().push(body);
    let status = state.config.lock().unwrap().location_status;
    (status, Json(json!({ "ok": status.is_success() }))).into_response()
}

async fn save_fitness_data(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.counters.save.fetch_add(1, Ordering::SeqCst);
    state.saved.lock().unwrap().push(body);
    let status = state.config.lock().unwrap().save_status;
    (status, Json(json!({ "ok": status.is_success() }))).into_response()
}

async fn players_location(State(state): State<Arc<MockState>>) -> Response {
    state.counters.players.fetch_add(1, Ordering::SeqCst);
    let config = state.config.lock().unwrap();
    (config.players_status, Json(config.players.clone())).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn bearer_ok(headers: &HeaderMap, config: &MockConfig, rejected: Option<&str>) -> bool {
    let Some(token) = bearer(headers) else {
        return false;
    };
    if rejected == Some(token) {
        return false;
    }
    token == config.valid_token || config.also_valid_token.as_deref() == Some(token)
}

async fn aggregate(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.counters.aggregate.fetch_add(1, Ordering::SeqCst);
    let config = state.config.lock().unwrap();
    let data_type = body["aggregateBy"][0]["dataTypeName"].as_str();
    let rejected = match data_type {
        Some("com.google.calories.expended") => config.reject_calories_token.as_deref(),
        _ => None,
    };
    if !bearer_ok(&headers, &config, rejected) {
        state.counters.unauthorized.fetch_add(1, Ordering::SeqCst);
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match data_type {
        Some("com.google.step_count.delta") => Json(config.steps.clone()).into_response(),
        Some("com.google.calories.expended") => Json(config.calories.clone()).into_response(),
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn userinfo(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.counters.userinfo.fetch_add(1, Ordering::SeqCst);
    let config = state.config.lock().unwrap();
    if !bearer_ok(&headers, &config, config.reject_userinfo_token.as_deref()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(config.userinfo.clone()).into_response()
}

/// One bucket per value, each with a single `intVal` point.
#[allow(dead_code)]
pub fn aggregate_int(values: &[i64]) -> Value {
    let buckets: Vec<Value> = values
        .iter()
        .map(|v| json!({ "dataset": [{ "point": [{ "value": [{ "intVal": v }] }] }] }))
        .collect();
    json!({ "bucket": buckets })
}

/// One bucket per value, each with a single `fpVal` point.
#[allow(dead_code)]
pub fn aggregate_fp(values: &[f64]) -> Value {
    let buckets: Vec<Value> = values
        .iter()
        .map(|v| json!({ "dataset": [{ "point": [{ "value": [{ "fpVal": v }] }] }] }))
        .collect();
    json!({ "bucket": buckets })
}

/// Authorization flow that returns a canned outcome.
pub struct StubFlow {
    code: Option<String>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl StubFlow {
    pub fn granting(code: &str) -> Arc<Self> {
        Arc::new(Self {
            code: Some(code.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn cancelled() -> Arc<Self> {
        Arc::new(Self {
            code: None,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AuthorizationFlow for StubFlow {
    async fn authorize(&self) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.code
            .clone()
            .ok_or_else(|| AppError::LoginFailed("popup_closed_by_user".to_string()))
    }
}

/// Store holding a session, as if restored after a previous login.
#[allow(dead_code)]
pub fn connected_store(access_token: &str, refresh_token: Option<&str>) -> TokenStore {
    let store = TokenStore::in_memory();
    store
        .set(fitquest::db::keys::ACCESS_TOKEN, access_token)
        .unwrap();
    if let Some(refresh_token) = refresh_token {
        store
            .set(fitquest::db::keys::REFRESH_TOKEN, refresh_token)
            .unwrap();
    }
    store
}

/// Wire an app against the mock server.
#[allow(dead_code)]
pub fn test_app(server: &MockServer, store: TokenStore, flow: Arc<dyn AuthorizationFlow>) -> AppState {
    let geolocation: Arc<dyn GeolocationProvider> =
        Arc::new(FixedPosition(LatLng { lat: 37.4, lng: -122.1 }));
    AppState::new(server.config(), store, flow, geolocation)
}

/// Poll `condition` until it holds or two seconds pass.
#[allow(dead_code)]
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
