//! Shared fixtures: a local stand-in for the upstream quote APIs, fake hub
//! subscribers and a store wrapper that can be told to fail.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::mpsc;

use portfoliopulse::{
    config::{EquitySource, Settings},
    models::{Holding, NewAlert, NewHolding, PriceAlert},
    services::{
        broadcast_hub::{SendError, Subscriber},
        quotes::QuoteSources,
        store::{MemoryStore, SharedStore, Store, StoreError},
    },
    AppState,
};

// ---------------- upstream stand-in ----------------

#[derive(Default)]
pub struct UpstreamState {
    /// symbol -> price served by the chart endpoint
    pub equities: HashMap<String, f64>,
    /// symbols the chart endpoint answers with a 500
    pub failing_equities: HashSet<String>,
    /// coingecko id -> usd price
    pub crypto: HashMap<String, f64>,
    pub crypto_down: bool,
    /// body served while `crypto_down`; defaults to a short message
    pub crypto_error_body: Option<String>,

    pub chart_requests: Vec<String>,
    pub crypto_requests: Vec<String>,
    /// (symbol, token) pairs seen by the finnhub quote endpoint
    pub finnhub_requests: Vec<(String, String)>,
}

#[derive(Clone)]
pub struct Upstream {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<UpstreamState>>,
}

impl Upstream {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(UpstreamState::default()));

        let app = Router::new()
            .route("/v8/finance/chart/:symbol", get(chart))
            .route("/api/v3/simple/price", get(simple_price))
            .route("/api/v1/quote", get(finnhub_quote))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_equity(&self, symbol: &str, price: f64) {
        self.state.lock().unwrap().equities.insert(symbol.to_string(), price);
    }

    pub fn fail_equity(&self, symbol: &str, fail: bool) {
        let mut s = self.state.lock().unwrap();
        if fail {
            s.failing_equities.insert(symbol.to_string());
        } else {
            s.failing_equities.remove(symbol);
        }
    }

    pub fn set_crypto(&self, id: &str, price: f64) {
        self.state.lock().unwrap().crypto.insert(id.to_string(), price);
    }

    pub fn set_crypto_down(&self, down: bool) {
        self.state.lock().unwrap().crypto_down = down;
    }

    pub fn set_crypto_error_body(&self, body: String) {
        self.state.lock().unwrap().crypto_error_body = Some(body);
    }

    pub fn chart_requests(&self) -> Vec<String> {
        self.state.lock().unwrap().chart_requests.clone()
    }

    pub fn crypto_requests(&self) -> Vec<String> {
        self.state.lock().unwrap().crypto_requests.clone()
    }

    pub fn finnhub_requests(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().finnhub_requests.clone()
    }

    pub fn settings(&self) -> Settings {
        let mut settings = Settings::for_tests();
        settings.yahoo_base_url = self.base_url();
        settings.finnhub_base_url = self.base_url();
        settings.coingecko_base_url = self.base_url();
        settings
    }

    /// Same upstream, with equities priced through the keyed quote endpoint.
    pub fn finnhub_settings(&self, api_key: &str) -> Settings {
        let mut settings = self.settings();
        settings.equity_source = EquitySource::Finnhub;
        settings.finnhub_api_key = api_key.to_string();
        settings
    }
}

async fn chart(State(state): State<Arc<Mutex<UpstreamState>>>, Path(symbol): Path<String>) -> Response {
    let mut s = state.lock().unwrap();
    s.chart_requests.push(symbol.clone());

    if s.failing_equities.contains(&symbol) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }

    match s.equities.get(&symbol) {
        Some(price) => Json(json!({
            "chart": { "result": [ { "meta": { "symbol": symbol, "regularMarketPrice": price } } ] }
        }))
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "chart": { "result": null, "error": { "code": "Not Found" } } })),
        )
            .into_response(),
    }
}

async fn finnhub_quote(
    State(state): State<Arc<Mutex<UpstreamState>>>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let mut s = state.lock().unwrap();
    let symbol = q.get("symbol").cloned().unwrap_or_default();
    let token = q.get("token").cloned().unwrap_or_default();
    s.finnhub_requests.push((symbol.clone(), token));

    if s.failing_equities.contains(&symbol) {
        return (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response();
    }

    // unknown symbols come back as 200 with zeros
    let price = s.equities.get(&symbol).copied().unwrap_or(0.0);
    Json(json!({ "c": price, "d": null, "dp": null, "pc": price, "t": 0 })).into_response()
}

async fn simple_price(
    State(state): State<Arc<Mutex<UpstreamState>>>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let mut s = state.lock().unwrap();
    let ids = q.get("ids").cloned().unwrap_or_default();
    s.crypto_requests.push(ids.clone());

    if s.crypto_down {
        let body = s
            .crypto_error_body
            .clone()
            .unwrap_or_else(|| "rate limited".to_string());
        return (StatusCode::SERVICE_UNAVAILABLE, body).into_response();
    }

    let mut out = serde_json::Map::new();
    for id in ids.split(',') {
        if let Some(price) = s.crypto.get(id) {
            out.insert(id.to_string(), json!({ "usd": price }));
        }
    }
    Json(serde_json::Value::Object(out)).into_response()
}

// ---------------- app state ----------------

pub fn state_with(settings: Settings, store: SharedStore) -> AppState {
    let sources = QuoteSources::from_settings(&settings).unwrap();
    AppState::new(settings, store, sources)
}

/// App state on an in-memory store whose upstreams point nowhere.
pub fn test_state() -> AppState {
    state_with(Settings::for_tests(), Arc::new(MemoryStore::new()))
}

// ---------------- subscribers ----------------

/// Collects every pushed frame on a channel.
pub struct RecordingSubscriber {
    tx: mpsc::UnboundedSender<String>,
    pub closed: Mutex<bool>,
}

impl RecordingSubscriber {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                tx,
                closed: Mutex::new(false),
            }),
            rx,
        )
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

#[async_trait]
impl Subscriber for RecordingSubscriber {
    async fn send_text(&self, text: String) -> Result<(), SendError> {
        self.tx.send(text).map_err(|e| SendError(e.to_string()))
    }

    async fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }
}

/// Every push fails, like a socket whose peer has gone away.
#[derive(Default)]
pub struct BrokenSubscriber {
    pub attempts: Mutex<usize>,
    pub closed: Mutex<bool>,
}

#[async_trait]
impl Subscriber for BrokenSubscriber {
    async fn send_text(&self, _text: String) -> Result<(), SendError> {
        *self.attempts.lock().unwrap() += 1;
        Err(SendError("broken pipe".to_string()))
    }

    async fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }
}

// ---------------- store wrapper ----------------

/// Delegates to a `MemoryStore` but can fail chosen operations.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_list_holdings: Mutex<bool>,
    pub fail_list_alerts: Mutex<bool>,
    pub fail_mark_ids: Mutex<HashSet<i64>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }

    async fn list_holdings(&self) -> Result<Vec<Holding>, StoreError> {
        if *self.fail_list_holdings.lock().unwrap() {
            return Err(StoreError::Database("holdings unavailable".to_string()));
        }
        self.inner.list_holdings().await
    }

    async fn create_holding(&self, new: NewHolding) -> Result<Holding, StoreError> {
        self.inner.create_holding(new).await
    }

    async fn delete_holding(&self, id: i64) -> Result<(), StoreError> {
        self.inner.delete_holding(id).await
    }

    async fn list_alerts(&self) -> Result<Vec<PriceAlert>, StoreError> {
        if *self.fail_list_alerts.lock().unwrap() {
            return Err(StoreError::Database("alerts unavailable".to_string()));
        }
        self.inner.list_alerts().await
    }

    async fn create_alert(&self, new: NewAlert) -> Result<PriceAlert, StoreError> {
        self.inner.create_alert(new).await
    }

    async fn delete_alert(&self, id: i64) -> Result<(), StoreError> {
        self.inner.delete_alert(id).await
    }

    async fn mark_alert_triggered(&self, id: i64, at: DateTime<Utc>) -> Result<bool, StoreError> {
        if self.fail_mark_ids.lock().unwrap().contains(&id) {
            return Err(StoreError::Database("write conflict".to_string()));
        }
        self.inner.mark_alert_triggered(id, at).await
    }
}
