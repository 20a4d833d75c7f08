mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tower::ServiceExt;

use portfoliopulse::{
    routes,
    services::store::{MemoryStore, Store},
};

use common::{state_with, test_state, RecordingSubscriber, Upstream};

async fn response_body_string(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn create_holding_returns_201_with_normalized_ticker() {
    let app = routes::app(test_state());

    let res = app
        .oneshot(post_json(
            "/api/holdings",
            r#"{"ticker":"  aapl ","assetType":"stock","quantity":2,"avgCost":100}"#,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let body: Value = serde_json::from_str(&response_body_string(res).await).unwrap();
    assert_eq!(body["ticker"], "AAPL");
    assert_eq!(body["assetType"], "stock");
    assert_eq!(body["quantity"], 2.0);
    assert_eq!(body["avgCost"], 100.0);
    assert!(body["id"].as_i64().unwrap() > 0);
    assert!(body["createdAt"].is_string());
}

#[tokio::test]
async fn create_holding_rejects_bad_numbers() {
    let state = test_state();

    for body in [
        r#"{"ticker":"AAPL","assetType":"stock","quantity":0,"avgCost":1}"#,
        r#"{"ticker":"AAPL","assetType":"stock","quantity":-1,"avgCost":1}"#,
        r#"{"ticker":"AAPL","assetType":"stock","quantity":1,"avgCost":-0.01}"#,
        r#"{"ticker":"   ","assetType":"stock","quantity":1,"avgCost":1}"#,
        r#"{"assetType":"stock","quantity":1,"avgCost":1}"#,
    ] {
        let res = routes::app(state.clone())
            .oneshot(post_json("/api/holdings", body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body: {body}");

        let text = response_body_string(res).await;
        assert!(text.contains("invalid holding payload"), "got: {text}");
    }

    assert!(state.store.list_holdings().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_holding_rejects_unknown_asset_type() {
    let res = routes::app(test_state())
        .oneshot(post_json(
            "/api/holdings",
            r#"{"ticker":"AAPL","assetType":"bond","quantity":1,"avgCost":1}"#,
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let text = response_body_string(res).await;
    assert!(text.contains("assetType must be stock or crypto"));
}

#[tokio::test]
async fn create_holding_rejects_malformed_json() {
    let res = routes::app(test_state())
        .oneshot(post_json("/api/holdings", r#"{"ticker": "AAPL", "#))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&response_body_string(res).await).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn list_holdings_is_in_creation_order() {
    let state = test_state();

    for ticker in ["MSFT", "BTC", "AAPL"] {
        let kind = if ticker == "BTC" { "crypto" } else { "stock" };
        let body = format!(r#"{{"ticker":"{ticker}","assetType":"{kind}","quantity":1,"avgCost":1}}"#);
        let res = routes::app(state.clone())
            .oneshot(post_json("/api/holdings", &body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = routes::app(state).oneshot(get("/api/holdings")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&response_body_string(res).await).unwrap();
    let tickers: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["ticker"].as_str().unwrap())
        .collect();
    assert_eq!(tickers, vec!["MSFT", "BTC", "AAPL"]);
}

#[tokio::test]
async fn delete_holding_returns_204_then_404() {
    let state = test_state();

    let res = routes::app(state.clone())
        .oneshot(post_json(
            "/api/holdings",
            r#"{"ticker":"AAPL","assetType":"stock","quantity":1,"avgCost":1}"#,
        ))
        .await
        .unwrap();
    let created: Value = serde_json::from_str(&response_body_string(res).await).unwrap();
    let id = created["id"].as_i64().unwrap();

    let res = routes::app(state.clone())
        .oneshot(delete(&format!("/api/holdings/{id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(state.store.list_holdings().await.unwrap().is_empty());

    let res = routes::app(state)
        .oneshot(delete(&format!("/api/holdings/{id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let text = response_body_string(res).await;
    assert!(text.contains("holding not found"));
}

#[tokio::test]
async fn delete_holding_with_bad_id_returns_400() {
    for uri in ["/api/holdings/abc", "/api/holdings/0", "/api/holdings/-3"] {
        let res = routes::app(test_state()).oneshot(delete(uri)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "uri: {uri}");
        assert!(response_body_string(res).await.contains("invalid id"));
    }
}

#[tokio::test]
async fn portfolio_endpoint_values_cached_prices() {
    let state = test_state();
    let res = routes::app(state.clone())
        .oneshot(post_json(
            "/api/holdings",
            r#"{"ticker":"AAPL","assetType":"stock","quantity":2,"avgCost":100}"#,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    state.prices.merge([(
        portfoliopulse::models::PriceKey::new(portfoliopulse::models::AssetType::Stock, "AAPL"),
        200.0,
    )]);

    let res = routes::app(state).oneshot(get("/api/portfolio")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&response_body_string(res).await).unwrap();
    assert_eq!(body["totalValue"], 400.0);
    assert_eq!(body["totalCost"], 200.0);
    assert_eq!(body["totalPnl"], 200.0);
    assert_eq!(body["holdings"][0]["price"], 200.0);
}

// Waits for the first pushed frame that satisfies `pred`.
async fn frame_where<F>(rx: &mut mpsc::UnboundedReceiver<String>, pred: F) -> Value
where
    F: Fn(&Value) -> bool,
{
    timeout(Duration::from_secs(5), async {
        loop {
            let text = rx.recv().await.expect("subscriber channel closed");
            let frame: Value = serde_json::from_str(&text).unwrap();
            if pred(&frame) {
                return frame;
            }
        }
    })
    .await
    .expect("no matching frame within 5s")
}

#[tokio::test]
async fn create_and_delete_push_fresh_snapshots() {
    let upstream = Upstream::start().await;
    upstream.set_equity("AAPL", 200.0);

    let state = state_with(upstream.settings(), Arc::new(MemoryStore::new()));
    let (sub, mut rx) = RecordingSubscriber::new();
    state.hub.join(sub);

    let res = routes::app(state.clone())
        .oneshot(post_json(
            "/api/holdings",
            r#"{"ticker":"aapl","assetType":"stock","quantity":2,"avgCost":100}"#,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = serde_json::from_str(&response_body_string(res).await).unwrap();
    let id = created["id"].as_i64().unwrap();

    // the run started by the create fetched a price for the new holding
    let frame = frame_where(&mut rx, |f| f["holdings"].as_array().is_some_and(|h| h.len() == 1)).await;
    assert_eq!(frame["holdings"][0]["ticker"], "AAPL");
    assert_eq!(frame["holdings"][0]["price"], 200.0);
    assert_eq!(frame["totalValue"], 400.0);
    assert_eq!(upstream.chart_requests(), vec!["AAPL".to_string()]);

    let res = routes::app(state.clone())
        .oneshot(delete(&format!("/api/holdings/{id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let frame = frame_where(&mut rx, |f| f["holdings"].as_array().is_some_and(|h| h.is_empty())).await;
    assert_eq!(frame["totalValue"], 0.0);
}

#[tokio::test]
async fn rejected_create_does_not_push() {
    let upstream = Upstream::start().await;
    let state = state_with(upstream.settings(), Arc::new(MemoryStore::new()));
    let (sub, mut rx) = RecordingSubscriber::new();
    state.hub.join(sub);

    let res = routes::app(state)
        .oneshot(post_json(
            "/api/holdings",
            r#"{"ticker":"AAPL","assetType":"bond","quantity":1,"avgCost":1}"#,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err());
}
