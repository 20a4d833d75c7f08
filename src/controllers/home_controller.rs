use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{error::AppError, AppState};

// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// GET /api/health/db
pub async fn health_db(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state.store.ping().await?;
    Ok(Json(json!({
        "status": "ok",
        "cachedPrices": state.prices.len(),
        "subscribers": state.hub.len(),
    })))
}
