use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::{
    controllers::parse_id,
    error::AppError,
    models::{asset::normalize_ticker, AssetType, Holding, NewHolding},
    AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHoldingRequest {
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub asset_type: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub avg_cost: f64,
}

impl CreateHoldingRequest {
    /// Rejects bad input before it reaches the store or the pipeline.
    pub fn validate(&self) -> Result<NewHolding, AppError> {
        let ticker = normalize_ticker(&self.ticker);
        let quantity_ok = self.quantity.is_finite() && self.quantity > 0.0;
        let avg_cost_ok = self.avg_cost.is_finite() && self.avg_cost >= 0.0;

        if ticker.is_empty() || !quantity_ok || !avg_cost_ok {
            return Err(AppError::BadRequest("invalid holding payload".to_string()));
        }

        let Some(asset_type) = AssetType::parse(&self.asset_type) else {
            return Err(AppError::BadRequest("assetType must be stock or crypto".to_string()));
        };

        Ok(NewHolding::new(&ticker, asset_type, self.quantity, self.avg_cost))
    }
}

// GET /api/holdings
pub async fn list_holdings(State(state): State<AppState>) -> Result<Json<Vec<Holding>>, AppError> {
    Ok(Json(state.store.list_holdings().await?))
}

// POST /api/holdings
pub async fn create_holding(
    State(state): State<AppState>,
    payload: Result<Json<CreateHoldingRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let new = req.validate()?;

    let created = state.store.create_holding(new).await?;
    tracing::info!("holding created: id={} {}", created.id, created.price_key());

    state.pipeline.trigger();
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

// DELETE /api/holdings/:id
pub async fn delete_holding(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&raw_id)?;
    state.store.delete_holding(id).await?;
    tracing::info!("holding deleted: id={}", id);

    state.pipeline.trigger();
    Ok(StatusCode::NO_CONTENT)
}
