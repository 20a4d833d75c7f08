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
    models::{asset::normalize_ticker, AlertDirection, AssetType, NewAlert, PriceAlert},
    AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertRequest {
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub asset_type: String,
    #[serde(default)]
    pub direction: String,
    #[serde(default)]
    pub threshold: f64,
}

impl CreateAlertRequest {
    pub fn validate(&self) -> Result<NewAlert, AppError> {
        let ticker = normalize_ticker(&self.ticker);
        if ticker.is_empty() || !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(AppError::BadRequest("invalid alert payload".to_string()));
        }

        let Some(asset_type) = AssetType::parse(&self.asset_type) else {
            return Err(AppError::BadRequest("assetType must be stock or crypto".to_string()));
        };
        let Some(direction) = AlertDirection::parse(&self.direction) else {
            return Err(AppError::BadRequest("direction must be above or below".to_string()));
        };

        Ok(NewAlert::new(&ticker, asset_type, direction, self.threshold))
    }
}

// GET /api/alerts
pub async fn list_alerts(State(state): State<AppState>) -> Result<Json<Vec<PriceAlert>>, AppError> {
    Ok(Json(state.store.list_alerts().await?))
}

// POST /api/alerts
pub async fn create_alert(
    State(state): State<AppState>,
    payload: Result<Json<CreateAlertRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let new = req.validate()?;

    let created = state.store.create_alert(new).await?;
    tracing::info!(
        "alert created: id={} {} {} {}",
        created.id,
        created.price_key(),
        created.direction.as_str(),
        created.threshold
    );

    state.pipeline.trigger();
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

// DELETE /api/alerts/:id
pub async fn delete_alert(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&raw_id)?;
    state.store.delete_alert(id).await?;
    tracing::info!("alert deleted: id={}", id);

    state.pipeline.trigger();
    Ok(StatusCode::NO_CONTENT)
}
