use axum::{extract::State, Json};

use crate::{error::AppError, models::PortfolioSnapshot, AppState};

// GET /api/portfolio
//
// Built from the current cache; no upstream fetch. Like any build, this can
// fire alerts.
pub async fn get_portfolio(State(state): State<AppState>) -> Result<Json<PortfolioSnapshot>, AppError> {
    Ok(Json(state.pipeline.build_snapshot().await?))
}
