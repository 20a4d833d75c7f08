use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Holding, PriceAlert};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingWithPrice {
    #[serde(flatten)]
    pub holding: Holding,

    pub price: f64,
    pub market_value: f64,
    pub cost_basis: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
}

/// Valuation report pushed to live subscribers. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub holdings: Vec<HoldingWithPrice>,
    pub total_value: f64,
    pub total_cost: f64,
    pub total_pnl: f64,
    pub updated_at: DateTime<Utc>,

    // only the alerts that fired during the build that produced this snapshot
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alerts_fired: Vec<PriceAlert>,
}
