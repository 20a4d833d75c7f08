use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{asset::normalize_ticker, AssetType, PriceKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub id: i64,
    pub ticker: String,
    pub asset_type: AssetType,
    pub quantity: f64,
    pub avg_cost: f64,
    pub created_at: DateTime<Utc>,
}

impl Holding {
    pub fn price_key(&self) -> PriceKey {
        PriceKey::new(self.asset_type, &self.ticker)
    }
}

/// Validated input for a holding the store has not assigned an id to yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHolding {
    pub ticker: String,
    pub asset_type: AssetType,
    pub quantity: f64,
    pub avg_cost: f64,
}

impl NewHolding {
    pub fn new(ticker: &str, asset_type: AssetType, quantity: f64, avg_cost: f64) -> Self {
        Self {
            ticker: normalize_ticker(ticker),
            asset_type,
            quantity,
            avg_cost,
        }
    }
}
