use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{asset::normalize_ticker, AlertDirection, AssetType, PriceKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAlert {
    pub id: i64,
    pub ticker: String,
    pub asset_type: AssetType,
    pub direction: AlertDirection,
    pub threshold: f64,
    pub created_at: DateTime<Utc>,

    // one-way: once set, never cleared
    pub triggered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_at: Option<DateTime<Utc>>,
}

impl PriceAlert {
    pub fn price_key(&self) -> PriceKey {
        PriceKey::new(self.asset_type, &self.ticker)
    }

    /// Flips the alert into its terminal state.
    pub fn mark_triggered(&mut self, at: DateTime<Utc>) {
        self.triggered = true;
        self.triggered_at = Some(at);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub ticker: String,
    pub asset_type: AssetType,
    pub direction: AlertDirection,
    pub threshold: f64,
}

impl NewAlert {
    pub fn new(ticker: &str, asset_type: AssetType, direction: AlertDirection, threshold: f64) -> Self {
        Self {
            ticker: normalize_ticker(ticker),
            asset_type,
            direction,
            threshold,
        }
    }
}
