use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stock,
    Crypto,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Stock => "stock",
            AssetType::Crypto => "crypto",
        }
    }

    /// Parses user input ("stock" | "crypto", case-insensitive).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "stock" => Some(AssetType::Stock),
            "crypto" => Some(AssetType::Crypto),
            _ => None,
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertDirection {
    Above,
    Below,
}

impl AlertDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertDirection::Above => "above",
            AlertDirection::Below => "below",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "above" => Some(AlertDirection::Above),
            "below" => Some(AlertDirection::Below),
            _ => None,
        }
    }

    /// Equality fires in both directions.
    pub fn is_hit(&self, price: f64, threshold: f64) -> bool {
        match self {
            AlertDirection::Above => price >= threshold,
            AlertDirection::Below => price <= threshold,
        }
    }
}

pub fn normalize_ticker(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Cache key for a price: asset type plus normalized ticker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PriceKey {
    pub asset_type: AssetType,
    pub ticker: String,
}

impl PriceKey {
    pub fn new(asset_type: AssetType, ticker: &str) -> Self {
        Self {
            asset_type,
            ticker: normalize_ticker(ticker),
        }
    }
}

impl fmt::Display for PriceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.asset_type, self.ticker)
    }
}
