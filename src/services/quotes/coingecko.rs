use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;

use super::{status_error, QuoteError};

/// Maps a normalized crypto ticker to its CoinGecko id. Tickers without an
/// entry are never queried.
pub fn coingecko_id(ticker: &str) -> Option<&'static str> {
    let id = match ticker {
        "BTC" | "BITCOIN" => "bitcoin",
        "ETH" | "ETHEREUM" => "ethereum",
        "SOL" | "SOLANA" => "solana",
        "DOGE" => "dogecoin",
        "ADA" => "cardano",
        "XRP" => "ripple",
        "DOT" => "polkadot",
        "AVAX" => "avalanche-2",
        "MATIC" => "matic-network",
        "LINK" => "chainlink",
        _ => return None,
    };
    Some(id)
}

#[derive(Clone)]
pub struct CoinGeckoClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct UsdPrice {
    usd: Option<f64>,
}

impl CoinGeckoClient {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// One batched request for all ids. Returns id -> USD price for the ids
    /// the upstream knew about.
    pub async fn prices(&self, ids: &[&str]) -> Result<HashMap<String, f64>, QuoteError> {
        let url = format!("{}/api/v3/simple/price", self.base_url);
        let joined = ids.join(",");

        let res = self
            .http
            .get(url)
            .query(&[("ids", joined.as_str()), ("vs_currencies", "usd")])
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(status_error("coingecko", res).await);
        }

        let payload = res.json::<HashMap<String, UsdPrice>>().await?;
        Ok(payload
            .into_iter()
            .filter_map(|(id, p)| p.usd.map(|usd| (id, usd)))
            .collect())
    }
}
