use reqwest::Client;
use serde::Deserialize;

use super::{status_error, QuoteError};

/// Keyed equity source. Only built when an API key is configured.
#[derive(Clone)]
pub struct FinnhubClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl FinnhubClient {
    pub fn new(http: Client, base_url: &str, api_key: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Last traded price for `symbol`. Finnhub answers unknown symbols with
    /// 200 and an all-zero body, which is reported as `Missing`.
    pub async fn price(&self, symbol: &str) -> Result<f64, QuoteError> {
        let quote = self.quote(symbol).await?;
        if quote.current > 0.0 {
            Ok(quote.current)
        } else {
            Err(QuoteError::Missing("finnhub"))
        }
    }

    async fn quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        let res = self
            .http
            .get(format!("{}/api/v1/quote", self.base_url))
            .query(&[("symbol", symbol), ("token", self.api_key.as_str())])
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(status_error("finnhub", res).await);
        }

        Ok(res.json::<Quote>().await?)
    }
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(rename = "c", default)]
    current: f64,
}
