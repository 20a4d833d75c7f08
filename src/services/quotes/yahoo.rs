use reqwest::{header, Client, Url};
use serde::Deserialize;

use super::{status_error, QuoteError};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

/// Keyless chart endpoint; one request per symbol.
#[derive(Clone)]
pub struct YahooChartClient {
    http: Client,
    base_url: String,
}

impl YahooChartClient {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn chart_url(&self, symbol: &str) -> Result<Url, QuoteError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| QuoteError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| QuoteError::Url(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }

    pub async fn price(&self, symbol: &str) -> Result<f64, QuoteError> {
        let res = self
            .http
            .get(self.chart_url(symbol)?)
            .query(&[("interval", "1d"), ("range", "1d")])
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(status_error("yahoo", res).await);
        }

        let payload = res.json::<ChartResponse>().await?;
        payload
            .chart
            .result
            .into_iter()
            .flatten()
            .next()
            .and_then(|r| r.meta.regular_market_price)
            .ok_or(QuoteError::Missing("yahoo"))
    }
}

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    pub result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
pub struct ChartMeta {
    #[serde(rename = "regularMarketPrice")]
    pub regular_market_price: Option<f64>,
}
