//! Upstream quote sources.
//!
//! Equities are priced one symbol per request (best-effort per symbol);
//! crypto is priced with one batched request (all-or-nothing).

use std::collections::HashMap;

use reqwest::Client;

use crate::config::{EquitySource, Settings};

pub mod coingecko;
pub mod finnhub;
pub mod yahoo;

pub use coingecko::{coingecko_id, CoinGeckoClient};
pub use finnhub::FinnhubClient;
pub use yahoo::YahooChartClient;

#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{source_name} returned {status}: {body}")]
    Status {
        source_name: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("bad upstream url: {0}")]
    Url(String),
    #[error("no price in {0} response")]
    Missing(&'static str),
}

const ERROR_BODY_LIMIT: usize = 512;

/// Reads a failed response into a `QuoteError::Status`. At most 512 bytes of
/// the body are read off the wire.
pub(crate) async fn status_error(source_name: &'static str, mut res: reqwest::Response) -> QuoteError {
    let status = res.status();

    let mut buf: Vec<u8> = Vec::with_capacity(ERROR_BODY_LIMIT);
    while buf.len() < ERROR_BODY_LIMIT {
        match res.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(ERROR_BODY_LIMIT - buf.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("{} error body unreadable: {}", source_name, e);
                break;
            }
        }
    }

    QuoteError::Status {
        source_name,
        status,
        body: String::from_utf8_lossy(&buf).trim().to_string(),
    }
}

#[derive(Clone)]
pub enum EquityQuotes {
    Yahoo(YahooChartClient),
    Finnhub(FinnhubClient),
}

impl EquityQuotes {
    pub async fn price(&self, symbol: &str) -> Result<f64, QuoteError> {
        match self {
            EquityQuotes::Yahoo(c) => c.price(symbol).await,
            EquityQuotes::Finnhub(c) => c.price(symbol).await,
        }
    }
}

/// The two upstream sources the price cache refreshes from.
#[derive(Clone)]
pub struct QuoteSources {
    pub equities: EquityQuotes,
    pub crypto: CoinGeckoClient,
}

impl QuoteSources {
    pub fn from_settings(settings: &Settings) -> Result<Self, QuoteError> {
        let http = Client::builder().timeout(settings.http_timeout).build()?;

        let equities = match settings.equity_source {
            EquitySource::Yahoo => {
                EquityQuotes::Yahoo(YahooChartClient::new(http.clone(), &settings.yahoo_base_url))
            }
            EquitySource::Finnhub => EquityQuotes::Finnhub(FinnhubClient::new(
                http.clone(),
                &settings.finnhub_base_url,
                settings.finnhub_api_key.clone(),
            )),
        };

        Ok(Self {
            equities,
            crypto: CoinGeckoClient::new(http, &settings.coingecko_base_url),
        })
    }

    /// Prices every symbol independently; failures are dropped per symbol.
    pub async fn equity_prices(&self, symbols: &[String]) -> HashMap<String, f64> {
        let mut out = HashMap::new();
        for symbol in symbols {
            match self.equities.price(symbol).await {
                Ok(price) => {
                    out.insert(symbol.clone(), price);
                }
                Err(e) => tracing::debug!("equity quote skipped: symbol={} err={}", symbol, e),
            }
        }
        out
    }
}
