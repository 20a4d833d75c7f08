use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::models::{AssetType, Holding, PriceKey};
use crate::services::quotes::{coingecko_id, QuoteError, QuoteSources};

/// Immutable copy of the cache contents at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSnapshot {
    prices: HashMap<PriceKey, f64>,
}

impl PriceSnapshot {
    pub fn get(&self, key: &PriceKey) -> Option<f64> {
        self.prices.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl FromIterator<(PriceKey, f64)> for PriceSnapshot {
    fn from_iter<I: IntoIterator<Item = (PriceKey, f64)>>(iter: I) -> Self {
        Self {
            prices: iter.into_iter().collect(),
        }
    }
}

/// Latest known price per (asset type, ticker).
///
/// Entries are only ever overwritten with a finite, positive price;
/// nothing is evicted, so a failed fetch leaves the last good value in place.
pub struct PriceCache {
    sources: QuoteSources,
    prices: RwLock<HashMap<PriceKey, f64>>,
}

impl PriceCache {
    pub fn new(sources: QuoteSources) -> Self {
        Self {
            sources,
            prices: RwLock::new(HashMap::new()),
        }
    }

    /// Fetches prices for every distinct key held and merges them in.
    ///
    /// Equity symbols that fail are skipped one by one. A failure of the
    /// batched crypto request fails the whole refresh and nothing is merged.
    pub async fn refresh(&self, holdings: &[Holding]) -> Result<(), QuoteError> {
        let mut seen: HashSet<PriceKey> = HashSet::new();
        let mut stocks: Vec<String> = vec![];
        let mut cryptos: Vec<(String, &'static str)> = vec![];

        for h in holdings {
            let key = h.price_key();
            if !seen.insert(key.clone()) {
                continue;
            }

            match key.asset_type {
                AssetType::Stock => stocks.push(key.ticker),
                AssetType::Crypto => {
                    if let Some(id) = coingecko_id(&key.ticker) {
                        cryptos.push((key.ticker, id));
                    }
                }
            }
        }

        let mut updates: Vec<(PriceKey, f64)> = vec![];

        if !stocks.is_empty() {
            for (symbol, price) in self.sources.equity_prices(&stocks).await {
                updates.push((PriceKey::new(AssetType::Stock, &symbol), price));
            }
        }

        if !cryptos.is_empty() {
            let mut ids: Vec<&str> = cryptos.iter().map(|(_, id)| *id).collect();
            ids.sort_unstable();
            ids.dedup();

            let by_id = self.sources.crypto.prices(&ids).await?;
            for (ticker, id) in &cryptos {
                if let Some(price) = by_id.get(*id) {
                    updates.push((PriceKey::new(AssetType::Crypto, ticker), *price));
                }
            }
        }

        let stored = self.merge(updates);
        tracing::debug!("price cache refreshed: {} keys requested, {} stored", seen.len(), stored);
        Ok(())
    }

    /// Writes valid prices into the cache and returns how many were stored.
    /// NaN, infinite and non-positive values are dropped.
    pub fn merge<I>(&self, updates: I) -> usize
    where
        I: IntoIterator<Item = (PriceKey, f64)>,
    {
        let valid: Vec<(PriceKey, f64)> = updates
            .into_iter()
            .filter(|(_, price)| price.is_finite() && *price > 0.0)
            .collect();

        let count = valid.len();
        let mut prices = self.prices.write().unwrap_or_else(|e| e.into_inner());
        prices.extend(valid);
        count
    }

    pub fn snapshot(&self) -> PriceSnapshot {
        let prices = self.prices.read().unwrap_or_else(|e| e.into_inner());
        PriceSnapshot {
            prices: prices.clone(),
        }
    }

    pub fn get(&self, asset_type: AssetType, ticker: &str) -> Option<f64> {
        let prices = self.prices.read().unwrap_or_else(|e| e.into_inner());
        prices.get(&PriceKey::new(asset_type, ticker)).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
