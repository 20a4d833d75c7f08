use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Store, StoreError};
use crate::models::{Holding, NewAlert, NewHolding, PriceAlert};

#[derive(Default)]
struct Tables {
    holdings: Vec<Holding>,
    alerts: Vec<PriceAlert>,
    next_holding_id: i64,
    next_alert_id: i64,
}

/// Process-local store. Rows live in insertion (= id) order.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Database("memory store poisoned".to_string()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    async fn list_holdings(&self) -> Result<Vec<Holding>, StoreError> {
        Ok(self.lock()?.holdings.clone())
    }

    async fn create_holding(&self, new: NewHolding) -> Result<Holding, StoreError> {
        let mut t = self.lock()?;
        t.next_holding_id += 1;

        let holding = Holding {
            id: t.next_holding_id,
            ticker: new.ticker,
            asset_type: new.asset_type,
            quantity: new.quantity,
            avg_cost: new.avg_cost,
            created_at: Utc::now(),
        };
        t.holdings.push(holding.clone());
        Ok(holding)
    }

    async fn delete_holding(&self, id: i64) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        let before = t.holdings.len();
        t.holdings.retain(|h| h.id != id);
        if t.holdings.len() == before {
            return Err(StoreError::NotFound("holding"));
        }
        Ok(())
    }

    async fn list_alerts(&self) -> Result<Vec<PriceAlert>, StoreError> {
        Ok(self.lock()?.alerts.clone())
    }

    async fn create_alert(&self, new: NewAlert) -> Result<PriceAlert, StoreError> {
        let mut t = self.lock()?;
        t.next_alert_id += 1;

        let alert = PriceAlert {
            id: t.next_alert_id,
            ticker: new.ticker,
            asset_type: new.asset_type,
            direction: new.direction,
            threshold: new.threshold,
            created_at: Utc::now(),
            triggered: false,
            triggered_at: None,
        };
        t.alerts.push(alert.clone());
        Ok(alert)
    }

    async fn delete_alert(&self, id: i64) -> Result<(), StoreError> {
        let mut t = self.lock()?;
        let before = t.alerts.len();
        t.alerts.retain(|a| a.id != id);
        if t.alerts.len() == before {
            return Err(StoreError::NotFound("alert"));
        }
        Ok(())
    }

    async fn mark_alert_triggered(&self, id: i64, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut t = self.lock()?;
        match t.alerts.iter_mut().find(|a| a.id == id && !a.triggered) {
            Some(alert) => {
                alert.mark_triggered(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
