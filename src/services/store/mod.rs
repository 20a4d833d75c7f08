//! Persistence contract for holdings and alerts.
//!
//! The pipeline only ever talks to `dyn Store`; `MongoStore` backs a real
//! deployment and `MemoryStore` backs tests and `STORE_BACKEND=memory` runs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Holding, NewAlert, NewHolding, PriceAlert};

pub mod memory_store;
pub mod mongo_store;

pub use memory_store::MemoryStore;
pub use mongo_store::MongoStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The row to delete does not exist. Carries the entity name.
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("database error: {0}")]
    Database(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    /// All holdings, ascending by id.
    async fn list_holdings(&self) -> Result<Vec<Holding>, StoreError>;
    async fn create_holding(&self, new: NewHolding) -> Result<Holding, StoreError>;
    async fn delete_holding(&self, id: i64) -> Result<(), StoreError>;

    /// All alerts, ascending by id.
    async fn list_alerts(&self) -> Result<Vec<PriceAlert>, StoreError>;
    async fn create_alert(&self, new: NewAlert) -> Result<PriceAlert, StoreError>;
    async fn delete_alert(&self, id: i64) -> Result<(), StoreError>;

    /// Returns true if the alert was newly triggered, false if it was already
    /// triggered (or no longer exists).
    async fn mark_alert_triggered(&self, id: i64, at: DateTime<Utc>) -> Result<bool, StoreError>;
}

pub type SharedStore = Arc<dyn Store>;
