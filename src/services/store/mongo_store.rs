use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::StreamExt;
use mongodb::{
    bson::{doc, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::{Store, StoreError};
use crate::models::{AlertDirection, AssetType, Holding, NewAlert, NewHolding, PriceAlert};
use crate::services::db_init;

const HOLDINGS: &str = "holdings";
const ALERTS: &str = "price_alerts";
const COUNTERS: &str = "counters";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HoldingDoc {
    #[serde(rename = "_id")]
    id: i64,
    ticker: String,
    asset_type: AssetType,
    quantity: f64,
    avg_cost: f64,
    created_at: DateTime<Utc>,
}

impl From<HoldingDoc> for Holding {
    fn from(d: HoldingDoc) -> Self {
        Holding {
            id: d.id,
            ticker: d.ticker,
            asset_type: d.asset_type,
            quantity: d.quantity,
            avg_cost: d.avg_cost,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AlertDoc {
    #[serde(rename = "_id")]
    id: i64,
    ticker: String,
    asset_type: AssetType,
    direction: AlertDirection,
    threshold: f64,
    created_at: DateTime<Utc>,
    triggered: bool,
    #[serde(default)]
    triggered_at: Option<DateTime<Utc>>,
}

impl From<AlertDoc> for PriceAlert {
    fn from(d: AlertDoc) -> Self {
        PriceAlert {
            id: d.id,
            ticker: d.ticker,
            asset_type: d.asset_type,
            direction: d.direction,
            threshold: d.threshold,
            created_at: d.created_at,
            triggered: d.triggered,
            triggered_at: d.triggered_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Counter {
    seq: i64,
}

/// MongoDB-backed store. Ids are sequential integers kept in a `counters`
/// collection so they stay numeric and ascending like the rest of the API.
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let store = Self::new(client.database(db_name));
        store.ping().await?;
        db_init::ensure_indexes(&store.db).await?;
        Ok(store)
    }

    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn holdings(&self) -> Collection<HoldingDoc> {
        self.db.collection::<HoldingDoc>(HOLDINGS)
    }

    fn alerts(&self) -> Collection<AlertDoc> {
        self.db.collection::<AlertDoc>(ALERTS)
    }

    async fn next_id(&self, name: &str) -> Result<i64, StoreError> {
        let opts = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let counter = self
            .db
            .collection::<Counter>(COUNTERS)
            .find_one_and_update(doc! { "_id": name }, doc! { "$inc": { "seq": 1_i64 } }, opts)
            .await?;

        counter
            .map(|c| c.seq)
            .ok_or_else(|| StoreError::Database(format!("counter {name} missing after upsert")))
    }

    fn by_id_ascending() -> FindOptions {
        FindOptions::builder().sort(doc! { "_id": 1 }).build()
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    async fn list_holdings(&self) -> Result<Vec<Holding>, StoreError> {
        let mut cursor = self
            .holdings()
            .find(Document::new(), Self::by_id_ascending())
            .await?;

        let mut out: Vec<Holding> = vec![];
        while let Some(res) = cursor.next().await {
            out.push(res?.into());
        }
        Ok(out)
    }

    async fn create_holding(&self, new: NewHolding) -> Result<Holding, StoreError> {
        let id = self.next_id(HOLDINGS).await?;

        let doc = HoldingDoc {
            id,
            ticker: new.ticker,
            asset_type: new.asset_type,
            quantity: new.quantity,
            avg_cost: new.avg_cost,
            created_at: Utc::now(),
        };

        self.holdings().insert_one(&doc, None).await?;
        Ok(doc.into())
    }

    async fn delete_holding(&self, id: i64) -> Result<(), StoreError> {
        let res = self.holdings().delete_one(doc! { "_id": id }, None).await?;
        if res.deleted_count == 0 {
            return Err(StoreError::NotFound("holding"));
        }
        Ok(())
    }

    async fn list_alerts(&self) -> Result<Vec<PriceAlert>, StoreError> {
        let mut cursor = self
            .alerts()
            .find(Document::new(), Self::by_id_ascending())
            .await?;

        let mut out: Vec<PriceAlert> = vec![];
        while let Some(res) = cursor.next().await {
            out.push(res?.into());
        }
        Ok(out)
    }

    async fn create_alert(&self, new: NewAlert) -> Result<PriceAlert, StoreError> {
        let id = self.next_id(ALERTS).await?;

        let doc = AlertDoc {
            id,
            ticker: new.ticker,
            asset_type: new.asset_type,
            direction: new.direction,
            threshold: new.threshold,
            created_at: Utc::now(),
            triggered: false,
            triggered_at: None,
        };

        self.alerts().insert_one(&doc, None).await?;
        Ok(doc.into())
    }

    async fn delete_alert(&self, id: i64) -> Result<(), StoreError> {
        let res = self.alerts().delete_one(doc! { "_id": id }, None).await?;
        if res.deleted_count == 0 {
            return Err(StoreError::NotFound("alert"));
        }
        Ok(())
    }

    async fn mark_alert_triggered(&self, id: i64, at: DateTime<Utc>) -> Result<bool, StoreError> {
        // same string form serde writes for DateTime<Utc>, so reads round-trip
        let at = at.to_rfc3339_opts(SecondsFormat::AutoSi, true);

        let res = self
            .alerts()
            .update_one(
                doc! { "_id": id, "triggered": false },
                doc! { "$set": { "triggered": true, "triggered_at": at } },
                None,
            )
            .await?;

        Ok(res.modified_count > 0)
    }
}
