use mongodb::{bson::doc, Database, IndexModel};

use crate::services::store::StoreError;

/// Creates the secondary indexes. Safe to run on every start; existing
/// indexes with the same keys are left alone.
pub async fn ensure_indexes(db: &Database) -> Result<(), StoreError> {
    // holdings: (asset_type, ticker) is the price key
    {
        let col = db.collection::<mongodb::bson::Document>("holdings");
        let model = IndexModel::builder()
            .keys(doc! { "asset_type": 1, "ticker": 1 })
            .build();

        col.create_index(model, None).await?;
    }

    // alerts: untriggered per ticker
    {
        let col = db.collection::<mongodb::bson::Document>("price_alerts");
        let model = IndexModel::builder()
            .keys(doc! { "triggered": 1, "ticker": 1 })
            .build();

        col.create_index(model, None).await?;
    }

    tracing::debug!("mongo indexes ensured");
    Ok(())
}
