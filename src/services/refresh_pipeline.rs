use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::{
    models::PortfolioSnapshot,
    services::{
        broadcast_hub::BroadcastHub,
        price_cache::PriceCache,
        quotes::QuoteError,
        snapshot_service,
        store::{SharedStore, StoreError},
    },
};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("price refresh: {0}")]
    Quote(#[from] QuoteError),
}

/// list holdings -> refresh prices -> build snapshot -> broadcast.
///
/// Runs are not serialized against each other: a timer run and a
/// mutation-triggered run may interleave their store reads, and the later
/// broadcast wins on the wire.
#[derive(Clone)]
pub struct RefreshPipeline {
    store: SharedStore,
    prices: Arc<PriceCache>,
    hub: Arc<BroadcastHub>,
}

impl RefreshPipeline {
    pub fn new(store: SharedStore, prices: Arc<PriceCache>, hub: Arc<BroadcastHub>) -> Self {
        Self { store, prices, hub }
    }

    /// One full run. Returns the snapshot that was broadcast.
    pub async fn refresh_and_broadcast(&self) -> Result<PortfolioSnapshot, PipelineError> {
        let holdings = self.store.list_holdings().await?;
        self.prices.refresh(&holdings).await?;

        let snapshot = self.build_snapshot().await?;
        let delivered = self.hub.broadcast(&snapshot).await;

        tracing::debug!(
            "pipeline run done: holdings={} fired={} delivered={}",
            snapshot.holdings.len(),
            snapshot.alerts_fired.len(),
            delivered
        );
        Ok(snapshot)
    }

    /// Builds a snapshot from the current cache without fetching prices.
    pub async fn build_snapshot(&self) -> Result<PortfolioSnapshot, StoreError> {
        let prices = self.prices.snapshot();
        snapshot_service::build_snapshot(self.store.as_ref(), &prices).await
    }

    /// Out-of-band run after a mutation. Callers don't need to await the
    /// handle; it is there for anyone who wants to know when the run is over.
    pub fn trigger(&self) -> JoinHandle<()> {
        let pipeline = self.clone();
        tokio::spawn(async move {
            if let Err(e) = pipeline.refresh_and_broadcast().await {
                tracing::warn!("triggered refresh failed: {}", e);
            }
        })
    }

    /// Interval scheduler. The first tick fires immediately. Errors are
    /// logged and the loop carries on; it only stops on shutdown.
    pub fn spawn_scheduler(&self, every: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let pipeline = self.clone();
        tokio::spawn(async move {
            let mut interval = time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = wait_for_shutdown(&mut shutdown) => break,
                    _ = interval.tick() => {}
                }

                if let Err(e) = pipeline.refresh_and_broadcast().await {
                    tracing::warn!("scheduled refresh failed: {}", e);
                }
            }

            tracing::info!("refresh scheduler stopped");
        })
    }
}

/// Resolves once the flag flips to true or the sender goes away.
pub async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}
