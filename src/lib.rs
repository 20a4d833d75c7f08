//! Library entrypoint for PortfolioPulse.
//!
//! `main.rs` wires these pieces together; integration tests under `tests/`
//! import the same app state, routers and services.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;

pub mod services;

pub mod controllers;
pub mod routes;

use services::{
    broadcast_hub::BroadcastHub,
    price_cache::PriceCache,
    quotes::QuoteSources,
    refresh_pipeline::RefreshPipeline,
    store::SharedStore,
};

/// Everything a handler needs. Built once at startup and cloned per request;
/// the cache and hub are shared through `Arc`s, never through globals.
#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub store: SharedStore,
    pub prices: Arc<PriceCache>,
    pub hub: Arc<BroadcastHub>,
    pub pipeline: RefreshPipeline,
}

impl AppState {
    pub fn new(settings: config::Settings, store: SharedStore, sources: QuoteSources) -> Self {
        let prices = Arc::new(PriceCache::new(sources));
        let hub = Arc::new(BroadcastHub::new());
        let pipeline = RefreshPipeline::new(Arc::clone(&store), Arc::clone(&prices), Arc::clone(&hub));

        Self {
            settings,
            store,
            prices,
            hub,
            pipeline,
        }
    }
}
