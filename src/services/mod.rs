pub mod db_init;
pub mod store;
pub mod quotes;

pub mod price_cache;
pub mod snapshot_service;
pub mod broadcast_hub;
pub mod refresh_pipeline;
