pub mod asset;
pub mod holding;
pub mod alert;
pub mod snapshot;

pub use asset::{AlertDirection, AssetType, PriceKey};
pub use holding::{Holding, NewHolding};
pub use alert::{NewAlert, PriceAlert};
pub use snapshot::{HoldingWithPrice, PortfolioSnapshot};
