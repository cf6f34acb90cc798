//! Market deployment registry for Moneta.
//!
//! Holds every deployed market's ledger together with its underlying asset,
//! and serves account snapshots to the risk engine.

pub mod error;
pub mod registry;

pub use error::{RegistryError, RegistryResult};
pub use registry::{MarketRegistry, MarketSlot};
