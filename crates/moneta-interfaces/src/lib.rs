//! External collaborators of the money market.
//!
//! The ledger and risk engine only ever talk to these traits:
//! - `PriceOracle`: price per unit of underlying, fails closed
//! - `InterestRateModel`: pure `(cash, borrows, reserves) -> rate` curve
//! - `UnderlyingAsset`: token transfer layer for one market
//!
//! Reference implementations ship alongside for configuration and tests.

pub mod asset;
pub mod error;
pub mod oracle;
pub mod rate_model;

pub use asset::{MemoryAsset, UnderlyingAsset};
pub use error::{InterfaceError, InterfaceResult};
pub use oracle::{PriceOracle, SimplePriceOracle};
pub use rate_model::{
    FixedRateModel, InterestRateModel, JumpRateModel, WhitePaperRateModel, BLOCKS_PER_YEAR,
};
