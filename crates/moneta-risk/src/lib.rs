//! Risk engine for the Moneta money market.
//!
//! Gates every balance-changing operation across all markets:
//! - permission hooks (`mint_allowed`, `borrow_allowed`, ...) checked in a fixed
//!   order: listing, per-action pause, protocol pause, then risk
//! - account liquidity over entered markets, failing closed on missing prices
//! - liquidation sizing (close factor, incentive, seize tokens)
//! - admin-only policy setters, with parameters held in a versioned
//!   copy-on-write snapshot

pub mod engine;
pub mod error;
pub mod hooks;
pub mod liquidity;
pub mod params;

pub use engine::RiskEngine;
pub use error::{RiskError, RiskResult};
pub use liquidity::AccountLiquidity;
pub use params::{
    MarketPolicy, PauseState, RiskParams, CLOSE_FACTOR_MAX, COLLATERAL_FACTOR_MAX,
    LIQUIDATION_INCENTIVE_MAX,
};
