//! Core domain types for the Moneta money market.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `Exp`: 1e18-mantissa fixed-point fraction with floor semantics
//! - `MarketId`, `Account`: market and principal identifiers
//! - `AccountSnapshot`: per-market view of an account used by the risk engine
//! - `Event`: observable protocol events

pub mod error;
pub mod event;
pub mod exp;
pub mod market;
pub mod snapshot;

pub use alloy_primitives::{Address, I256, U256};
pub use error::{MathError, MathResult};
pub use event::{Action, Event, PauseTarget};
pub use exp::{Exp, EXP_SCALE};
pub use market::{Account, BlockNumber, MarketId};
pub use snapshot::{AccountSnapshot, SnapshotSource};
