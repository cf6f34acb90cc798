//! Moneta money market.
//!
//! Ties the per-market ledgers and the risk engine together:
//! - `Protocol`: executes every user and admin action as one atomic
//!   transaction (accrue, permission hook, mutate, record events)
//! - `ProtocolHandle`: thread-safe single-writer access
//! - `ProtocolConfig`: TOML deployment description and scripted scenario

pub mod admin;
pub mod config;
pub mod error;
pub mod handle;
pub mod protocol;
pub mod scenario;

pub use config::{MarketConfig, ProtocolConfig, RateModelConfig, RiskConfig};
pub use error::{ConfigError, ConfigResult, ProtocolError, ProtocolResult};
pub use handle::ProtocolHandle;
pub use protocol::Protocol;
pub use scenario::{Deployment, ScenarioStep, StepOutcome};
