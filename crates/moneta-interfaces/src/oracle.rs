//! Price feed seam.
//!
//! Prices are quoted per smallest unit of the market's underlying, as an `Exp`.
//! A zero price is treated as unavailable so callers fail closed.

use crate::error::{InterfaceError, InterfaceResult};
use dashmap::DashMap;
use moneta_core::{Exp, MarketId};
use tracing::debug;

/// Price source consumed by the risk engine.
pub trait PriceOracle: Send + Sync {
    /// Human-readable identity, reported in `NewPriceOracle` events.
    fn name(&self) -> &str;

    /// Price of one unit of the market's underlying.
    fn price(&self, market: &MarketId) -> InterfaceResult<Exp>;
}

/// Admin-set prices held in memory.
#[derive(Debug)]
pub struct SimplePriceOracle {
    name: String,
    prices: DashMap<MarketId, Exp>,
}

impl SimplePriceOracle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prices: DashMap::new(),
        }
    }

    /// Set (or clear, with zero) the price for a market.
    pub fn set_price(&self, market: MarketId, price: Exp) {
        debug!(%market, %price, "Oracle price set");
        self.prices.insert(market, price);
    }

    pub fn remove_price(&self, market: &MarketId) {
        self.prices.remove(market);
    }
}

impl Default for SimplePriceOracle {
    fn default() -> Self {
        Self::new("simple")
    }
}

impl PriceOracle for SimplePriceOracle {
    fn name(&self) -> &str {
        &self.name
    }

    fn price(&self, market: &MarketId) -> InterfaceResult<Exp> {
        match self.prices.get(market).map(|p| *p) {
            Some(price) if !price.is_zero() => Ok(price),
            _ => Err(InterfaceError::PriceUnavailable(*market)),
        }
    }
}
