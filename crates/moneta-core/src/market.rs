//! Market and principal identifiers.
//!
//! A market is identified by the address of its interest-bearing token, the
//! same way accounts are identified by their address. Blocks are plain `u64`
//! heights supplied by the coordinator's clock.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Principal (user, liquidator or admin).
pub type Account = Address;

/// Block height.
pub type BlockNumber = u64;

/// Market identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(pub Address);

impl MarketId {
    pub const fn new(address: Address) -> Self {
        Self(address)
    }

    /// Short deterministic id, handy for fixtures (`0x00..00NN`).
    pub fn from_byte(b: u8) -> Self {
        Self(Address::with_last_byte(b))
    }

    pub fn address(&self) -> Address {
        self.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MarketId {
    type Err = <Address as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_str(s).map(Self)
    }
}

impl From<Address> for MarketId {
    fn from(address: Address) -> Self {
        Self(address)
    }
}
