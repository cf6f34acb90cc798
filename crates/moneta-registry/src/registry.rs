//! Deployed markets.
//!
//! Deployment and listing are separate steps: a market must be deployed here
//! before the risk engine can list it, and it stays deployed forever.

use crate::error::{RegistryError, RegistryResult};
use alloy_primitives::U256;
use moneta_core::{Account, AccountSnapshot, Exp, MarketId, MathResult, SnapshotSource};
use moneta_interfaces::UnderlyingAsset;
use moneta_ledger::Ledger;
use std::collections::BTreeMap;
use tracing::info;

/// One deployed market.
pub struct MarketSlot {
    pub ledger: Ledger,
    pub asset: Box<dyn UnderlyingAsset>,
}

/// Set of deployed markets, ordered by id.
#[derive(Default)]
pub struct MarketRegistry {
    markets: BTreeMap<MarketId, MarketSlot>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a market. Its id is the ledger's market id.
    pub fn deploy(&mut self, ledger: Ledger, asset: Box<dyn UnderlyingAsset>) -> RegistryResult<()> {
        let market = ledger.market();
        if self.markets.contains_key(&market) {
            return Err(RegistryError::AlreadyDeployed(market));
        }
        info!(
            %market,
            symbol = ledger.symbol(),
            underlying = asset.symbol(),
            "Market deployed"
        );
        self.markets.insert(market, MarketSlot { ledger, asset });
        Ok(())
    }

    pub fn contains(&self, market: &MarketId) -> bool {
        self.markets.contains_key(market)
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = MarketId> + '_ {
        self.markets.keys().copied()
    }

    pub fn ledger(&self, market: &MarketId) -> RegistryResult<&Ledger> {
        self.markets
            .get(market)
            .map(|slot| &slot.ledger)
            .ok_or(RegistryError::MarketNotFound(*market))
    }

    pub fn ledger_mut(&mut self, market: &MarketId) -> RegistryResult<&mut Ledger> {
        self.slot_mut(market).map(|slot| &mut slot.ledger)
    }

    pub fn asset(&self, market: &MarketId) -> RegistryResult<&dyn UnderlyingAsset> {
        self.markets
            .get(market)
            .map(|slot| slot.asset.as_ref())
            .ok_or(RegistryError::MarketNotFound(*market))
    }

    pub fn slot_mut(&mut self, market: &MarketId) -> RegistryResult<&mut MarketSlot> {
        self.markets
            .get_mut(market)
            .ok_or(RegistryError::MarketNotFound(*market))
    }

    /// Mutable access to two distinct markets at once. Passing the same id
    /// twice reports the second one as missing.
    pub fn pair_mut(
        &mut self,
        a: &MarketId,
        b: &MarketId,
    ) -> RegistryResult<(&mut MarketSlot, &mut MarketSlot)> {
        let mut first = None;
        let mut second = None;
        for (id, slot) in self.markets.iter_mut() {
            if id == a && first.is_none() {
                first = Some(slot);
            } else if id == b {
                second = Some(slot);
            }
        }
        match (first, second) {
            (Some(x), Some(y)) => Ok((x, y)),
            (None, _) => Err(RegistryError::MarketNotFound(*a)),
            (_, None) => Err(RegistryError::MarketNotFound(*b)),
        }
    }

    /// Look up a market by its ledger symbol.
    pub fn find_by_symbol(&self, symbol: &str) -> Option<MarketId> {
        self.markets
            .iter()
            .find(|(_, slot)| slot.ledger.symbol() == symbol)
            .map(|(id, _)| *id)
    }
}

impl SnapshotSource for MarketRegistry {
    fn account_snapshot(
        &self,
        market: &MarketId,
        account: &Account,
    ) -> MathResult<Option<AccountSnapshot>> {
        match self.markets.get(market) {
            Some(slot) => slot.ledger.account_snapshot(account).map(Some),
            None => Ok(None),
        }
    }

    fn exchange_rate(&self, market: &MarketId) -> MathResult<Option<Exp>> {
        match self.markets.get(market) {
            Some(slot) => slot.ledger.exchange_rate().map(Some),
            None => Ok(None),
        }
    }

    fn total_borrows(&self, market: &MarketId) -> Option<U256> {
        self.markets
            .get(market)
            .map(|slot| slot.ledger.state().total_borrows)
    }
}
