//! Per-market account view consumed by the risk engine.

use crate::error::MathResult;
use crate::exp::Exp;
use crate::market::{Account, MarketId};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// What one market knows about one account, at the market's last accrual.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Interest-bearing token balance.
    pub tokens: U256,
    /// Owed amount including accrued interest.
    pub borrow_balance: U256,
    /// Current exchange rate of the market.
    pub exchange_rate: Exp,
}

/// Read-only access to market state across markets.
///
/// Every method returns `None` for a market that does not exist.
pub trait SnapshotSource {
    fn account_snapshot(
        &self,
        market: &MarketId,
        account: &Account,
    ) -> MathResult<Option<AccountSnapshot>>;

    fn exchange_rate(&self, market: &MarketId) -> MathResult<Option<Exp>>;

    fn total_borrows(&self, market: &MarketId) -> Option<U256>;
}
