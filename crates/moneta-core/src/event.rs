//! Observable protocol events.
//!
//! Events are produced by committed transactions only. Each carries the market
//! it concerns (when there is one) and the post-state values a consumer needs to
//! follow the ledger without replaying it.

use crate::exp::Exp;
use crate::market::{Account, MarketId};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pausable action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Mint,
    Borrow,
    Transfer,
    Seize,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Mint => "mint",
            Action::Borrow => "borrow",
            Action::Transfer => "transfer",
            Action::Seize => "seize",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of a pause switch.
///
/// Mint and borrow are paused per market; transfer and seize are paused for
/// every market at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", content = "market", rename_all = "snake_case")]
pub enum PauseTarget {
    Mint(MarketId),
    Borrow(MarketId),
    Transfer,
    Seize,
}

impl PauseTarget {
    pub fn action(&self) -> Action {
        match self {
            PauseTarget::Mint(_) => Action::Mint,
            PauseTarget::Borrow(_) => Action::Borrow,
            PauseTarget::Transfer => Action::Transfer,
            PauseTarget::Seize => Action::Seize,
        }
    }

    pub fn market(&self) -> Option<MarketId> {
        match self {
            PauseTarget::Mint(m) | PauseTarget::Borrow(m) => Some(*m),
            PauseTarget::Transfer | PauseTarget::Seize => None,
        }
    }
}

/// Protocol event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    AccrueInterest {
        market: MarketId,
        cash_prior: U256,
        interest_accumulated: U256,
        borrow_index: Exp,
        total_borrows: U256,
    },
    Mint {
        market: MarketId,
        minter: Account,
        amount: U256,
        tokens: U256,
    },
    Redeem {
        market: MarketId,
        redeemer: Account,
        amount: U256,
        tokens: U256,
    },
    Borrow {
        market: MarketId,
        borrower: Account,
        amount: U256,
        account_borrows: U256,
        total_borrows: U256,
    },
    RepayBorrow {
        market: MarketId,
        payer: Account,
        borrower: Account,
        amount: U256,
        account_borrows: U256,
        total_borrows: U256,
    },
    LiquidateBorrow {
        market: MarketId,
        liquidator: Account,
        borrower: Account,
        repay_amount: U256,
        collateral_market: MarketId,
        seize_tokens: U256,
    },
    Transfer {
        market: MarketId,
        from: Account,
        to: Account,
        tokens: U256,
    },
    Approval {
        market: MarketId,
        owner: Account,
        spender: Account,
        amount: U256,
    },
    MarketListed {
        market: MarketId,
    },
    MarketEntered {
        market: MarketId,
        account: Account,
    },
    MarketExited {
        market: MarketId,
        account: Account,
    },
    NewCollateralFactor {
        market: MarketId,
        old: Exp,
        new: Exp,
    },
    NewCloseFactor {
        old: Exp,
        new: Exp,
    },
    NewLiquidationIncentive {
        old: Exp,
        new: Exp,
    },
    NewMaxAssets {
        old: usize,
        new: usize,
    },
    NewPriceOracle {
        old: String,
        new: String,
    },
    NewBorrowCap {
        market: MarketId,
        cap: U256,
    },
    MarketIncentivized {
        market: MarketId,
        incentivized: bool,
    },
    ActionProtocolPaused {
        state: bool,
    },
    ActionPaused {
        market: Option<MarketId>,
        action: Action,
        state: bool,
    },
    NewPendingAdmin {
        old: Option<Account>,
        new: Option<Account>,
    },
    NewAdmin {
        old: Account,
        new: Account,
    },
    NewRiskParams {
        version: u64,
    },
    NewReserveFactor {
        market: MarketId,
        old: Exp,
        new: Exp,
    },
    ReservesAdded {
        market: MarketId,
        benefactor: Account,
        amount: U256,
        total_reserves: U256,
    },
    ReservesReduced {
        market: MarketId,
        admin: Account,
        amount: U256,
        total_reserves: U256,
    },
    NewMarketInterestRateModel {
        market: MarketId,
        old: String,
        new: String,
    },
}

impl Event {
    /// Event name as it appears in the serialized form.
    pub fn name(&self) -> &'static str {
        match self {
            Event::AccrueInterest { .. } => "AccrueInterest",
            Event::Mint { .. } => "Mint",
            Event::Redeem { .. } => "Redeem",
            Event::Borrow { .. } => "Borrow",
            Event::RepayBorrow { .. } => "RepayBorrow",
            Event::LiquidateBorrow { .. } => "LiquidateBorrow",
            Event::Transfer { .. } => "Transfer",
            Event::Approval { .. } => "Approval",
            Event::MarketListed { .. } => "MarketListed",
            Event::MarketEntered { .. } => "MarketEntered",
            Event::MarketExited { .. } => "MarketExited",
            Event::NewCollateralFactor { .. } => "NewCollateralFactor",
            Event::NewCloseFactor { .. } => "NewCloseFactor",
            Event::NewLiquidationIncentive { .. } => "NewLiquidationIncentive",
            Event::NewMaxAssets { .. } => "NewMaxAssets",
            Event::NewPriceOracle { .. } => "NewPriceOracle",
            Event::NewBorrowCap { .. } => "NewBorrowCap",
            Event::MarketIncentivized { .. } => "MarketIncentivized",
            Event::ActionProtocolPaused { .. } => "ActionProtocolPaused",
            Event::ActionPaused { .. } => "ActionPaused",
            Event::NewPendingAdmin { .. } => "NewPendingAdmin",
            Event::NewAdmin { .. } => "NewAdmin",
            Event::NewRiskParams { .. } => "NewRiskParams",
            Event::NewReserveFactor { .. } => "NewReserveFactor",
            Event::ReservesAdded { .. } => "ReservesAdded",
            Event::ReservesReduced { .. } => "ReservesReduced",
            Event::NewMarketInterestRateModel { .. } => "NewMarketInterestRateModel",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_target_scope() {
        let m = MarketId::from_byte(3);
        assert_eq!(PauseTarget::Borrow(m).market(), Some(m));
        assert_eq!(PauseTarget::Borrow(m).action(), Action::Borrow);
        assert_eq!(PauseTarget::Seize.market(), None);
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = Event::ActionProtocolPaused { state: true };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "ActionProtocolPaused");
        assert_eq!(json["state"], true);
        assert_eq!(event.name(), "ActionProtocolPaused");
    }
}
