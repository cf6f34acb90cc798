//! Ledger records.

use alloy_primitives::U256;
use moneta_core::{BlockNumber, Exp};
use serde::{Deserialize, Serialize};

/// Aggregate counters of one market.
///
/// `Copy` so the coordinator can journal it before accruing and put it back if
/// the surrounding transaction fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub total_supply: U256,
    pub total_borrows: U256,
    pub total_reserves: U256,
    /// Starts at 1 and never decreases.
    pub borrow_index: Exp,
    pub accrual_block: BlockNumber,
    /// Underlying held in custody.
    pub cash: U256,
}

impl LedgerState {
    pub fn new(accrual_block: BlockNumber) -> Self {
        Self {
            total_supply: U256::ZERO,
            total_borrows: U256::ZERO,
            total_reserves: U256::ZERO,
            borrow_index: Exp::ONE,
            accrual_block,
            cash: U256::ZERO,
        }
    }
}

/// Borrow principal as of `interest_index`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowSnapshot {
    pub principal: U256,
    pub interest_index: Exp,
}

/// Per-market parameters set by the admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerParams {
    /// Share of interest set aside as reserves, at most 1.
    pub reserve_factor: Exp,
    /// Exchange rate used while the market has no supply.
    pub initial_exchange_rate: Exp,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            reserve_factor: Exp::ZERO,
            initial_exchange_rate: Exp::ONE,
        }
    }
}
