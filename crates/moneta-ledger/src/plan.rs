//! Balance-changing operations, as plan/apply pairs.
//!
//! A plan carries every value its `apply_*` writes, so applying is a plain
//! assignment. Plans are only valid against the ledger that produced them and
//! only until that ledger changes.

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::Ledger;
use crate::state::BorrowSnapshot;
use alloy_primitives::U256;
use moneta_core::{Account, Event, MarketId, MathError};
use tracing::debug;

/// How a redeem request is denominated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemAmount {
    /// Redeem this many interest-bearing tokens.
    Tokens(U256),
    /// Redeem whatever number of tokens yields this much underlying.
    Underlying(U256),
}

/// Validated deposit, ready for [`Ledger::apply_mint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintPlan {
    market: MarketId,
    pub minter: Account,
    pub amount: U256,
    pub tokens: U256,
    total_supply: U256,
    balance: U256,
    cash: U256,
}

/// Validated redemption, ready for [`Ledger::apply_redeem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemPlan {
    market: MarketId,
    pub redeemer: Account,
    pub amount: U256,
    pub tokens: U256,
    total_supply: U256,
    balance: U256,
    cash: U256,
}

/// Validated loan, ready for [`Ledger::apply_borrow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowPlan {
    market: MarketId,
    pub borrower: Account,
    pub amount: U256,
    pub account_borrows: U256,
    pub total_borrows: U256,
    cash: U256,
}

/// Validated repayment, ready for [`Ledger::apply_repay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepayPlan {
    market: MarketId,
    pub payer: Account,
    pub borrower: Account,
    /// Requested amount capped at what is owed.
    pub actual_amount: U256,
    pub account_borrows: U256,
    pub total_borrows: U256,
    cash: U256,
}

/// Collateral moving from a borrower to a liquidator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeizePlan {
    market: MarketId,
    pub liquidator: Account,
    pub borrower: Account,
    pub tokens: U256,
    borrower_balance: U256,
    liquidator_balance: U256,
}

/// Token move between two accounts, with the allowance left after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    market: MarketId,
    pub spender: Account,
    pub src: Account,
    pub dst: Account,
    pub tokens: U256,
    src_balance: U256,
    dst_balance: U256,
    allowance: Option<U256>,
}

/// Reserve change, shared by add and reduce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservesPlan {
    market: MarketId,
    pub amount: U256,
    total_reserves: U256,
    cash: U256,
}

fn add(a: U256, b: U256) -> LedgerResult<U256> {
    a.checked_add(b).ok_or(MathError::Overflow.into())
}

impl Ledger {
    /// `tokens = floor(amount / exchangeRate)`.
    pub fn plan_mint(&self, minter: Account, amount: U256) -> LedgerResult<MintPlan> {
        let rate = self.exchange_rate()?;
        let tokens = rate.div_into_scalar(amount)?;
        if tokens.is_zero() && !amount.is_zero() {
            return Err(LedgerError::InvalidAmount(format!(
                "deposit of {amount} mints no tokens at rate {rate}"
            )));
        }

        Ok(MintPlan {
            market: self.market,
            minter,
            amount,
            tokens,
            total_supply: add(self.state.total_supply, tokens)?,
            balance: add(self.balance_of(&minter), tokens)?,
            cash: add(self.state.cash, amount)?,
        })
    }

    /// Credit the minted tokens and the deposited cash.
    pub fn apply_mint(&mut self, plan: MintPlan) -> Event {
        debug_assert_eq!(plan.market, self.market);
        self.state.total_supply = plan.total_supply;
        self.state.cash = plan.cash;
        self.balances.insert(plan.minter, plan.balance);
        Event::Mint {
            market: self.market,
            minter: plan.minter,
            amount: plan.amount,
            tokens: plan.tokens,
        }
    }

    /// Resolve a redeem request into `(tokens, amount)`.
    ///
    /// Token redemptions floor the payout; underlying redemptions round the
    /// burned tokens up.
    pub fn redeem_amounts(&self, request: RedeemAmount) -> LedgerResult<(U256, U256)> {
        let rate = self.exchange_rate()?;
        match request {
            RedeemAmount::Tokens(tokens) => Ok((tokens, rate.mul_scalar_truncate(tokens)?)),
            RedeemAmount::Underlying(amount) => Ok((rate.div_into_scalar_ceil(amount)?, amount)),
        }
    }

    /// Burn `tokens` from `redeemer` and pay out `amount` of cash.
    pub fn plan_redeem(
        &self,
        redeemer: Account,
        tokens: U256,
        amount: U256,
    ) -> LedgerResult<RedeemPlan> {
        let balance = self
            .balance_of(&redeemer)
            .checked_sub(tokens)
            .ok_or(LedgerError::InsufficientBalance { account: redeemer })?;
        let total_supply = self
            .state
            .total_supply
            .checked_sub(tokens)
            .ok_or(MathError::Underflow)?;
        let cash = self
            .state
            .cash
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientCash)?;

        Ok(RedeemPlan {
            market: self.market,
            redeemer,
            amount,
            tokens,
            total_supply,
            balance,
            cash,
        })
    }

    /// Debit the burned tokens and the paid-out cash.
    pub fn apply_redeem(&mut self, plan: RedeemPlan) -> Event {
        debug_assert_eq!(plan.market, self.market);
        self.state.total_supply = plan.total_supply;
        self.state.cash = plan.cash;
        self.balances.insert(plan.redeemer, plan.balance);
        Event::Redeem {
            market: self.market,
            redeemer: plan.redeemer,
            amount: plan.amount,
            tokens: plan.tokens,
        }
    }

    /// Lend `amount` of cash to `borrower`, on top of any current debt.
    pub fn plan_borrow(&self, borrower: Account, amount: U256) -> LedgerResult<BorrowPlan> {
        let cash = self
            .state
            .cash
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientCash)?;

        Ok(BorrowPlan {
            market: self.market,
            borrower,
            amount,
            account_borrows: add(self.borrow_balance(&borrower)?, amount)?,
            total_borrows: add(self.state.total_borrows, amount)?,
            cash,
        })
    }

    /// Record the new debt at the current borrow index.
    pub fn apply_borrow(&mut self, plan: BorrowPlan) -> Event {
        debug_assert_eq!(plan.market, self.market);
        self.write_borrow(plan.borrower, plan.account_borrows);
        self.state.total_borrows = plan.total_borrows;
        self.state.cash = plan.cash;
        Event::Borrow {
            market: self.market,
            borrower: plan.borrower,
            amount: plan.amount,
            account_borrows: plan.account_borrows,
            total_borrows: plan.total_borrows,
        }
    }

    /// Repay up to `amount` of `borrower`'s debt; anything above the owed
    /// amount is ignored. Pass `U256::MAX` to repay everything.
    pub fn plan_repay(
        &self,
        payer: Account,
        borrower: Account,
        amount: U256,
    ) -> LedgerResult<RepayPlan> {
        let owed = self.borrow_balance(&borrower)?;
        let actual_amount = amount.min(owed);
        let total_borrows = self
            .state
            .total_borrows
            .checked_sub(actual_amount)
            .ok_or(MathError::Underflow)?;

        Ok(RepayPlan {
            market: self.market,
            payer,
            borrower,
            actual_amount,
            account_borrows: owed - actual_amount,
            total_borrows,
            cash: add(self.state.cash, actual_amount)?,
        })
    }

    /// Record the reduced debt at the current borrow index.
    pub fn apply_repay(&mut self, plan: RepayPlan) -> Event {
        debug_assert_eq!(plan.market, self.market);
        self.write_borrow(plan.borrower, plan.account_borrows);
        self.state.total_borrows = plan.total_borrows;
        self.state.cash = plan.cash;
        Event::RepayBorrow {
            market: self.market,
            payer: plan.payer,
            borrower: plan.borrower,
            amount: plan.actual_amount,
            account_borrows: plan.account_borrows,
            total_borrows: plan.total_borrows,
        }
    }

    /// Move `tokens` of collateral from `borrower` to `liquidator`.
    pub fn plan_seize(
        &self,
        liquidator: Account,
        borrower: Account,
        tokens: U256,
    ) -> LedgerResult<SeizePlan> {
        if liquidator == borrower {
            return Err(LedgerError::LiquidatorIsBorrower);
        }
        let borrower_balance = self
            .balance_of(&borrower)
            .checked_sub(tokens)
            .ok_or(LedgerError::InsufficientBalance { account: borrower })?;

        Ok(SeizePlan {
            market: self.market,
            liquidator,
            borrower,
            tokens,
            borrower_balance,
            liquidator_balance: add(self.balance_of(&liquidator), tokens)?,
        })
    }

    /// Move the seized tokens. Total supply is unchanged.
    pub fn apply_seize(&mut self, plan: SeizePlan) -> Event {
        debug_assert_eq!(plan.market, self.market);
        self.balances.insert(plan.borrower, plan.borrower_balance);
        self.balances.insert(plan.liquidator, plan.liquidator_balance);
        Event::Transfer {
            market: self.market,
            from: plan.borrower,
            to: plan.liquidator,
            tokens: plan.tokens,
        }
    }

    /// Transfer tokens from `src` to `dst` on behalf of `spender`. The owner
    /// needs no allowance.
    pub fn plan_transfer(
        &self,
        spender: Account,
        src: Account,
        dst: Account,
        tokens: U256,
    ) -> LedgerResult<TransferPlan> {
        if src == dst {
            return Err(LedgerError::InvalidAmount(
                "transfer to self".to_string(),
            ));
        }

        let allowance = if spender == src {
            None
        } else {
            let current = self.allowance(&src, &spender);
            if current == U256::MAX {
                None
            } else {
                Some(current.checked_sub(tokens).ok_or(
                    LedgerError::InsufficientAllowance {
                        owner: src,
                        spender,
                    },
                )?)
            }
        };

        let src_balance = self
            .balance_of(&src)
            .checked_sub(tokens)
            .ok_or(LedgerError::InsufficientBalance { account: src })?;

        Ok(TransferPlan {
            market: self.market,
            spender,
            src,
            dst,
            tokens,
            src_balance,
            dst_balance: add(self.balance_of(&dst), tokens)?,
            allowance,
        })
    }

    /// Move the tokens and consume any finite allowance.
    pub fn apply_transfer(&mut self, plan: TransferPlan) -> Event {
        debug_assert_eq!(plan.market, self.market);
        self.balances.insert(plan.src, plan.src_balance);
        self.balances.insert(plan.dst, plan.dst_balance);
        if let Some(remaining) = plan.allowance {
            self.allowances.insert((plan.src, plan.spender), remaining);
        }
        Event::Transfer {
            market: self.market,
            from: plan.src,
            to: plan.dst,
            tokens: plan.tokens,
        }
    }

    /// Add `amount` of cash straight to reserves.
    pub fn plan_add_reserves(&self, amount: U256) -> LedgerResult<ReservesPlan> {
        Ok(ReservesPlan {
            market: self.market,
            amount,
            total_reserves: add(self.state.total_reserves, amount)?,
            cash: add(self.state.cash, amount)?,
        })
    }

    /// Credit reserves and cash.
    pub fn apply_add_reserves(&mut self, benefactor: Account, plan: ReservesPlan) -> Event {
        debug_assert_eq!(plan.market, self.market);
        self.state.total_reserves = plan.total_reserves;
        self.state.cash = plan.cash;
        Event::ReservesAdded {
            market: self.market,
            benefactor,
            amount: plan.amount,
            total_reserves: plan.total_reserves,
        }
    }

    /// Withdraw `amount` of reserves; bounded by both reserves and cash.
    pub fn plan_reduce_reserves(&self, amount: U256) -> LedgerResult<ReservesPlan> {
        let cash = self
            .state
            .cash
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientCash)?;
        let total_reserves = self.state.total_reserves.checked_sub(amount).ok_or_else(|| {
            LedgerError::InvalidAmount(format!(
                "reduce {amount} exceeds reserves {}",
                self.state.total_reserves
            ))
        })?;

        Ok(ReservesPlan {
            market: self.market,
            amount,
            total_reserves,
            cash,
        })
    }

    /// Debit reserves and cash.
    pub fn apply_reduce_reserves(&mut self, admin: Account, plan: ReservesPlan) -> Event {
        debug_assert_eq!(plan.market, self.market);
        self.state.total_reserves = plan.total_reserves;
        self.state.cash = plan.cash;
        Event::ReservesReduced {
            market: self.market,
            admin,
            amount: plan.amount,
            total_reserves: plan.total_reserves,
        }
    }

    fn write_borrow(&mut self, borrower: Account, principal: U256) {
        debug!(market = %self.market, %borrower, %principal, "Borrow snapshot written");
        self.borrows.insert(
            borrower,
            BorrowSnapshot {
                principal,
                interest_index: self.state.borrow_index,
            },
        );
    }
}
