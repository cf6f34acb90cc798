//! Permission hooks.
//!
//! Every hook checks, in order: the market is listed, the matching per-action
//! pause switch, the protocol-wide pause, then whatever risk condition applies.
//! The protocol pause covers mint, borrow, transfer and seize; redeem and repay
//! stay open so accounts can always exit and pay down debt.

use crate::engine::RiskEngine;
use crate::error::{RiskError, RiskResult};
use alloy_primitives::U256;
use moneta_core::{Account, Action, MarketId, MathError, SnapshotSource};
use tracing::debug;

impl RiskEngine {
    fn ensure_not_paused(&self, action: Action, market: &MarketId) -> RiskResult<()> {
        let pause = &self.params.pause;
        if pause.is_action_paused(action, market) {
            debug!(%action, %market, "Action paused");
            return Err(RiskError::ActionPaused {
                action,
                market: match action {
                    Action::Mint | Action::Borrow => Some(*market),
                    Action::Transfer | Action::Seize => None,
                },
            });
        }
        if pause.protocol_paused {
            debug!(%action, %market, "Protocol paused");
            return Err(RiskError::ProtocolPaused);
        }
        Ok(())
    }

    /// Refuse if redeeming `tokens` would put `account` in shortfall. Accounts
    /// not in the market are unconstrained.
    fn redeem_allowed_internal(
        &self,
        source: &dyn SnapshotSource,
        market: &MarketId,
        account: &Account,
        tokens: U256,
    ) -> RiskResult<()> {
        if !self.check_membership(account, market) {
            return Ok(());
        }
        let liquidity = self.get_hypothetical_account_liquidity(
            source,
            account,
            Some(*market),
            tokens,
            U256::ZERO,
        )?;
        if liquidity.has_shortfall() {
            debug!(%account, %market, shortfall = %liquidity.shortfall, "Redeem refused");
            return Err(RiskError::InsufficientLiquidity);
        }
        Ok(())
    }

    pub fn mint_allowed(&self, market: &MarketId) -> RiskResult<()> {
        self.listed_policy(market)?;
        self.ensure_not_paused(Action::Mint, market)
    }

    pub fn redeem_allowed(
        &self,
        source: &dyn SnapshotSource,
        market: &MarketId,
        redeemer: &Account,
        tokens: U256,
    ) -> RiskResult<()> {
        self.listed_policy(market)?;
        self.redeem_allowed_internal(source, market, redeemer, tokens)
    }

    /// Post-state sanity check: a nonzero payout must burn tokens.
    pub fn redeem_verify(&self, amount: U256, tokens: U256) -> RiskResult<()> {
        if tokens.is_zero() && !amount.is_zero() {
            return Err(RiskError::InvalidAmount(
                "redeem pays out without burning tokens".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns whether `borrower` must enter `market` as part of this borrow.
    pub fn borrow_allowed(
        &self,
        source: &dyn SnapshotSource,
        market: &MarketId,
        borrower: &Account,
        amount: U256,
    ) -> RiskResult<bool> {
        let policy = self.listed_policy(market)?;
        self.ensure_not_paused(Action::Borrow, market)?;

        let needs_entry = self.check_can_enter(borrower, market)?;
        self.oracle.price(market)?;

        if !policy.borrow_cap.is_zero() {
            let total_borrows = source
                .total_borrows(market)
                .ok_or(RiskError::MarketNotDeployed(*market))?;
            let next_total = total_borrows
                .checked_add(amount)
                .ok_or(MathError::Overflow)?;
            if next_total >= policy.borrow_cap {
                debug!(%market, %next_total, cap = %policy.borrow_cap, "Borrow cap reached");
                return Err(RiskError::BorrowCapExceeded(*market));
            }
        }

        let liquidity = self.get_hypothetical_account_liquidity(
            source,
            borrower,
            Some(*market),
            U256::ZERO,
            amount,
        )?;
        if liquidity.has_shortfall() {
            debug!(%borrower, %market, shortfall = %liquidity.shortfall, "Borrow refused");
            return Err(RiskError::InsufficientLiquidity);
        }
        Ok(needs_entry)
    }

    pub fn repay_borrow_allowed(&self, market: &MarketId) -> RiskResult<()> {
        self.listed_policy(market)?;
        Ok(())
    }

    /// Liquidation preconditions: both markets listed, borrower in shortfall,
    /// repay within `closeFactor * owed` and nonzero, liquidator not the
    /// borrower.
    pub fn liquidate_borrow_allowed(
        &self,
        source: &dyn SnapshotSource,
        borrowed: &MarketId,
        collateral: &MarketId,
        liquidator: &Account,
        borrower: &Account,
        repay_amount: U256,
    ) -> RiskResult<()> {
        self.listed_policy(borrowed)?;
        self.listed_policy(collateral)?;

        let liquidity = self.get_account_liquidity(source, borrower)?;
        if !liquidity.has_shortfall() {
            debug!(%borrower, "Liquidation refused: no shortfall");
            return Err(RiskError::InsufficientShortfall);
        }

        let owed = source
            .account_snapshot(borrowed, borrower)?
            .ok_or(RiskError::MarketNotDeployed(*borrowed))?
            .borrow_balance;
        let max_close = self.params.close_factor.mul_scalar_truncate(owed)?;
        if repay_amount > max_close {
            debug!(%borrower, %repay_amount, %max_close, "Liquidation refused: repay too large");
            return Err(RiskError::TooMuchRepay);
        }
        if liquidator == borrower {
            return Err(RiskError::LiquidatorIsBorrower);
        }
        if repay_amount.is_zero() {
            return Err(RiskError::TooLittleRepay);
        }
        Ok(())
    }

    pub fn seize_allowed(&self, collateral: &MarketId, borrowed: &MarketId) -> RiskResult<()> {
        self.listed_policy(collateral)?;
        self.listed_policy(borrowed)?;
        self.ensure_not_paused(Action::Seize, collateral)
    }

    pub fn transfer_allowed(
        &self,
        source: &dyn SnapshotSource,
        market: &MarketId,
        src: &Account,
        tokens: U256,
    ) -> RiskResult<()> {
        self.listed_policy(market)?;
        self.ensure_not_paused(Action::Transfer, market)?;
        self.redeem_allowed_internal(source, market, src, tokens)
    }
}
