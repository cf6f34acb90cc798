//! Admin operations: deployment, risk policy and per-market ledger settings.

use crate::error::ProtocolResult;
use crate::protocol::Protocol;
use alloy_primitives::U256;
use moneta_core::{Account, Exp, MarketId, PauseTarget};
use moneta_interfaces::{InterestRateModel, PriceOracle, UnderlyingAsset};
use moneta_ledger::{Ledger, LedgerParams};
use moneta_risk::{RiskError, RiskParams};
use moneta_telemetry::Metrics;
use std::sync::Arc;
use tracing::{info, warn};

impl Protocol {
    fn ensure_admin(&self, caller: &Account) -> ProtocolResult<()> {
        if !self.risk.is_admin(caller) {
            warn!(%caller, "Admin call refused");
            return Err(RiskError::Unauthorized.into());
        }
        Ok(())
    }

    fn report_listed(&self) {
        let listed = self
            .registry
            .ids()
            .filter(|m| self.risk.is_listed(m))
            .count();
        Metrics::markets_listed(listed);
    }

    /// Deploy a market at the current block. It still has to be listed with
    /// `support_market` before it accepts deposits.
    pub fn deploy_market(
        &mut self,
        caller: &Account,
        market: MarketId,
        symbol: &str,
        params: LedgerParams,
        rate_model: Arc<dyn InterestRateModel>,
        asset: Box<dyn UnderlyingAsset>,
    ) -> ProtocolResult<()> {
        let caller = *caller;
        self.transact("deploy_market", |p, _| {
            p.ensure_admin(&caller)?;
            let ledger = Ledger::new(market, symbol, params, rate_model, p.block_number())?;
            p.registry.deploy(ledger, asset)?;
            Ok(())
        })
    }

    /// List a deployed market so it accepts deposits and borrows.
    pub fn support_market(&mut self, caller: &Account, market: MarketId) -> ProtocolResult<()> {
        self.transact("support_market", |p, tx| {
            p.ensure_admin(caller)?;
            // deployment is checked first so an undeployed market is never listed
            p.registry.ledger(&market)?;
            tx.emit(p.risk.support_market(caller, market)?);
            p.report_listed();
            Ok(())
        })
    }

    /// Set how much of a market's supply counts as borrowing power.
    pub fn set_collateral_factor(
        &mut self,
        caller: &Account,
        market: MarketId,
        factor: Exp,
    ) -> ProtocolResult<()> {
        self.transact("set_collateral_factor", |p, tx| {
            tx.emit(p.risk.set_collateral_factor(caller, market, factor)?);
            Ok(())
        })
    }

    /// Set the share of a debt one liquidation may repay.
    pub fn set_close_factor(&mut self, caller: &Account, factor: Exp) -> ProtocolResult<()> {
        self.transact("set_close_factor", |p, tx| {
            tx.emit(p.risk.set_close_factor(caller, factor)?);
            Ok(())
        })
    }

    /// Set the collateral bonus paid to liquidators.
    pub fn set_liquidation_incentive(
        &mut self,
        caller: &Account,
        incentive: Exp,
    ) -> ProtocolResult<()> {
        self.transact("set_liquidation_incentive", |p, tx| {
            tx.emit(p.risk.set_liquidation_incentive(caller, incentive)?);
            Ok(())
        })
    }

    /// Set how many markets one account may enter.
    pub fn set_max_assets(&mut self, caller: &Account, max_assets: usize) -> ProtocolResult<()> {
        self.transact("set_max_assets", |p, tx| {
            tx.emit(p.risk.set_max_assets(caller, max_assets)?);
            Ok(())
        })
    }

    /// Swap the price source used for liquidity and seize math.
    pub fn set_price_oracle(
        &mut self,
        caller: &Account,
        oracle: Arc<dyn PriceOracle>,
    ) -> ProtocolResult<()> {
        self.transact("set_price_oracle", |p, tx| {
            tx.emit(p.risk.set_price_oracle(caller, oracle)?);
            Ok(())
        })
    }

    /// Set per-market borrow caps; zero removes a cap.
    pub fn set_market_borrow_caps(
        &mut self,
        caller: &Account,
        caps: &[(MarketId, U256)],
    ) -> ProtocolResult<()> {
        self.transact("set_market_borrow_caps", |p, tx| {
            tx.emit_all(p.risk.set_market_borrow_caps(caller, caps)?);
            Ok(())
        })
    }

    /// Flag a market for reward distribution.
    pub fn set_incentivized(
        &mut self,
        caller: &Account,
        market: MarketId,
        incentivized: bool,
    ) -> ProtocolResult<()> {
        self.transact("set_incentivized", |p, tx| {
            tx.emit(p.risk.set_incentivized(caller, market, incentivized)?);
            Ok(())
        })
    }

    /// Flip the protocol-wide pause. Redeem and repay stay open.
    pub fn set_protocol_paused(&mut self, caller: &Account, state: bool) -> ProtocolResult<()> {
        self.transact("set_protocol_paused", |p, tx| {
            tx.emit(p.risk.set_protocol_paused(caller, state)?);
            Metrics::protocol_paused(state);
            Ok(())
        })
    }

    /// Flip one per-action pause switch.
    pub fn set_action_paused(
        &mut self,
        caller: &Account,
        target: PauseTarget,
        state: bool,
    ) -> ProtocolResult<()> {
        self.transact("set_action_paused", |p, tx| {
            tx.emit(p.risk.set_action_paused(caller, target, state)?);
            Ok(())
        })
    }

    /// Nominate the next admin, or clear the nomination with `None`.
    pub fn set_pending_admin(
        &mut self,
        caller: &Account,
        pending: Option<Account>,
    ) -> ProtocolResult<()> {
        self.transact("set_pending_admin", |p, tx| {
            tx.emit(p.risk.set_pending_admin(caller, pending)?);
            Ok(())
        })
    }

    /// Called by the pending admin to take over.
    pub fn accept_admin(&mut self, caller: &Account) -> ProtocolResult<()> {
        self.transact("accept_admin", |p, tx| {
            tx.emit_all(p.risk.accept_admin(caller)?);
            Ok(())
        })
    }

    /// Replace the risk parameter snapshot in one step.
    pub fn apply_params(&mut self, caller: &Account, params: RiskParams) -> ProtocolResult<()> {
        self.transact("apply_params", |p, tx| {
            tx.emit(p.risk.apply_params(caller, params)?);
            Metrics::protocol_paused(p.risk.params().pause.protocol_paused);
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Ledger admin
    // ------------------------------------------------------------------

    /// Set a market's reserve factor after accruing at the old one.
    pub fn set_reserve_factor(
        &mut self,
        caller: &Account,
        market: MarketId,
        factor: Exp,
    ) -> ProtocolResult<()> {
        self.transact("set_reserve_factor", |p, tx| {
            p.ensure_admin(caller)?;
            p.accrue(tx, &market)?;
            tx.emit(p.registry.ledger_mut(&market)?.set_reserve_factor(factor)?);
            Ok(())
        })
    }

    /// Swap a market's interest rate model.
    pub fn set_interest_rate_model(
        &mut self,
        caller: &Account,
        market: MarketId,
        model: Arc<dyn InterestRateModel>,
    ) -> ProtocolResult<()> {
        self.transact("set_interest_rate_model", |p, tx| {
            p.ensure_admin(caller)?;
            // interest up to now accrues under the old model
            p.accrue(tx, &market)?;
            tx.emit(p.registry.ledger_mut(&market)?.set_interest_rate_model(model));
            Ok(())
        })
    }

    /// Anyone may donate underlying to a market's reserves.
    pub fn add_reserves(
        &mut self,
        benefactor: Account,
        market: MarketId,
        amount: U256,
    ) -> ProtocolResult<()> {
        self.transact("add_reserves", |p, tx| {
            p.accrue(tx, &market)?;
            let slot = p.registry.slot_mut(&market)?;
            let plan = slot.ledger.plan_add_reserves(amount)?;
            slot.asset.transfer_in(benefactor, amount)?;
            tx.emit(slot.ledger.apply_add_reserves(benefactor, plan));
            Ok(())
        })
    }

    /// Withdraw reserves to the admin.
    pub fn reduce_reserves(
        &mut self,
        caller: &Account,
        market: MarketId,
        amount: U256,
    ) -> ProtocolResult<()> {
        let admin = *caller;
        self.transact("reduce_reserves", |p, tx| {
            p.ensure_admin(&admin)?;
            p.accrue(tx, &market)?;
            let slot = p.registry.slot_mut(&market)?;
            let plan = slot.ledger.plan_reduce_reserves(amount)?;
            slot.asset.transfer_out(admin, amount)?;
            tx.emit(slot.ledger.apply_reduce_reserves(admin, plan));
            info!(%market, %amount, "Reserves reduced");
            Ok(())
        })
    }
}
