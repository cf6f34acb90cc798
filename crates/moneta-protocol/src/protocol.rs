//! Transaction coordinator and user operations.
//!
//! Every operation runs inside `Protocol::transact`. Ledger accrual is journaled
//! as it happens; everything else is planned first and applied only after the
//! last fallible step, which is always the single underlying transfer. A failed
//! operation restores the journal and drops its events, so a refusal leaves no
//! trace beyond metrics and logs.

use crate::error::{ProtocolError, ProtocolResult};
use alloy_primitives::U256;
use moneta_core::{Account, BlockNumber, Event, Exp, MarketId, MathError};
use moneta_interfaces::PriceOracle;
use moneta_ledger::{LedgerState, RedeemAmount};
use moneta_registry::MarketRegistry;
use moneta_risk::{AccountLiquidity, RiskEngine, RiskError};
use moneta_telemetry::Metrics;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Undo journal and pending events of one transaction.
#[derive(Debug, Default)]
pub(crate) struct Tx {
    journal: Vec<(MarketId, LedgerState)>,
    events: Vec<Event>,
}

impl Tx {
    pub(crate) fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub(crate) fn emit_all(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }
}

/// Owner of the markets and the risk engine. Committed events accumulate
/// in an in-memory buffer until [`Protocol::take_events`] drains it.
pub struct Protocol {
    pub(crate) registry: MarketRegistry,
    pub(crate) risk: RiskEngine,
    block: BlockNumber,
    events: Vec<Event>,
}

impl fmt::Debug for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protocol")
            .field("block", &self.block)
            .field("markets", &self.registry.len())
            .field("risk", &self.risk)
            .field("events", &self.events.len())
            .finish()
    }
}

impl Protocol {
    pub fn new(admin: Account, oracle: Arc<dyn PriceOracle>, start_block: BlockNumber) -> Self {
        Metrics::current_block(start_block);
        Self {
            registry: MarketRegistry::new(),
            risk: RiskEngine::new(admin, oracle),
            block: start_block,
            events: Vec::new(),
        }
    }

    pub fn registry(&self) -> &MarketRegistry {
        &self.registry
    }

    pub fn risk(&self) -> &RiskEngine {
        &self.risk
    }

    pub fn block_number(&self) -> BlockNumber {
        self.block
    }

    pub fn advance_blocks(&mut self, blocks: u64) -> ProtocolResult<BlockNumber> {
        let next = self
            .block
            .checked_add(blocks)
            .ok_or(MathError::Overflow)?;
        self.set_block_number(next)?;
        Ok(next)
    }

    /// Move the clock. It never runs backwards.
    pub fn set_block_number(&mut self, block: BlockNumber) -> ProtocolResult<()> {
        if block < self.block {
            return Err(ProtocolError::ClockBackwards {
                current: self.block,
                requested: block,
            });
        }
        self.block = block;
        Metrics::current_block(block);
        Ok(())
    }

    /// Events of every committed transaction not yet taken, oldest first.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Drain the event buffer. The buffer is unbounded; long-lived owners
    /// must drain it periodically.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Run `f` as one atomic transaction.
    pub(crate) fn transact<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut Self, &mut Tx) -> ProtocolResult<T>,
    ) -> ProtocolResult<T> {
        let mut tx = Tx::default();
        match f(self, &mut tx) {
            Ok(value) => {
                for event in &tx.events {
                    Metrics::event_recorded(event.name());
                }
                trace!(op, events = tx.events.len(), "Transaction committed");
                self.events.append(&mut tx.events);
                Metrics::operation_ok(op);
                Ok(value)
            }
            Err(err) => {
                for (market, state) in tx.journal.into_iter().rev() {
                    if let Ok(ledger) = self.registry.ledger_mut(&market) {
                        ledger.restore(state);
                    }
                }
                Metrics::operation_refused(op, err.reason());
                debug!(op, reason = err.reason(), error = %err, "Transaction rolled back");
                Err(err)
            }
        }
    }

    /// Accrue `market` to the current block, journaling its prior state.
    pub(crate) fn accrue(&mut self, tx: &mut Tx, market: &MarketId) -> ProtocolResult<()> {
        // listed markets are always deployed, so a missing one is unlisted
        if !self.registry.contains(market) {
            return Err(RiskError::MarketNotListed(*market).into());
        }
        let block = self.block;
        let ledger = self.registry.ledger_mut(market)?;
        let prior = ledger.state();
        if let Some(event) = ledger.accrue_interest(block)? {
            tx.journal.push((*market, prior));
            tx.emit(event);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn balance_of(&self, market: &MarketId, account: &Account) -> ProtocolResult<U256> {
        Ok(self.registry.ledger(market)?.balance_of(account))
    }

    /// Owed amount as of the market's last accrual.
    pub fn borrow_balance_stored(
        &self,
        market: &MarketId,
        account: &Account,
    ) -> ProtocolResult<U256> {
        Ok(self.registry.ledger(market)?.borrow_balance(account)?)
    }

    pub fn exchange_rate_stored(&self, market: &MarketId) -> ProtocolResult<Exp> {
        Ok(self.registry.ledger(market)?.exchange_rate()?)
    }

    pub fn account_liquidity(&self, account: &Account) -> ProtocolResult<AccountLiquidity> {
        Ok(self.risk.get_account_liquidity(&self.registry, account)?)
    }

    pub fn hypothetical_account_liquidity(
        &self,
        account: &Account,
        market: MarketId,
        redeem_tokens: U256,
        borrow_amount: U256,
    ) -> ProtocolResult<AccountLiquidity> {
        Ok(self.risk.get_hypothetical_account_liquidity(
            &self.registry,
            account,
            Some(market),
            redeem_tokens,
            borrow_amount,
        )?)
    }

    // ------------------------------------------------------------------
    // User operations
    // ------------------------------------------------------------------

    pub fn accrue_interest(&mut self, market: MarketId) -> ProtocolResult<()> {
        self.transact("accrue_interest", |p, tx| p.accrue(tx, &market))
    }

    /// Accrue, then read the owed amount.
    pub fn borrow_balance_current(
        &mut self,
        market: MarketId,
        account: Account,
    ) -> ProtocolResult<U256> {
        self.transact("borrow_balance_current", |p, tx| {
            p.accrue(tx, &market)?;
            Ok(p.registry.ledger(&market)?.borrow_balance(&account)?)
        })
    }

    /// Supply `amount` of underlying; returns the tokens minted.
    pub fn mint(&mut self, minter: Account, market: MarketId, amount: U256) -> ProtocolResult<U256> {
        self.transact("mint", |p, tx| {
            p.accrue(tx, &market)?;
            p.risk.mint_allowed(&market)?;

            let slot = p.registry.slot_mut(&market)?;
            let plan = slot.ledger.plan_mint(minter, amount)?;
            slot.asset.transfer_in(minter, amount)?;
            let tokens = plan.tokens;
            tx.emit(slot.ledger.apply_mint(plan));
            Ok(tokens)
        })
    }

    /// Burn `tokens`; returns the underlying paid out.
    pub fn redeem(
        &mut self,
        redeemer: Account,
        market: MarketId,
        tokens: U256,
    ) -> ProtocolResult<U256> {
        self.redeem_fresh("redeem", redeemer, market, RedeemAmount::Tokens(tokens))
            .map(|(_, amount)| amount)
    }

    /// Withdraw `amount` of underlying; returns the tokens burned.
    pub fn redeem_underlying(
        &mut self,
        redeemer: Account,
        market: MarketId,
        amount: U256,
    ) -> ProtocolResult<U256> {
        self.redeem_fresh(
            "redeem_underlying",
            redeemer,
            market,
            RedeemAmount::Underlying(amount),
        )
        .map(|(tokens, _)| tokens)
    }

    fn redeem_fresh(
        &mut self,
        op: &'static str,
        redeemer: Account,
        market: MarketId,
        request: RedeemAmount,
    ) -> ProtocolResult<(U256, U256)> {
        self.transact(op, |p, tx| {
            p.accrue(tx, &market)?;
            let (tokens, amount) = p.registry.ledger(&market)?.redeem_amounts(request)?;
            p.risk
                .redeem_allowed(&p.registry, &market, &redeemer, tokens)?;
            p.risk.redeem_verify(amount, tokens)?;

            let slot = p.registry.slot_mut(&market)?;
            let plan = slot.ledger.plan_redeem(redeemer, tokens, amount)?;
            slot.asset.transfer_out(redeemer, amount)?;
            tx.emit(slot.ledger.apply_redeem(plan));
            Ok((tokens, amount))
        })
    }

    /// Borrow `amount`, entering `market` first if needed.
    pub fn borrow(&mut self, borrower: Account, market: MarketId, amount: U256) -> ProtocolResult<()> {
        self.transact("borrow", |p, tx| {
            p.accrue(tx, &market)?;
            let needs_entry = p
                .risk
                .borrow_allowed(&p.registry, &market, &borrower, amount)?;

            let slot = p.registry.slot_mut(&market)?;
            let plan = slot.ledger.plan_borrow(borrower, amount)?;
            slot.asset.transfer_out(borrower, amount)?;
            let event = slot.ledger.apply_borrow(plan);

            if needs_entry {
                if let Some(entered) = p.risk.commit_enter_market(borrower, market) {
                    tx.emit(entered);
                }
            }
            tx.emit(event);
            Ok(())
        })
    }

    /// Repay the caller's own debt. `U256::MAX` repays everything; returns the
    /// amount actually repaid.
    pub fn repay_borrow(
        &mut self,
        payer: Account,
        market: MarketId,
        amount: U256,
    ) -> ProtocolResult<U256> {
        self.repay_fresh("repay_borrow", payer, payer, market, amount)
    }

    pub fn repay_borrow_behalf(
        &mut self,
        payer: Account,
        borrower: Account,
        market: MarketId,
        amount: U256,
    ) -> ProtocolResult<U256> {
        self.repay_fresh("repay_borrow_behalf", payer, borrower, market, amount)
    }

    fn repay_fresh(
        &mut self,
        op: &'static str,
        payer: Account,
        borrower: Account,
        market: MarketId,
        amount: U256,
    ) -> ProtocolResult<U256> {
        self.transact(op, |p, tx| {
            p.accrue(tx, &market)?;
            p.risk.repay_borrow_allowed(&market)?;

            let slot = p.registry.slot_mut(&market)?;
            let plan = slot.ledger.plan_repay(payer, borrower, amount)?;
            slot.asset.transfer_in(payer, plan.actual_amount)?;
            let actual = plan.actual_amount;
            tx.emit(slot.ledger.apply_repay(plan));
            Ok(actual)
        })
    }

    /// Repay `repay_amount` of `borrower`'s debt in `borrowed` and seize
    /// collateral in `collateral`. Returns the seized tokens.
    pub fn liquidate_borrow(
        &mut self,
        liquidator: Account,
        borrower: Account,
        borrowed: MarketId,
        repay_amount: U256,
        collateral: MarketId,
    ) -> ProtocolResult<U256> {
        self.transact("liquidate_borrow", |p, tx| {
            p.accrue(tx, &borrowed)?;
            p.accrue(tx, &collateral)?;

            p.risk.liquidate_borrow_allowed(
                &p.registry,
                &borrowed,
                &collateral,
                &liquidator,
                &borrower,
                repay_amount,
            )?;
            p.risk.repay_borrow_allowed(&borrowed)?;
            let seize_tokens = p.risk.liquidate_calculate_seize_tokens(
                &p.registry,
                &borrowed,
                &collateral,
                repay_amount,
            )?;
            p.risk.seize_allowed(&collateral, &borrowed)?;

            let (repaid, repay_event, seize_event) = if borrowed == collateral {
                let slot = p.registry.slot_mut(&borrowed)?;
                let repay = slot.ledger.plan_repay(liquidator, borrower, repay_amount)?;
                let seize = slot.ledger.plan_seize(liquidator, borrower, seize_tokens)?;
                slot.asset.transfer_in(liquidator, repay.actual_amount)?;
                (
                    repay.actual_amount,
                    slot.ledger.apply_repay(repay),
                    slot.ledger.apply_seize(seize),
                )
            } else {
                let (debt, coll) = p.registry.pair_mut(&borrowed, &collateral)?;
                let repay = debt.ledger.plan_repay(liquidator, borrower, repay_amount)?;
                let seize = coll.ledger.plan_seize(liquidator, borrower, seize_tokens)?;
                debt.asset.transfer_in(liquidator, repay.actual_amount)?;
                (
                    repay.actual_amount,
                    debt.ledger.apply_repay(repay),
                    coll.ledger.apply_seize(seize),
                )
            };

            tx.emit(repay_event);
            tx.emit(seize_event);
            tx.emit(Event::LiquidateBorrow {
                market: borrowed,
                liquidator,
                borrower,
                repay_amount: repaid,
                collateral_market: collateral,
                seize_tokens,
            });
            Ok(seize_tokens)
        })
    }

    pub fn transfer(
        &mut self,
        src: Account,
        dst: Account,
        market: MarketId,
        tokens: U256,
    ) -> ProtocolResult<()> {
        self.transfer_tokens("transfer", src, src, dst, market, tokens)
    }

    /// Transfer on behalf of `src`, consuming `spender`'s allowance.
    pub fn transfer_from(
        &mut self,
        spender: Account,
        src: Account,
        dst: Account,
        market: MarketId,
        tokens: U256,
    ) -> ProtocolResult<()> {
        self.transfer_tokens("transfer_from", spender, src, dst, market, tokens)
    }

    fn transfer_tokens(
        &mut self,
        op: &'static str,
        spender: Account,
        src: Account,
        dst: Account,
        market: MarketId,
        tokens: U256,
    ) -> ProtocolResult<()> {
        self.transact(op, |p, tx| {
            p.accrue(tx, &market)?;
            p.risk.transfer_allowed(&p.registry, &market, &src, tokens)?;

            let ledger = p.registry.ledger_mut(&market)?;
            let plan = ledger.plan_transfer(spender, src, dst, tokens)?;
            tx.emit(ledger.apply_transfer(plan));
            Ok(())
        })
    }

    pub fn approve(
        &mut self,
        owner: Account,
        spender: Account,
        market: MarketId,
        amount: U256,
    ) -> ProtocolResult<()> {
        self.transact("approve", |p, tx| {
            let ledger = p.registry.ledger_mut(&market)?;
            tx.emit(ledger.approve(owner, spender, amount));
            Ok(())
        })
    }

    pub fn enter_markets(&mut self, account: Account, markets: &[MarketId]) -> ProtocolResult<()> {
        self.transact("enter_markets", |p, tx| {
            tx.emit_all(p.risk.enter_markets(account, markets)?);
            Ok(())
        })
    }

    pub fn exit_market(&mut self, account: Account, market: MarketId) -> ProtocolResult<()> {
        self.transact("exit_market", |p, tx| {
            if let Some(event) = p.risk.exit_market(&p.registry, account, market)? {
                tx.emit(event);
            }
            Ok(())
        })
    }
}
