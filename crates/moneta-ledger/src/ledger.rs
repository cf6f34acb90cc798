//! Ledger of one market: accrual, reads and admin setters.

use crate::error::{LedgerError, LedgerResult};
use crate::state::{BorrowSnapshot, LedgerParams, LedgerState};
use alloy_primitives::U256;
use moneta_core::{
    Account, AccountSnapshot, BlockNumber, Event, Exp, MarketId, MathError, MathResult,
};
use moneta_interfaces::InterestRateModel;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, trace};

/// Highest borrow rate a market accepts: 0.0005% per block.
pub const MAX_BORROW_RATE_MANTISSA: U256 = U256::from_limbs([5_000_000_000_000, 0, 0, 0]);

/// Accounting for one market: supply tokens, borrow snapshots and the
/// interest counters.
pub struct Ledger {
    pub(crate) market: MarketId,
    pub(crate) symbol: String,
    pub(crate) params: LedgerParams,
    pub(crate) state: LedgerState,
    pub(crate) balances: HashMap<Account, U256>,
    pub(crate) borrows: HashMap<Account, BorrowSnapshot>,
    pub(crate) allowances: HashMap<(Account, Account), U256>,
    rate_model: Arc<dyn InterestRateModel>,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("market", &self.market)
            .field("symbol", &self.symbol)
            .field("params", &self.params)
            .field("state", &self.state)
            .field("rate_model", &self.rate_model.name())
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// New empty market, accrued as of `block`.
    pub fn new(
        market: MarketId,
        symbol: impl Into<String>,
        params: LedgerParams,
        rate_model: Arc<dyn InterestRateModel>,
        block: BlockNumber,
    ) -> LedgerResult<Self> {
        if params.initial_exchange_rate.is_zero() {
            return Err(LedgerError::InvalidParameter(
                "initial exchange rate must be positive".to_string(),
            ));
        }
        validate_reserve_factor(params.reserve_factor)?;

        Ok(Self {
            market,
            symbol: symbol.into(),
            params,
            state: LedgerState::new(block),
            balances: HashMap::new(),
            borrows: HashMap::new(),
            allowances: HashMap::new(),
            rate_model,
        })
    }

    /// Id of the market this ledger accounts for.
    pub fn market(&self) -> MarketId {
        self.market
    }

    /// Ticker of the interest-bearing token, e.g. `vUSDC`.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Reserve factor and initial exchange rate.
    pub fn params(&self) -> LedgerParams {
        self.params
    }

    /// Copy of the aggregate counters, used by the coordinator's journal.
    pub fn state(&self) -> LedgerState {
        self.state
    }

    /// Put back a journaled state after a failed transaction.
    pub fn restore(&mut self, state: LedgerState) {
        trace!(market = %self.market, block = state.accrual_block, "Ledger state restored");
        self.state = state;
    }

    /// Current interest rate model.
    pub fn rate_model(&self) -> &Arc<dyn InterestRateModel> {
        &self.rate_model
    }

    /// Bring interest up to `current_block`.
    ///
    /// Returns `None` when the ledger is already accrued to this block. Either
    /// every counter advances or none does.
    pub fn accrue_interest(&mut self, current_block: BlockNumber) -> LedgerResult<Option<Event>> {
        let prior = self.state;
        if prior.accrual_block == current_block {
            return Ok(None);
        }
        let delta = current_block
            .checked_sub(prior.accrual_block)
            .ok_or(MathError::Underflow)?;

        let borrow_rate =
            self.rate_model
                .borrow_rate(prior.cash, prior.total_borrows, prior.total_reserves)?;
        if borrow_rate.mantissa() > MAX_BORROW_RATE_MANTISSA {
            return Err(LedgerError::BorrowRateTooHigh(borrow_rate));
        }

        let simple_interest_factor = borrow_rate.mul_scalar(U256::from(delta))?;
        let interest_accumulated = simple_interest_factor.mul_scalar_truncate(prior.total_borrows)?;
        let total_borrows = interest_accumulated
            .checked_add(prior.total_borrows)
            .ok_or(MathError::Overflow)?;
        let total_reserves = self
            .params
            .reserve_factor
            .mul_scalar_truncate_add(interest_accumulated, prior.total_reserves)?;
        let borrow_index = simple_interest_factor
            .checked_mul(prior.borrow_index)?
            .checked_add(prior.borrow_index)?;

        self.state = LedgerState {
            total_borrows,
            total_reserves,
            borrow_index,
            accrual_block: current_block,
            ..prior
        };

        trace!(
            market = %self.market,
            block = current_block,
            delta,
            %interest_accumulated,
            %borrow_index,
            "Interest accrued"
        );

        Ok(Some(Event::AccrueInterest {
            market: self.market,
            cash_prior: prior.cash,
            interest_accumulated,
            borrow_index,
            total_borrows,
        }))
    }

    /// `(cash + totalBorrows - totalReserves) / totalSupply`, or the initial
    /// rate while nothing is supplied.
    pub fn exchange_rate(&self) -> MathResult<Exp> {
        let s = &self.state;
        if s.total_supply.is_zero() {
            return Ok(self.params.initial_exchange_rate);
        }
        let backing = s
            .cash
            .checked_add(s.total_borrows)
            .ok_or(MathError::Overflow)?
            .checked_sub(s.total_reserves)
            .ok_or(MathError::Underflow)?;
        Exp::from_ratio(backing, s.total_supply)
    }

    /// Interest-bearing tokens held by `account`.
    pub fn balance_of(&self, account: &Account) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    /// Tokens `spender` may still move out of `owner`'s balance.
    pub fn allowance(&self, owner: &Account, spender: &Account) -> U256 {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or_default()
    }

    /// Stored principal and interest index; zeroed for accounts with no debt.
    pub fn borrow_snapshot(&self, account: &Account) -> BorrowSnapshot {
        self.borrows.get(account).copied().unwrap_or_default()
    }

    /// Owed amount at the last accrual: `principal * borrowIndex / interestIndex`.
    pub fn borrow_balance(&self, account: &Account) -> MathResult<U256> {
        let snapshot = self.borrow_snapshot(account);
        if snapshot.principal.is_zero() {
            return Ok(U256::ZERO);
        }
        let scaled = snapshot
            .principal
            .checked_mul(self.state.borrow_index.mantissa())
            .ok_or(MathError::Overflow)?;
        let index = snapshot.interest_index.mantissa();
        if index.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        Ok(scaled / index)
    }

    /// Tokens, debt and exchange rate as the risk engine reads them.
    pub fn account_snapshot(&self, account: &Account) -> MathResult<AccountSnapshot> {
        Ok(AccountSnapshot {
            tokens: self.balance_of(account),
            borrow_balance: self.borrow_balance(account)?,
            exchange_rate: self.exchange_rate()?,
        })
    }

    /// Borrow rate for the current cash, borrows and reserves.
    pub fn borrow_rate_per_block(&self) -> LedgerResult<Exp> {
        let s = &self.state;
        Ok(self
            .rate_model
            .borrow_rate(s.cash, s.total_borrows, s.total_reserves)?)
    }

    /// Supply rate net of the reserve factor.
    pub fn supply_rate_per_block(&self) -> LedgerResult<Exp> {
        let s = &self.state;
        Ok(self.rate_model.supply_rate(
            s.cash,
            s.total_borrows,
            s.total_reserves,
            self.params.reserve_factor,
        )?)
    }

    /// Grant `spender` an allowance over `owner`'s tokens. `U256::MAX` never
    /// decreases.
    pub fn approve(&mut self, owner: Account, spender: Account, amount: U256) -> Event {
        self.allowances.insert((owner, spender), amount);
        Event::Approval {
            market: self.market,
            owner,
            spender,
            amount,
        }
    }

    /// Replace the reserve factor; must not exceed one.
    pub fn set_reserve_factor(&mut self, new: Exp) -> LedgerResult<Event> {
        validate_reserve_factor(new)?;
        let old = self.params.reserve_factor;
        self.params.reserve_factor = new;
        info!(market = %self.market, %old, %new, "Reserve factor updated");
        Ok(Event::NewReserveFactor {
            market: self.market,
            old,
            new,
        })
    }

    /// Swap the rate model. Callers accrue with the old model first.
    pub fn set_interest_rate_model(&mut self, model: Arc<dyn InterestRateModel>) -> Event {
        let old = self.rate_model.name().to_string();
        let new = model.name().to_string();
        self.rate_model = model;
        info!(market = %self.market, %old, %new, "Interest rate model updated");
        Event::NewMarketInterestRateModel {
            market: self.market,
            old,
            new,
        }
    }
}

fn validate_reserve_factor(factor: Exp) -> LedgerResult<()> {
    if factor > Exp::ONE {
        return Err(LedgerError::InvalidParameter(format!(
            "reserve factor {factor} above 1"
        )));
    }
    Ok(())
}
