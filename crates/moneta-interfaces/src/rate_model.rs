//! Interest-rate curves.
//!
//! A rate model is a pure function of a market's cash, borrows and reserves.
//! Rates are per block; constructors take per-year figures and divide by
//! `BLOCKS_PER_YEAR`.

use crate::error::{InterfaceError, InterfaceResult};
use alloy_primitives::U256;
use moneta_core::{Exp, MathError};

/// Blocks per year at a 3 second block time.
pub const BLOCKS_PER_YEAR: u64 = 10_512_000;

/// Pluggable borrow/supply rate curve.
pub trait InterestRateModel: Send + Sync {
    /// Human-readable identity, reported in `NewMarketInterestRateModel` events.
    fn name(&self) -> &str;

    /// Borrow rate per block.
    fn borrow_rate(&self, cash: U256, borrows: U256, reserves: U256) -> InterfaceResult<Exp>;

    /// Supply rate per block: `utilization * borrowRate * (1 - reserveFactor)`.
    fn supply_rate(
        &self,
        cash: U256,
        borrows: U256,
        reserves: U256,
        reserve_factor: Exp,
    ) -> InterfaceResult<Exp> {
        let one_minus_rf = Exp::ONE.checked_sub(reserve_factor)?;
        let borrow_rate = self.borrow_rate(cash, borrows, reserves)?;
        let rate_to_pool = borrow_rate.checked_mul(one_minus_rf)?;
        Ok(utilization_rate(cash, borrows, reserves)?.checked_mul(rate_to_pool)?)
    }

    /// `(borrowRatePerBlock, supplyRatePerBlock)`.
    fn rates(
        &self,
        cash: U256,
        borrows: U256,
        reserves: U256,
        reserve_factor: Exp,
    ) -> InterfaceResult<(Exp, Exp)> {
        Ok((
            self.borrow_rate(cash, borrows, reserves)?,
            self.supply_rate(cash, borrows, reserves, reserve_factor)?,
        ))
    }
}

/// `borrows / (cash + borrows - reserves)`, zero when nothing is borrowed.
pub fn utilization_rate(cash: U256, borrows: U256, reserves: U256) -> InterfaceResult<Exp> {
    if borrows.is_zero() {
        return Ok(Exp::ZERO);
    }
    let total = cash
        .checked_add(borrows)
        .ok_or(MathError::Overflow)?
        .checked_sub(reserves)
        .ok_or(MathError::Underflow)?;
    Ok(Exp::from_ratio(borrows, total)?)
}

fn per_block(per_year: Exp) -> Exp {
    Exp::from_mantissa(per_year.mantissa() / U256::from(BLOCKS_PER_YEAR))
}

/// Constant borrow rate, mostly for tests.
#[derive(Debug, Clone)]
pub struct FixedRateModel {
    rate_per_block: Exp,
}

impl FixedRateModel {
    pub fn new(rate_per_block: Exp) -> Self {
        Self { rate_per_block }
    }
}

impl InterestRateModel for FixedRateModel {
    fn name(&self) -> &str {
        "fixed"
    }

    fn borrow_rate(&self, _cash: U256, _borrows: U256, _reserves: U256) -> InterfaceResult<Exp> {
        Ok(self.rate_per_block)
    }
}

/// Linear curve: `base + utilization * multiplier`.
#[derive(Debug, Clone)]
pub struct WhitePaperRateModel {
    base_rate_per_block: Exp,
    multiplier_per_block: Exp,
}

impl WhitePaperRateModel {
    pub fn new(base_rate_per_year: Exp, multiplier_per_year: Exp) -> Self {
        Self {
            base_rate_per_block: per_block(base_rate_per_year),
            multiplier_per_block: per_block(multiplier_per_year),
        }
    }

    pub fn base_rate_per_block(&self) -> Exp {
        self.base_rate_per_block
    }

    pub fn multiplier_per_block(&self) -> Exp {
        self.multiplier_per_block
    }
}

impl InterestRateModel for WhitePaperRateModel {
    fn name(&self) -> &str {
        "white_paper"
    }

    fn borrow_rate(&self, cash: U256, borrows: U256, reserves: U256) -> InterfaceResult<Exp> {
        let ut = utilization_rate(cash, borrows, reserves)?;
        Ok(ut
            .checked_mul(self.multiplier_per_block)?
            .checked_add(self.base_rate_per_block)?)
    }
}

/// Kinked curve: linear up to `kink`, steeper `jump_multiplier` above it.
#[derive(Debug, Clone)]
pub struct JumpRateModel {
    base_rate_per_block: Exp,
    multiplier_per_block: Exp,
    jump_multiplier_per_block: Exp,
    kink: Exp,
}

impl JumpRateModel {
    pub fn new(
        base_rate_per_year: Exp,
        multiplier_per_year: Exp,
        jump_multiplier_per_year: Exp,
        kink: Exp,
    ) -> InterfaceResult<Self> {
        if kink > Exp::ONE {
            return Err(InterfaceError::InvalidParameter(format!(
                "kink {kink} above 1"
            )));
        }
        Ok(Self {
            base_rate_per_block: per_block(base_rate_per_year),
            multiplier_per_block: per_block(multiplier_per_year),
            jump_multiplier_per_block: per_block(jump_multiplier_per_year),
            kink,
        })
    }

    pub fn kink(&self) -> Exp {
        self.kink
    }
}

impl InterestRateModel for JumpRateModel {
    fn name(&self) -> &str {
        "jump_rate"
    }

    fn borrow_rate(&self, cash: U256, borrows: U256, reserves: U256) -> InterfaceResult<Exp> {
        let ut = utilization_rate(cash, borrows, reserves)?;
        let normal_at = |u: Exp| -> InterfaceResult<Exp> {
            Ok(u
                .checked_mul(self.multiplier_per_block)?
                .checked_add(self.base_rate_per_block)?)
        };

        if ut <= self.kink {
            return normal_at(ut);
        }
        let normal = normal_at(self.kink)?;
        let excess = ut.checked_sub(self.kink)?;
        Ok(excess
            .checked_mul(self.jump_multiplier_per_block)?
            .checked_add(normal)?)
    }
}
