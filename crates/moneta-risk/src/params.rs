//! Risk parameters and per-market policy.

use crate::error::{RiskError, RiskResult};
use alloy_primitives::U256;
use moneta_core::{Action, Exp, MarketId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Highest collateral factor a market may have: 0.9.
pub const COLLATERAL_FACTOR_MAX: Exp =
    Exp::from_mantissa(U256::from_limbs([900_000_000_000_000_000, 0, 0, 0]));

/// Close factor upper bound (inclusive): 1.
pub const CLOSE_FACTOR_MAX: Exp = Exp::ONE;

/// Liquidation incentive upper bound (inclusive): 1.5.
pub const LIQUIDATION_INCENTIVE_MAX: Exp =
    Exp::from_mantissa(U256::from_limbs([1_500_000_000_000_000_000, 0, 0, 0]));

/// Policy record of a listed market. Never deleted once listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPolicy {
    pub is_listed: bool,
    pub collateral_factor: Exp,
    pub is_incentivized: bool,
    /// Zero means uncapped.
    pub borrow_cap: U256,
}

impl MarketPolicy {
    pub fn listed() -> Self {
        Self {
            is_listed: true,
            collateral_factor: Exp::ZERO,
            is_incentivized: false,
            borrow_cap: U256::ZERO,
        }
    }
}

/// Pause switches. All off initially; only the admin flips them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseState {
    pub protocol_paused: bool,
    #[serde(default)]
    pub mint_paused: BTreeSet<MarketId>,
    #[serde(default)]
    pub borrow_paused: BTreeSet<MarketId>,
    #[serde(default)]
    pub transfer_paused: bool,
    #[serde(default)]
    pub seize_paused: bool,
}

impl PauseState {
    /// Per-action switch for `action` on `market`.
    pub fn is_action_paused(&self, action: Action, market: &MarketId) -> bool {
        match action {
            Action::Mint => self.mint_paused.contains(market),
            Action::Borrow => self.borrow_paused.contains(market),
            Action::Transfer => self.transfer_paused,
            Action::Seize => self.seize_paused,
        }
    }

    fn markets(&self) -> impl Iterator<Item = &MarketId> {
        self.mint_paused.iter().chain(self.borrow_paused.iter())
    }
}

/// Global risk parameters.
///
/// Held behind an `Arc` by the engine and replaced copy-on-write; `version`
/// increases on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskParams {
    pub version: u64,
    pub close_factor: Exp,
    pub liquidation_incentive: Exp,
    pub max_assets: usize,
    pub pause: PauseState,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            version: 0,
            close_factor: Exp::from_mantissa(U256::from_limbs([51_000_000_000_000_000, 0, 0, 0])),
            liquidation_incentive: Exp::ONE,
            max_assets: 10,
            pause: PauseState::default(),
        }
    }
}

impl RiskParams {
    /// Check every bound. Pause entries must name listed markets, judged by
    /// `is_listed`.
    pub fn validate(&self, is_listed: impl Fn(&MarketId) -> bool) -> RiskResult<()> {
        validate_close_factor(self.close_factor)?;
        validate_liquidation_incentive(self.liquidation_incentive)?;
        validate_max_assets(self.max_assets)?;
        if let Some(market) = self.pause.markets().find(|m| !is_listed(m)) {
            return Err(RiskError::MarketNotListed(*market));
        }
        Ok(())
    }
}

pub(crate) fn validate_close_factor(value: Exp) -> RiskResult<()> {
    if value.is_zero() || value > CLOSE_FACTOR_MAX {
        return Err(RiskError::InvalidParameter(format!(
            "close factor {value} outside (0, 1]"
        )));
    }
    Ok(())
}

pub(crate) fn validate_liquidation_incentive(value: Exp) -> RiskResult<()> {
    if value < Exp::ONE || value > LIQUIDATION_INCENTIVE_MAX {
        return Err(RiskError::InvalidParameter(format!(
            "liquidation incentive {value} outside [1, 1.5]"
        )));
    }
    Ok(())
}

pub(crate) fn validate_max_assets(value: usize) -> RiskResult<()> {
    if value == 0 {
        return Err(RiskError::InvalidParameter(
            "max assets must be at least 1".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_collateral_factor(value: Exp) -> RiskResult<()> {
    if value > COLLATERAL_FACTOR_MAX {
        return Err(RiskError::InvalidParameter(format!(
            "collateral factor {value} above 0.9"
        )));
    }
    Ok(())
}
