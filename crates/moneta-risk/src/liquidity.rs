//! Account liquidity and liquidation sizing.
//!
//! Values are denominated in the oracle's price unit. For every entered market:
//! `collateral += tokens * exchangeRate * price * collateralFactor` and
//! `borrows += owed * price`. Any missing price fails the whole computation.

use crate::engine::RiskEngine;
use crate::error::{RiskError, RiskResult};
use alloy_primitives::{I256, U256};
use moneta_core::{Account, Exp, MarketId, MathError, SnapshotSource};
use serde::Serialize;
use tracing::trace;

/// Liquidity of an account: `liquidity = collateral - borrows`, and
/// `shortfall = max(0, borrows - collateral)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccountLiquidity {
    pub liquidity: I256,
    pub shortfall: U256,
}

impl AccountLiquidity {
    fn from_sums(collateral: U256, borrows: U256) -> RiskResult<Self> {
        let to_signed = |v: U256| I256::try_from(v).map_err(|_| MathError::Conversion);
        if collateral >= borrows {
            Ok(Self {
                liquidity: to_signed(collateral - borrows)?,
                shortfall: U256::ZERO,
            })
        } else {
            let shortfall = borrows - collateral;
            let liquidity = to_signed(shortfall)?
                .checked_neg()
                .ok_or(MathError::Overflow)?;
            Ok(Self {
                liquidity,
                shortfall,
            })
        }
    }

    pub fn has_shortfall(&self) -> bool {
        !self.shortfall.is_zero()
    }
}

fn add(a: U256, b: U256) -> RiskResult<U256> {
    Ok(a.checked_add(b).ok_or(MathError::Overflow)?)
}

impl RiskEngine {
    pub fn get_account_liquidity(
        &self,
        source: &dyn SnapshotSource,
        account: &Account,
    ) -> RiskResult<AccountLiquidity> {
        self.get_hypothetical_account_liquidity(source, account, None, U256::ZERO, U256::ZERO)
    }

    /// Liquidity as if `account` redeemed `redeem_tokens` of, and borrowed
    /// `borrow_amount` from, `modify`. A market being borrowed from for the
    /// first time counts as entered.
    pub fn get_hypothetical_account_liquidity(
        &self,
        source: &dyn SnapshotSource,
        account: &Account,
        modify: Option<MarketId>,
        redeem_tokens: U256,
        borrow_amount: U256,
    ) -> RiskResult<AccountLiquidity> {
        let mut assets: Vec<MarketId> = self.assets_in(account).to_vec();
        if let Some(market) = modify {
            if !borrow_amount.is_zero() && !assets.contains(&market) {
                assets.push(market);
            }
        }

        let mut sum_collateral = U256::ZERO;
        let mut sum_borrow_plus_effects = U256::ZERO;

        for market in &assets {
            let snapshot = source
                .account_snapshot(market, account)?
                .ok_or(RiskError::MarketNotDeployed(*market))?;
            let collateral_factor = self
                .markets
                .get(market)
                .map(|m| m.collateral_factor)
                .unwrap_or(Exp::ZERO);
            let price = self.oracle.price(market)?;

            let tokens_to_denom = collateral_factor
                .checked_mul(snapshot.exchange_rate)?
                .checked_mul(price)?;

            sum_collateral =
                tokens_to_denom.mul_scalar_truncate_add(snapshot.tokens, sum_collateral)?;
            sum_borrow_plus_effects =
                price.mul_scalar_truncate_add(snapshot.borrow_balance, sum_borrow_plus_effects)?;

            if modify == Some(*market) {
                sum_borrow_plus_effects = add(
                    sum_borrow_plus_effects,
                    tokens_to_denom.mul_scalar_truncate(redeem_tokens)?,
                )?;
                sum_borrow_plus_effects =
                    price.mul_scalar_truncate_add(borrow_amount, sum_borrow_plus_effects)?;
            }
        }

        trace!(
            %account,
            %sum_collateral,
            %sum_borrow_plus_effects,
            "Account liquidity computed"
        );
        AccountLiquidity::from_sums(sum_collateral, sum_borrow_plus_effects)
    }

    /// Collateral tokens to seize for repaying `repay_amount` of `borrowed`:
    /// `repay * incentive * priceBorrowed / (priceCollateral * exchangeRateCollateral)`.
    pub fn liquidate_calculate_seize_tokens(
        &self,
        source: &dyn SnapshotSource,
        borrowed: &MarketId,
        collateral: &MarketId,
        repay_amount: U256,
    ) -> RiskResult<U256> {
        let price_borrowed = self.oracle.price(borrowed)?;
        let price_collateral = self.oracle.price(collateral)?;
        let exchange_rate = source
            .exchange_rate(collateral)?
            .ok_or(RiskError::MarketNotDeployed(*collateral))?;

        let numerator = self
            .params
            .liquidation_incentive
            .checked_mul(price_borrowed)?;
        let denominator = price_collateral.checked_mul(exchange_rate)?;
        let ratio = numerator.checked_div(denominator)?;

        Ok(ratio.mul_scalar_truncate(repay_amount)?)
    }
}
