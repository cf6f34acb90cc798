//! Accounting invariant integration tests.
//!
//! Runs a mixed workload over interest-bearing markets and checks, after
//! every step:
//! - Ledger cash matches the custody balance of the underlying token
//! - The exchange rate equals backing over supply
//! - The borrow index never decreases
//!
//! and that refused operations leave no state or events behind.

mod integration;
use integration::common::fixture::*;

use moneta_core::{Exp, MarketId, U256};
use moneta_interfaces::UnderlyingAsset;
use moneta_protocol::ProtocolError;
use moneta_risk::RiskError;
use rust_decimal_macros::dec;

fn check_market(fx: &Fixture, market: MarketId, last_index: &mut Exp) {
    let state = fx.state(market);
    let custody = if market == usdc_id() {
        fx.usdc.custody_balance()
    } else {
        fx.eth.custody_balance()
    };
    assert_eq!(state.cash, custody, "cash drifted from custody");

    if !state.total_supply.is_zero() {
        let backing = state.cash + state.total_borrows - state.total_reserves;
        let expected = Exp::from_ratio(backing, state.total_supply).unwrap();
        assert_eq!(fx.protocol.exchange_rate_stored(&market).unwrap(), expected);
    }

    assert!(state.borrow_index >= *last_index, "borrow index decreased");
    *last_index = state.borrow_index;
}

#[test]
fn test_invariants_hold_across_workload() {
    let mut fx = Fixture::with_rate(exp(dec!(0.000002)));
    fx.protocol
        .set_reserve_factor(&admin(), usdc_id(), exp(dec!(0.1)))
        .unwrap();
    let mut usdc_index = Exp::ONE;
    let mut eth_index = Exp::ONE;

    fx.seed_borrow();
    check_market(&fx, usdc_id(), &mut usdc_index);
    check_market(&fx, eth_id(), &mut eth_index);

    for round in 0..5u64 {
        fx.protocol.advance_blocks(250).unwrap();
        match round % 3 {
            0 => {
                fx.protocol.mint(carol(), usdc_id(), u(1_000)).unwrap();
            }
            1 => {
                fx.protocol.repay_borrow(bob(), usdc_id(), u(500)).unwrap();
            }
            _ => {
                fx.protocol
                    .redeem_underlying(alice(), usdc_id(), u(700))
                    .unwrap();
            }
        }
        fx.protocol.accrue_interest(eth_id()).unwrap();
        check_market(&fx, usdc_id(), &mut usdc_index);
        check_market(&fx, eth_id(), &mut eth_index);
    }

    assert!(usdc_index > Exp::ONE);
    assert!(eth_index > Exp::ONE);

    // the stored balance lags until the market accrues again
    fx.protocol.advance_blocks(100).unwrap();
    let stored = fx.debt(usdc_id(), bob());
    let current = fx
        .protocol
        .borrow_balance_current(usdc_id(), bob())
        .unwrap();
    assert!(current > stored);
    check_market(&fx, usdc_id(), &mut usdc_index);
}

#[test]
fn test_refusal_rolls_back_accrual_and_events() {
    let mut fx = Fixture::with_rate(exp(dec!(0.000002)));
    fx.seed_borrow();
    fx.protocol.advance_blocks(500).unwrap();

    let before = fx.state(usdc_id());
    let events = fx.protocol.events().len();

    assert_eq!(
        fx.protocol.borrow(bob(), usdc_id(), u(5_000)),
        Err(ProtocolError::Risk(RiskError::InsufficientLiquidity))
    );
    assert_eq!(fx.state(usdc_id()), before);
    assert_eq!(fx.state(usdc_id()).accrual_block, 100);
    assert_eq!(fx.protocol.events().len(), events);

    // a committed call accrues and records the interest first
    fx.protocol.borrow(bob(), usdc_id(), u(100)).unwrap();
    let names: Vec<_> = fx.protocol.events()[events..]
        .iter()
        .map(|e| e.name())
        .collect();
    assert_eq!(names, vec!["AccrueInterest", "Borrow"]);
    assert_eq!(fx.state(usdc_id()).accrual_block, 600);
}

#[test]
fn test_redeem_blocked_by_outstanding_debt() {
    let mut fx = Fixture::new();
    fx.seed_borrow();

    // 9000 owed against 10 ETH at 0.5: one token backs 1000 of power
    assert_eq!(
        fx.protocol.redeem(bob(), eth_id(), u(2)),
        Err(ProtocolError::Risk(RiskError::InsufficientLiquidity))
    );
    assert_eq!(fx.protocol.redeem(bob(), eth_id(), u(1)).unwrap(), u(1));

    // collateral also cannot leave by transfer
    assert_eq!(
        fx.protocol.transfer(bob(), carol(), eth_id(), u(1)),
        Err(ProtocolError::Risk(RiskError::InsufficientLiquidity))
    );
    assert_eq!(fx.tokens(eth_id(), bob()), u(9));

    // and the market cannot be exited while it holds collateral
    assert_eq!(
        fx.protocol.exit_market(bob(), eth_id()),
        Err(ProtocolError::Risk(RiskError::NonzeroBalance(eth_id())))
    );
    assert!(fx.protocol.risk().check_membership(&bob(), &eth_id()));
}

#[test]
fn test_repay_max_clears_debt() {
    let mut fx = Fixture::with_rate(exp(dec!(0.000002)));
    fx.seed_borrow();
    fx.protocol.advance_blocks(1_000).unwrap();

    let repaid = fx
        .protocol
        .repay_borrow(bob(), usdc_id(), U256::MAX)
        .unwrap();
    // 9000 * (1 + 2e-6 * 1000)
    assert_eq!(repaid, u(9_018));
    assert_eq!(fx.debt(usdc_id(), bob()), u(0));
    assert_eq!(fx.state(usdc_id()).total_borrows, u(0));

    // debt-free, so the collateral can leave and the market be exited
    assert_eq!(fx.protocol.redeem(bob(), eth_id(), u(10)).unwrap(), u(10));
    fx.protocol.exit_market(bob(), eth_id()).unwrap();
    assert!(!fx.protocol.risk().check_membership(&bob(), &eth_id()));
}

#[test]
fn test_mint_then_redeem_returns_deposit() {
    let mut fx = Fixture::new();
    fx.seed_borrow();
    let before = fx.state(usdc_id());
    let carol_usdc = fx.usdc.balance_of(&carol());

    let tokens = fx.protocol.mint(carol(), usdc_id(), u(1_234)).unwrap();
    let amount = fx.protocol.redeem(carol(), usdc_id(), tokens).unwrap();

    assert_eq!(amount, u(1_234));
    assert_eq!(fx.usdc.balance_of(&carol()), carol_usdc);
    let after = fx.state(usdc_id());
    assert_eq!(after.total_supply, before.total_supply);
    assert_eq!(after.total_borrows, before.total_borrows);
}

#[test]
fn test_no_entered_markets_means_no_liquidity() {
    let mut fx = Fixture::new();
    fx.protocol.mint(alice(), usdc_id(), u(50_000)).unwrap();

    let liquidity = fx.protocol.account_liquidity(&alice()).unwrap();
    assert!(liquidity.liquidity.is_zero());
    assert_eq!(liquidity.shortfall, u(0));
}
