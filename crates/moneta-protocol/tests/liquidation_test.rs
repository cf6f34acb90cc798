//! Liquidation integration tests.
//!
//! Tests the liquidation path:
//! - Preconditions (shortfall, close factor, self-liquidation)
//! - Seizure across two markets and within one market
//! - All-or-nothing behavior when a late step fails

mod integration;
use integration::common::fixture::*;

use moneta_core::{Action, Event, Exp, PauseTarget, U256};
use moneta_interfaces::{InterfaceError, UnderlyingAsset};
use moneta_protocol::ProtocolError;
use moneta_risk::RiskError;
use rust_decimal_macros::dec;

#[test]
fn test_liquidation_requires_shortfall() {
    let mut fx = Fixture::new();
    fx.seed_borrow();

    assert_eq!(
        fx.protocol
            .liquidate_borrow(carol(), bob(), usdc_id(), u(3_000), eth_id()),
        Err(ProtocolError::Risk(RiskError::InsufficientShortfall))
    );
}

#[test]
fn test_liquidation_bounded_by_close_factor() {
    let mut fx = Fixture::new();
    fx.seed_borrow();
    fx.set_eth_price(1_500);

    // close factor 0.5 of 9000 owed
    assert_eq!(
        fx.protocol
            .liquidate_borrow(carol(), bob(), usdc_id(), u(4_501), eth_id()),
        Err(ProtocolError::Risk(RiskError::TooMuchRepay))
    );
    assert_eq!(
        fx.protocol
            .liquidate_borrow(bob(), bob(), usdc_id(), u(1_000), eth_id()),
        Err(ProtocolError::Risk(RiskError::LiquidatorIsBorrower))
    );
    assert_eq!(
        fx.protocol
            .liquidate_borrow(carol(), bob(), usdc_id(), u(0), eth_id()),
        Err(ProtocolError::Risk(RiskError::TooLittleRepay))
    );
    fx.protocol
        .liquidate_borrow(carol(), bob(), usdc_id(), u(4_500), eth_id())
        .unwrap();
    assert_eq!(fx.debt(usdc_id(), bob()), u(4_500));
}

#[test]
fn test_cross_market_liquidation() {
    let mut fx = Fixture::new();
    fx.seed_borrow();
    fx.set_eth_price(1_500);

    let carol_usdc = fx.usdc.balance_of(&carol());
    let before = fx.protocol.events().len();

    // 3000 * 1.1 / 1500 = 2.2, floored
    let seized = fx
        .protocol
        .liquidate_borrow(carol(), bob(), usdc_id(), u(3_000), eth_id())
        .unwrap();
    assert_eq!(seized, u(2));

    assert_eq!(fx.debt(usdc_id(), bob()), u(6_000));
    assert_eq!(fx.tokens(eth_id(), bob()), u(8));
    assert_eq!(fx.tokens(eth_id(), carol()), u(2));
    assert_eq!(fx.usdc.balance_of(&carol()), carol_usdc - u(3_000));
    assert_eq!(fx.state(usdc_id()).total_borrows, u(6_000));
    assert_eq!(fx.state(usdc_id()).cash, u(44_000));

    let names: Vec<_> = fx.protocol.events()[before..]
        .iter()
        .map(|e| e.name())
        .collect();
    assert_eq!(names, vec!["RepayBorrow", "Transfer", "LiquidateBorrow"]);
}

#[test]
fn test_same_market_liquidation() {
    let mut fx = Fixture::new();
    fx.protocol.mint(carol(), usdc_id(), u(1_000)).unwrap();
    fx.protocol.enter_markets(carol(), &[usdc_id()]).unwrap();
    fx.protocol.borrow(carol(), usdc_id(), u(800)).unwrap();

    fx.protocol
        .set_collateral_factor(&admin(), usdc_id(), exp(dec!(0.5)))
        .unwrap();
    let liquidity = fx.protocol.account_liquidity(&carol()).unwrap();
    assert_eq!(liquidity.shortfall, u(300));

    // 400 * 1.1 at an exchange rate of 1
    let seized = fx
        .protocol
        .liquidate_borrow(alice(), carol(), usdc_id(), u(400), usdc_id())
        .unwrap();
    assert_eq!(seized, u(440));
    assert_eq!(fx.tokens(usdc_id(), carol()), u(560));
    assert_eq!(fx.tokens(usdc_id(), alice()), u(440));
    assert_eq!(fx.debt(usdc_id(), carol()), u(400));
    assert_eq!(fx.state(usdc_id()).cash, fx.usdc.custody_balance());
}

#[test]
fn test_seize_pause_rolls_back_liquidation() {
    let rate = Exp::from_mantissa(U256::from(1_000_000_000_000u64));
    let mut fx = Fixture::with_rate(rate);
    fx.seed_borrow();
    fx.set_eth_price(1_500);
    fx.protocol
        .set_action_paused(&admin(), PauseTarget::Seize, true)
        .unwrap();
    fx.protocol.advance_blocks(1_000).unwrap();

    let usdc_state = fx.state(usdc_id());
    let eth_state = fx.state(eth_id());
    let events = fx.protocol.events().len();
    let carol_usdc = fx.usdc.balance_of(&carol());

    assert_eq!(
        fx.protocol
            .liquidate_borrow(carol(), bob(), usdc_id(), u(3_000), eth_id()),
        Err(ProtocolError::Risk(RiskError::ActionPaused {
            action: Action::Seize,
            market: None,
        }))
    );

    // accrual done inside the refused call is undone too
    assert_eq!(fx.state(usdc_id()), usdc_state);
    assert_eq!(fx.state(eth_id()), eth_state);
    assert_eq!(fx.protocol.events().len(), events);
    assert_eq!(fx.usdc.balance_of(&carol()), carol_usdc);
    assert_eq!(fx.tokens(eth_id(), bob()), u(10));
}

#[test]
fn test_failed_transfer_rolls_back_liquidation() {
    let rate = Exp::from_mantissa(U256::from(1_000_000_000_000u64));
    let mut fx = Fixture::with_rate(rate);
    fx.seed_borrow();
    fx.set_eth_price(1_500);
    fx.protocol.advance_blocks(1_000).unwrap();

    let usdc_state = fx.state(usdc_id());
    let eth_state = fx.state(eth_id());
    let events = fx.protocol.events().len();

    fx.usdc.set_fail_transfers(true);
    let result = fx
        .protocol
        .liquidate_borrow(carol(), bob(), usdc_id(), u(3_000), eth_id());
    assert!(matches!(
        result,
        Err(ProtocolError::Asset(InterfaceError::TransferFailed(_)))
    ));

    assert_eq!(fx.state(usdc_id()), usdc_state);
    assert_eq!(fx.state(eth_id()), eth_state);
    assert_eq!(fx.tokens(eth_id(), bob()), u(10));
    assert_eq!(fx.tokens(eth_id(), carol()), u(0));
    assert_eq!(fx.protocol.events().len(), events);

    // same call goes through once the token behaves
    fx.usdc.set_fail_transfers(false);
    fx.protocol
        .liquidate_borrow(carol(), bob(), usdc_id(), u(3_000), eth_id())
        .unwrap();
    let tail = fx.protocol.events().last().cloned();
    assert!(matches!(tail, Some(Event::LiquidateBorrow { .. })));
    assert_eq!(fx.state(usdc_id()).accrual_block, fx.protocol.block_number());
}
