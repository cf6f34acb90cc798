//! Admin authority integration tests.
//!
//! Tests the admin surface:
//! - Refusal of every setter for non-admins, with no state change
//! - Two-step admin handover
//! - Whole-snapshot parameter updates
//! - Reserve management

mod integration;
use integration::common::fixture::*;

use moneta_core::{Event, MarketId, U256};
use moneta_interfaces::{FixedRateModel, MemoryAsset, UnderlyingAsset};
use moneta_ledger::{LedgerError, LedgerParams};
use moneta_protocol::ProtocolError;
use moneta_risk::RiskError;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn unauthorized<T: std::fmt::Debug>(result: Result<T, ProtocolError>) {
    assert!(
        matches!(result, Err(ProtocolError::Risk(RiskError::Unauthorized))),
        "expected Unauthorized, got {result:?}"
    );
}

#[test]
fn test_non_admin_changes_nothing() {
    let mut fx = Fixture::new();
    let params = fx.protocol.risk().params();
    let policy = *fx.protocol.risk().market(&usdc_id()).unwrap();

    unauthorized(
        fx.protocol
            .set_collateral_factor(&alice(), usdc_id(), exp(dec!(0.1))),
    );
    unauthorized(fx.protocol.set_close_factor(&alice(), exp(dec!(0.9))));
    unauthorized(
        fx.protocol
            .set_liquidation_incentive(&alice(), exp(dec!(1.2))),
    );
    unauthorized(fx.protocol.set_max_assets(&alice(), 1));
    unauthorized(
        fx.protocol
            .set_market_borrow_caps(&alice(), &[(usdc_id(), u(1))]),
    );
    unauthorized(fx.protocol.set_incentivized(&alice(), usdc_id(), true));
    unauthorized(
        fx.protocol
            .set_reserve_factor(&alice(), usdc_id(), exp(dec!(0.2))),
    );
    unauthorized(fx.protocol.reduce_reserves(&alice(), usdc_id(), u(0)));
    unauthorized(fx.protocol.support_market(&alice(), MarketId::from_byte(9)));

    assert_eq!(fx.protocol.risk().params(), params);
    assert_eq!(*fx.protocol.risk().market(&usdc_id()).unwrap(), policy);
    assert!(fx.protocol.events().is_empty());
}

#[test]
fn test_admin_handover() {
    let mut fx = Fixture::new();
    fx.protocol
        .set_pending_admin(&admin(), Some(alice()))
        .unwrap();
    assert_eq!(fx.protocol.risk().pending_admin(), Some(alice()));

    unauthorized(fx.protocol.accept_admin(&bob()));
    assert_eq!(fx.protocol.risk().admin(), admin());

    fx.protocol.accept_admin(&alice()).unwrap();
    assert_eq!(fx.protocol.risk().admin(), alice());
    assert_eq!(fx.protocol.risk().pending_admin(), None);

    unauthorized(fx.protocol.set_protocol_paused(&admin(), true));
    fx.protocol.set_protocol_paused(&alice(), true).unwrap();
}

#[test]
fn test_apply_params_replaces_snapshot() {
    let mut fx = Fixture::new();
    let current = fx.protocol.risk().params();

    let mut next = (*current).clone();
    next.close_factor = exp(dec!(0.4));
    next.pause.protocol_paused = true;
    next.pause.borrow_paused.insert(eth_id());
    fx.protocol.apply_params(&admin(), next).unwrap();

    let applied = fx.protocol.risk().params();
    assert_eq!(applied.version, current.version + 1);
    assert_eq!(applied.close_factor, exp(dec!(0.4)));
    assert!(applied.pause.borrow_paused.contains(&eth_id()));
    assert_eq!(
        fx.protocol.mint(alice(), usdc_id(), u(1)),
        Err(ProtocolError::Risk(RiskError::ProtocolPaused))
    );

    // out-of-range snapshots are refused whole
    let mut bad = (*applied).clone();
    bad.close_factor = exp(dec!(0));
    bad.pause.protocol_paused = false;
    assert!(matches!(
        fx.protocol.apply_params(&admin(), bad),
        Err(ProtocolError::Risk(RiskError::InvalidParameter(_)))
    ));

    let mut unlisted = (*applied).clone();
    unlisted.pause.mint_paused.insert(MarketId::from_byte(9));
    assert_eq!(
        fx.protocol.apply_params(&admin(), unlisted),
        Err(ProtocolError::Risk(RiskError::MarketNotListed(
            MarketId::from_byte(9)
        )))
    );
    assert_eq!(fx.protocol.risk().params(), applied);
}

#[test]
fn test_market_must_be_deployed_before_listing() {
    let mut fx = Fixture::new();
    let dai = MarketId::from_byte(0x03);
    assert!(matches!(
        fx.protocol.support_market(&admin(), dai),
        Err(ProtocolError::Registry(_))
    ));
    assert!(!fx.protocol.risk().is_listed(&dai));

    let token = MemoryAsset::new("DAI", dai.address());
    fx.protocol
        .deploy_market(
            &admin(),
            dai,
            "vDAI",
            LedgerParams::default(),
            Arc::new(FixedRateModel::new(exp(dec!(0)))),
            Box::new(token.clone()),
        )
        .unwrap();

    // deployed but unlisted markets refuse deposits
    token.faucet(alice(), u(10)).unwrap();
    token.approve(alice(), dai.address(), U256::MAX);
    assert_eq!(
        fx.protocol.mint(alice(), dai, u(10)),
        Err(ProtocolError::Risk(RiskError::MarketNotListed(dai)))
    );

    fx.protocol.support_market(&admin(), dai).unwrap();
    assert_eq!(
        fx.protocol.support_market(&admin(), dai),
        Err(ProtocolError::Risk(RiskError::MarketAlreadyListed(dai)))
    );
    assert_eq!(fx.protocol.mint(alice(), dai, u(10)).unwrap(), u(10));
}

#[test]
fn test_reserves_flow() {
    let rate = exp(dec!(0.000001));
    let mut fx = Fixture::with_rate(rate);
    fx.protocol
        .set_reserve_factor(&admin(), usdc_id(), exp(dec!(0.5)))
        .unwrap();
    fx.seed_borrow();
    fx.protocol.advance_blocks(1_000).unwrap();
    fx.protocol.accrue_interest(usdc_id()).unwrap();

    // 9000 * 1e-3 interest, half of it reserved
    let state = fx.state(usdc_id());
    assert_eq!(state.total_borrows, u(9_009));
    assert_eq!(state.total_reserves, u(4));

    assert!(matches!(
        fx.protocol.reduce_reserves(&admin(), usdc_id(), u(5)),
        Err(ProtocolError::Ledger(LedgerError::InvalidAmount(_)))
    ));

    fx.protocol.add_reserves(carol(), usdc_id(), u(96)).unwrap();
    assert_eq!(fx.state(usdc_id()).total_reserves, u(100));

    fx.protocol
        .reduce_reserves(&admin(), usdc_id(), u(100))
        .unwrap();
    assert_eq!(fx.state(usdc_id()).total_reserves, u(0));
    assert_eq!(fx.usdc.balance_of(&admin()), u(100));
    assert_eq!(fx.state(usdc_id()).cash, fx.usdc.custody_balance());
    assert!(matches!(
        fx.protocol.events().last(),
        Some(Event::ReservesReduced { .. })
    ));
}
