//! Two-market deployment shared by the integration suites.
//!
//! - vUSDC: price 1, collateral factor 0.8
//! - vETH: price 2000, collateral factor 0.5
//!
//! Close factor 0.5, liquidation incentive 1.1. Every account is funded and
//! has approved both custodians.

use moneta_core::{Account, Address, Exp, MarketId, U256};
use moneta_interfaces::{FixedRateModel, MemoryAsset, SimplePriceOracle};
use moneta_ledger::{LedgerParams, LedgerState};
use moneta_protocol::Protocol;
use rust_decimal::Decimal;
use std::sync::Arc;

pub fn u(n: u64) -> U256 {
    U256::from(n)
}

pub fn exp(d: Decimal) -> Exp {
    Exp::from_decimal(d).unwrap()
}

pub fn admin() -> Account {
    Address::with_last_byte(0xad)
}

/// USDC supplier.
pub fn alice() -> Account {
    Address::with_last_byte(0xa1)
}

/// ETH collateral, USDC debt.
pub fn bob() -> Account {
    Address::with_last_byte(0xb0)
}

/// Liquidator.
pub fn carol() -> Account {
    Address::with_last_byte(0xc0)
}

pub fn usdc_id() -> MarketId {
    MarketId::from_byte(0x01)
}

pub fn eth_id() -> MarketId {
    MarketId::from_byte(0x02)
}

pub struct Fixture {
    pub protocol: Protocol,
    pub oracle: Arc<SimplePriceOracle>,
    pub usdc: MemoryAsset,
    pub eth: MemoryAsset,
}

impl Fixture {
    /// Interest-free markets.
    pub fn new() -> Self {
        Self::with_rate(Exp::ZERO)
    }

    /// Both markets borrow at a fixed `rate_per_block`.
    pub fn with_rate(rate_per_block: Exp) -> Self {
        let oracle = Arc::new(SimplePriceOracle::new("fixture"));
        let mut protocol = Protocol::new(admin(), oracle.clone(), 100);
        let usdc = MemoryAsset::new("USDC", usdc_id().address());
        let eth = MemoryAsset::new("ETH", eth_id().address());

        for (id, symbol, token) in [(usdc_id(), "vUSDC", &usdc), (eth_id(), "vETH", &eth)] {
            protocol
                .deploy_market(
                    &admin(),
                    id,
                    symbol,
                    LedgerParams::default(),
                    Arc::new(FixedRateModel::new(rate_per_block)),
                    Box::new(token.clone()),
                )
                .unwrap();
            protocol.support_market(&admin(), id).unwrap();
        }

        oracle.set_price(usdc_id(), Exp::ONE);
        oracle.set_price(eth_id(), Exp::from_integer(2000));
        protocol
            .set_collateral_factor(&admin(), usdc_id(), exp(Decimal::new(8, 1)))
            .unwrap();
        protocol
            .set_collateral_factor(&admin(), eth_id(), exp(Decimal::new(5, 1)))
            .unwrap();
        protocol
            .set_close_factor(&admin(), exp(Decimal::new(5, 1)))
            .unwrap();
        protocol
            .set_liquidation_incentive(&admin(), exp(Decimal::new(11, 1)))
            .unwrap();

        for account in [alice(), bob(), carol()] {
            usdc.faucet(account, u(100_000)).unwrap();
            eth.faucet(account, u(100)).unwrap();
            usdc.approve(account, usdc_id().address(), U256::MAX);
            eth.approve(account, eth_id().address(), U256::MAX);
        }
        protocol.take_events();

        Self {
            protocol,
            oracle,
            usdc,
            eth,
        }
    }

    /// Alice supplies 50,000 USDC; bob supplies 10 ETH and borrows 9,000 USDC
    /// against 10,000 of borrowing power.
    pub fn seed_borrow(&mut self) {
        self.protocol.mint(alice(), usdc_id(), u(50_000)).unwrap();
        self.protocol.mint(bob(), eth_id(), u(10)).unwrap();
        self.protocol.enter_markets(bob(), &[eth_id()]).unwrap();
        self.protocol.borrow(bob(), usdc_id(), u(9_000)).unwrap();
    }

    /// Reprice ETH, putting bob in shortfall below 1800.
    pub fn set_eth_price(&self, price: u64) {
        self.oracle.set_price(eth_id(), Exp::from_integer(price));
    }

    pub fn state(&self, market: MarketId) -> LedgerState {
        self.protocol.registry().ledger(&market).unwrap().state()
    }

    pub fn tokens(&self, market: MarketId, account: Account) -> U256 {
        self.protocol.balance_of(&market, &account).unwrap()
    }

    pub fn debt(&self, market: MarketId, account: Account) -> U256 {
        self.protocol
            .borrow_balance_stored(&market, &account)
            .unwrap()
    }
}
