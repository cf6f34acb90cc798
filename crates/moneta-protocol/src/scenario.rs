//! Building a deployment from config and replaying scripted steps.
//!
//! Refused steps are recorded and the run continues; only a malformed step
//! (unknown market, missing pause target) aborts it.

use crate::config::ProtocolConfig;
use crate::error::{ConfigError, ConfigResult, ProtocolResult};
use crate::protocol::Protocol;
use alloy_primitives::{Address, U256};
use moneta_core::{Action, BlockNumber, Event, Exp, MarketId, PauseTarget};
use moneta_interfaces::{MemoryAsset, SimplePriceOracle};
use moneta_ledger::LedgerParams;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// One scripted operation. Markets are named by symbol; admin steps run as
/// the configured admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Credit underlying to `account` and approve the market's custody.
    Faucet {
        account: Address,
        market: String,
        amount: u64,
    },
    AdvanceBlocks {
        blocks: u64,
    },
    SetPrice {
        market: String,
        price: Decimal,
    },
    Mint {
        account: Address,
        market: String,
        amount: u64,
    },
    Redeem {
        account: Address,
        market: String,
        tokens: u64,
    },
    RedeemUnderlying {
        account: Address,
        market: String,
        amount: u64,
    },
    Borrow {
        account: Address,
        market: String,
        amount: u64,
    },
    /// Omitting `amount` repays the whole debt.
    RepayBorrow {
        account: Address,
        market: String,
        #[serde(default)]
        amount: Option<u64>,
    },
    RepayBorrowBehalf {
        payer: Address,
        borrower: Address,
        market: String,
        #[serde(default)]
        amount: Option<u64>,
    },
    LiquidateBorrow {
        liquidator: Address,
        borrower: Address,
        market: String,
        amount: u64,
        collateral: String,
    },
    Transfer {
        from: Address,
        to: Address,
        market: String,
        tokens: u64,
    },
    EnterMarkets {
        account: Address,
        markets: Vec<String>,
    },
    ExitMarket {
        account: Address,
        market: String,
    },
    SetProtocolPaused {
        state: bool,
    },
    SetActionPaused {
        action: Action,
        #[serde(default)]
        market: Option<String>,
        state: bool,
    },
    SetCollateralFactor {
        market: String,
        factor: Decimal,
    },
    SetCloseFactor {
        factor: Decimal,
    },
    SetLiquidationIncentive {
        incentive: Decimal,
    },
    SetReserveFactor {
        market: String,
        factor: Decimal,
    },
    AddReserves {
        account: Address,
        market: String,
        amount: u64,
    },
    ReduceReserves {
        market: String,
        amount: u64,
    },
}

impl ScenarioStep {
    pub fn op(&self) -> &'static str {
        match self {
            ScenarioStep::Faucet { .. } => "faucet",
            ScenarioStep::AdvanceBlocks { .. } => "advance_blocks",
            ScenarioStep::SetPrice { .. } => "set_price",
            ScenarioStep::Mint { .. } => "mint",
            ScenarioStep::Redeem { .. } => "redeem",
            ScenarioStep::RedeemUnderlying { .. } => "redeem_underlying",
            ScenarioStep::Borrow { .. } => "borrow",
            ScenarioStep::RepayBorrow { .. } => "repay_borrow",
            ScenarioStep::RepayBorrowBehalf { .. } => "repay_borrow_behalf",
            ScenarioStep::LiquidateBorrow { .. } => "liquidate_borrow",
            ScenarioStep::Transfer { .. } => "transfer",
            ScenarioStep::EnterMarkets { .. } => "enter_markets",
            ScenarioStep::ExitMarket { .. } => "exit_market",
            ScenarioStep::SetProtocolPaused { .. } => "set_protocol_paused",
            ScenarioStep::SetActionPaused { .. } => "set_action_paused",
            ScenarioStep::SetCollateralFactor { .. } => "set_collateral_factor",
            ScenarioStep::SetCloseFactor { .. } => "set_close_factor",
            ScenarioStep::SetLiquidationIncentive { .. } => "set_liquidation_incentive",
            ScenarioStep::SetReserveFactor { .. } => "set_reserve_factor",
            ScenarioStep::AddReserves { .. } => "add_reserves",
            ScenarioStep::ReduceReserves { .. } => "reduce_reserves",
        }
    }
}

/// Result of one replayed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub op: &'static str,
    pub block: BlockNumber,
    pub committed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub events: Vec<Event>,
}

/// A protocol built from config, with handles on its oracle and tokens.
pub struct Deployment {
    pub protocol: Protocol,
    pub oracle: Arc<SimplePriceOracle>,
    pub tokens: BTreeMap<MarketId, MemoryAsset>,
    admin: Address,
    symbols: BTreeMap<String, MarketId>,
}

fn u(amount: u64) -> U256 {
    U256::from(amount)
}

impl Deployment {
    /// Deploy, list and configure every market, then drain the setup events.
    pub fn build(config: &ProtocolConfig) -> ConfigResult<(Self, Vec<Event>)> {
        let admin = config.admin;
        let oracle = Arc::new(SimplePriceOracle::new("config"));
        let mut protocol = Protocol::new(admin, oracle.clone(), config.start_block);

        protocol.set_close_factor(&admin, Exp::from_decimal(config.risk.close_factor)?)?;
        protocol.set_liquidation_incentive(
            &admin,
            Exp::from_decimal(config.risk.liquidation_incentive)?,
        )?;
        protocol.set_max_assets(&admin, config.risk.max_assets)?;

        let mut tokens = BTreeMap::new();
        let mut symbols = BTreeMap::new();
        for market in &config.markets {
            let token = MemoryAsset::new(market.underlying.clone(), market.id.address());
            let params = LedgerParams {
                reserve_factor: Exp::from_decimal(market.reserve_factor)?,
                initial_exchange_rate: Exp::from_decimal(market.initial_exchange_rate)?,
            };
            protocol.deploy_market(
                &admin,
                market.id,
                &market.symbol,
                params,
                market.rate_model.build()?,
                Box::new(token.clone()),
            )?;
            protocol.support_market(&admin, market.id)?;
            oracle.set_price(market.id, Exp::from_decimal(market.price)?);
            if !market.collateral_factor.is_zero() {
                protocol.set_collateral_factor(
                    &admin,
                    market.id,
                    Exp::from_decimal(market.collateral_factor)?,
                )?;
            }
            if market.borrow_cap > 0 {
                protocol.set_market_borrow_caps(&admin, &[(market.id, u(market.borrow_cap))])?;
            }
            info!(symbol = %market.symbol, market = %market.id, "Market configured");

            tokens.insert(market.id, token);
            symbols.insert(market.symbol.clone(), market.id);
        }

        let setup_events = protocol.take_events();
        Ok((
            Self {
                protocol,
                oracle,
                tokens,
                admin,
                symbols,
            },
            setup_events,
        ))
    }

    pub fn market_id(&self, symbol: &str) -> ConfigResult<MarketId> {
        self.symbols
            .get(symbol)
            .copied()
            .ok_or_else(|| ConfigError::UnknownMarket(symbol.to_string()))
    }

    fn token(&self, symbol: &str) -> ConfigResult<&MemoryAsset> {
        let market = self.market_id(symbol)?;
        self.tokens
            .get(&market)
            .ok_or_else(|| ConfigError::UnknownMarket(symbol.to_string()))
    }

    pub fn run(&mut self, steps: &[ScenarioStep]) -> ConfigResult<Vec<StepOutcome>> {
        steps
            .iter()
            .enumerate()
            .map(|(i, step)| self.run_step(i, step))
            .collect()
    }

    pub fn run_step(&mut self, index: usize, step: &ScenarioStep) -> ConfigResult<StepOutcome> {
        let result = self.dispatch(step)?;
        // the buffer is empty between steps; build drains the setup events
        let events = self.protocol.take_events();

        let outcome = StepOutcome {
            step: index,
            op: step.op(),
            block: self.protocol.block_number(),
            committed: result.is_ok(),
            reason: result.as_ref().err().map(|e| e.reason()),
            error: result.as_ref().err().map(|e| e.to_string()),
            events,
        };
        debug!(step = index, op = outcome.op, committed = outcome.committed, "Step replayed");
        Ok(outcome)
    }

    /// Outer error: malformed step. Inner error: the protocol refused it.
    fn dispatch(
        &mut self,
        step: &ScenarioStep,
    ) -> ConfigResult<ProtocolResult<()>> {
        let admin = self.admin;
        let result = match step {
            ScenarioStep::Faucet {
                account,
                market,
                amount,
            } => {
                let token = self.token(market)?;
                token.faucet(*account, u(*amount))?;
                token.approve(*account, token.custodian(), U256::MAX);
                Ok(())
            }
            ScenarioStep::AdvanceBlocks { blocks } => {
                self.protocol.advance_blocks(*blocks).map(|_| ())
            }
            ScenarioStep::SetPrice { market, price } => {
                self.oracle
                    .set_price(self.market_id(market)?, Exp::from_decimal(*price)?);
                Ok(())
            }
            ScenarioStep::Mint {
                account,
                market,
                amount,
            } => {
                let market = self.market_id(market)?;
                self.protocol.mint(*account, market, u(*amount)).map(|_| ())
            }
            ScenarioStep::Redeem {
                account,
                market,
                tokens,
            } => {
                let market = self.market_id(market)?;
                self.protocol.redeem(*account, market, u(*tokens)).map(|_| ())
            }
            ScenarioStep::RedeemUnderlying {
                account,
                market,
                amount,
            } => {
                let market = self.market_id(market)?;
                self.protocol
                    .redeem_underlying(*account, market, u(*amount))
                    .map(|_| ())
            }
            ScenarioStep::Borrow {
                account,
                market,
                amount,
            } => {
                let market = self.market_id(market)?;
                self.protocol.borrow(*account, market, u(*amount))
            }
            ScenarioStep::RepayBorrow {
                account,
                market,
                amount,
            } => {
                let market = self.market_id(market)?;
                let amount = amount.map(u).unwrap_or(U256::MAX);
                self.protocol
                    .repay_borrow(*account, market, amount)
                    .map(|_| ())
            }
            ScenarioStep::RepayBorrowBehalf {
                payer,
                borrower,
                market,
                amount,
            } => {
                let market = self.market_id(market)?;
                let amount = amount.map(u).unwrap_or(U256::MAX);
                self.protocol
                    .repay_borrow_behalf(*payer, *borrower, market, amount)
                    .map(|_| ())
            }
            ScenarioStep::LiquidateBorrow {
                liquidator,
                borrower,
                market,
                amount,
                collateral,
            } => {
                let borrowed = self.market_id(market)?;
                let collateral = self.market_id(collateral)?;
                self.protocol
                    .liquidate_borrow(*liquidator, *borrower, borrowed, u(*amount), collateral)
                    .map(|_| ())
            }
            ScenarioStep::Transfer {
                from,
                to,
                market,
                tokens,
            } => {
                let market = self.market_id(market)?;
                self.protocol.transfer(*from, *to, market, u(*tokens))
            }
            ScenarioStep::EnterMarkets { account, markets } => {
                let ids = markets
                    .iter()
                    .map(|m| self.market_id(m))
                    .collect::<ConfigResult<Vec<_>>>()?;
                self.protocol.enter_markets(*account, &ids)
            }
            ScenarioStep::ExitMarket { account, market } => {
                let market = self.market_id(market)?;
                self.protocol.exit_market(*account, market)
            }
            ScenarioStep::SetProtocolPaused { state } => {
                self.protocol.set_protocol_paused(&admin, *state)
            }
            ScenarioStep::SetActionPaused {
                action,
                market,
                state,
            } => {
                let market = market.as_deref().map(|m| self.market_id(m)).transpose()?;
                let target = match (action, market) {
                    (Action::Mint, Some(m)) => PauseTarget::Mint(m),
                    (Action::Borrow, Some(m)) => PauseTarget::Borrow(m),
                    (Action::Transfer, _) => PauseTarget::Transfer,
                    (Action::Seize, _) => PauseTarget::Seize,
                    (action, None) => {
                        return Err(ConfigError::Invalid(format!(
                            "pausing {action} needs a market"
                        )))
                    }
                };
                self.protocol.set_action_paused(&admin, target, *state)
            }
            ScenarioStep::SetCollateralFactor { market, factor } => {
                let market = self.market_id(market)?;
                self.protocol
                    .set_collateral_factor(&admin, market, Exp::from_decimal(*factor)?)
            }
            ScenarioStep::SetCloseFactor { factor } => self
                .protocol
                .set_close_factor(&admin, Exp::from_decimal(*factor)?),
            ScenarioStep::SetLiquidationIncentive { incentive } => self
                .protocol
                .set_liquidation_incentive(&admin, Exp::from_decimal(*incentive)?),
            ScenarioStep::SetReserveFactor { market, factor } => {
                let market = self.market_id(market)?;
                self.protocol
                    .set_reserve_factor(&admin, market, Exp::from_decimal(*factor)?)
            }
            ScenarioStep::AddReserves {
                account,
                market,
                amount,
            } => {
                let market = self.market_id(market)?;
                self.protocol.add_reserves(*account, market, u(*amount))
            }
            ScenarioStep::ReduceReserves { market, amount } => {
                let market = self.market_id(market)?;
                self.protocol.reduce_reserves(&admin, market, u(*amount))
            }
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
admin = "0x00000000000000000000000000000000000000ad"

[risk]
close_factor = "0.5"
liquidation_incentive = "1.1"

[[markets]]
symbol = "vUSDC"
underlying = "USDC"
id = "0x0000000000000000000000000000000000000001"
price = "1"
collateral_factor = "0.8"

[[markets]]
symbol = "vETH"
underlying = "ETH"
id = "0x0000000000000000000000000000000000000002"
price = "2000"
collateral_factor = "0.5"

[[scenario]]
op = "faucet"
account = "0x0000000000000000000000000000000000000011"
market = "vETH"
amount = 10

[[scenario]]
op = "faucet"
account = "0x0000000000000000000000000000000000000022"
market = "vUSDC"
amount = 100000

[[scenario]]
op = "mint"
account = "0x0000000000000000000000000000000000000022"
market = "vUSDC"
amount = 50000

[[scenario]]
op = "mint"
account = "0x0000000000000000000000000000000000000011"
market = "vETH"
amount = 10

[[scenario]]
op = "enter_markets"
account = "0x0000000000000000000000000000000000000011"
markets = ["vETH"]

[[scenario]]
op = "borrow"
account = "0x0000000000000000000000000000000000000011"
market = "vUSDC"
amount = 10001

[[scenario]]
op = "borrow"
account = "0x0000000000000000000000000000000000000011"
market = "vUSDC"
amount = 9000

[[scenario]]
op = "set_price"
market = "vETH"
price = "1500"

[[scenario]]
op = "liquidate_borrow"
liquidator = "0x0000000000000000000000000000000000000022"
borrower = "0x0000000000000000000000000000000000000011"
market = "vUSDC"
amount = 3000
collateral = "vETH"
"#;

    #[test]
    fn test_scenario_replay() {
        let config = ProtocolConfig::from_toml(CONFIG).unwrap();
        let (mut deployment, setup) = Deployment::build(&config).unwrap();
        assert!(setup
            .iter()
            .any(|e| matches!(e, Event::MarketListed { .. })));

        let outcomes = deployment.run(&config.scenario).unwrap();
        assert_eq!(outcomes.len(), 9);
        // each step took its own events out of the buffer
        assert!(deployment.protocol.events().is_empty());

        // 10 ETH * 2000 * 0.5 = 10000 of borrowing power
        let refused = &outcomes[5];
        assert!(!refused.committed);
        assert_eq!(refused.reason, Some("insufficient_liquidity"));
        assert!(refused.events.is_empty());

        assert!(outcomes[6].committed);
        assert!(outcomes[6]
            .events
            .iter()
            .any(|e| matches!(e, Event::MarketEntered { .. })));

        // collateral 10 * 1500 * 0.5 = 7500 < 9000 owed; seize 3000 * 1.1 / 1500 = 2
        let liquidation = &outcomes[8];
        assert!(liquidation.committed, "{:?}", liquidation.error);
        assert!(liquidation.events.iter().any(|e| matches!(
            e,
            Event::LiquidateBorrow { seize_tokens, .. } if *seize_tokens == U256::from(2u64)
        )));

        let eth = deployment.market_id("vETH").unwrap();
        let liquidator = Address::with_last_byte(0x22);
        assert_eq!(
            deployment.protocol.balance_of(&eth, &liquidator).unwrap(),
            U256::from(2u64)
        );
    }

    #[test]
    fn test_unknown_market_aborts() {
        let config = ProtocolConfig::from_toml(CONFIG).unwrap();
        let (mut deployment, _) = Deployment::build(&config).unwrap();
        let step = ScenarioStep::Mint {
            account: Address::with_last_byte(1),
            market: "vDAI".to_string(),
            amount: 1,
        };
        assert!(matches!(
            deployment.run_step(0, &step),
            Err(ConfigError::UnknownMarket(_))
        ));
    }

    #[test]
    fn test_pause_step_needs_market() {
        let config = ProtocolConfig::from_toml(CONFIG).unwrap();
        let (mut deployment, _) = Deployment::build(&config).unwrap();
        let step = ScenarioStep::SetActionPaused {
            action: Action::Borrow,
            market: None,
            state: true,
        };
        assert!(matches!(
            deployment.run_step(0, &step),
            Err(ConfigError::Invalid(_))
        ));
    }
}
