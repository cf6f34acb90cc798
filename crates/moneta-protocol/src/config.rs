//! Deployment configuration.
//!
//! A config file declares the admin, the global risk parameters, every market
//! and, optionally, a scripted scenario replayed by the `moneta` binary.

use crate::error::{ConfigError, ConfigResult};
use crate::scenario::ScenarioStep;
use alloy_primitives::Address;
use moneta_core::{Exp, MarketId};
use moneta_interfaces::{
    FixedRateModel, InterestRateModel, JumpRateModel, WhitePaperRateModel,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Global risk parameters, in human units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Default: 0.051.
    #[serde(default = "default_close_factor")]
    pub close_factor: Decimal,
    /// Default: 1 (no bonus).
    #[serde(default = "default_liquidation_incentive")]
    pub liquidation_incentive: Decimal,
    /// Default: 10.
    #[serde(default = "default_max_assets")]
    pub max_assets: usize,
}

fn default_close_factor() -> Decimal {
    Decimal::new(51, 3)
}

fn default_liquidation_incentive() -> Decimal {
    Decimal::ONE
}

fn default_max_assets() -> usize {
    10
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            close_factor: default_close_factor(),
            liquidation_incentive: default_liquidation_incentive(),
            max_assets: default_max_assets(),
        }
    }
}

/// Interest rate curve of a market. Rates are per year unless stated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateModelConfig {
    Fixed {
        rate_per_block: Decimal,
    },
    WhitePaper {
        base_rate: Decimal,
        multiplier: Decimal,
    },
    JumpRate {
        base_rate: Decimal,
        multiplier: Decimal,
        jump_multiplier: Decimal,
        kink: Decimal,
    },
}

impl Default for RateModelConfig {
    fn default() -> Self {
        RateModelConfig::Fixed {
            rate_per_block: Decimal::ZERO,
        }
    }
}

impl RateModelConfig {
    pub fn build(&self) -> ConfigResult<Arc<dyn InterestRateModel>> {
        let model: Arc<dyn InterestRateModel> = match self {
            RateModelConfig::Fixed { rate_per_block } => {
                Arc::new(FixedRateModel::new(Exp::from_decimal(*rate_per_block)?))
            }
            RateModelConfig::WhitePaper {
                base_rate,
                multiplier,
            } => Arc::new(WhitePaperRateModel::new(
                Exp::from_decimal(*base_rate)?,
                Exp::from_decimal(*multiplier)?,
            )),
            RateModelConfig::JumpRate {
                base_rate,
                multiplier,
                jump_multiplier,
                kink,
            } => Arc::new(JumpRateModel::new(
                Exp::from_decimal(*base_rate)?,
                Exp::from_decimal(*multiplier)?,
                Exp::from_decimal(*jump_multiplier)?,
                Exp::from_decimal(*kink)?,
            )?),
        };
        Ok(model)
    }
}

/// One market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Interest-bearing token symbol, e.g. "vUSDC". Scenario steps refer to
    /// markets by this symbol.
    pub symbol: String,
    /// Underlying symbol, e.g. "USDC".
    pub underlying: String,
    /// Market address; also the custody account of the underlying.
    pub id: MarketId,
    /// Oracle price of one unit of underlying.
    pub price: Decimal,
    #[serde(default)]
    pub collateral_factor: Decimal,
    #[serde(default)]
    pub reserve_factor: Decimal,
    #[serde(default = "default_initial_exchange_rate")]
    pub initial_exchange_rate: Decimal,
    /// Zero means uncapped.
    #[serde(default)]
    pub borrow_cap: u64,
    #[serde(default)]
    pub rate_model: RateModelConfig,
}

fn default_initial_exchange_rate() -> Decimal {
    Decimal::ONE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub admin: Address,
    /// Default: 1.
    #[serde(default = "default_start_block")]
    pub start_block: u64,
    /// Used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub markets: Vec<MarketConfig>,
    #[serde(default)]
    pub scenario: Vec<ScenarioStep>,
}

fn default_start_block() -> u64 {
    1
}

fn default_log_filter() -> String {
    "info,moneta=debug".to_string()
}

impl ProtocolConfig {
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks. Parameter bounds are enforced by the protocol itself
    /// when the deployment is built.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut symbols = HashSet::new();
        let mut ids = HashSet::new();
        for market in &self.markets {
            if !symbols.insert(market.symbol.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate market symbol {}",
                    market.symbol
                )));
            }
            if !ids.insert(market.id) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate market id {}",
                    market.id
                )));
            }
            if market.price.is_sign_negative() {
                return Err(ConfigError::Invalid(format!(
                    "negative price for {}",
                    market.symbol
                )));
            }
        }
        Ok(())
    }

    pub fn market(&self, symbol: &str) -> ConfigResult<&MarketConfig> {
        self.markets
            .iter()
            .find(|m| m.symbol == symbol)
            .ok_or_else(|| ConfigError::UnknownMarket(symbol.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const MINIMAL: &str = r#"
admin = "0x00000000000000000000000000000000000000ad"

[[markets]]
symbol = "vUSDC"
underlying = "USDC"
id = "0x0000000000000000000000000000000000000001"
price = "1"
"#;

    #[test]
    fn test_defaults() {
        let config = ProtocolConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.start_block, 1);
        assert_eq!(config.risk.close_factor, dec!(0.051));
        assert_eq!(config.risk.liquidation_incentive, dec!(1));
        assert_eq!(config.risk.max_assets, 10);
        assert!(config.scenario.is_empty());

        let market = config.market("vUSDC").unwrap();
        assert_eq!(market.id, MarketId::from_byte(1));
        assert_eq!(market.collateral_factor, Decimal::ZERO);
        assert_eq!(market.initial_exchange_rate, dec!(1));
        assert_eq!(market.borrow_cap, 0);
        assert_eq!(market.rate_model, RateModelConfig::default());
    }

    #[test]
    fn test_rate_models() {
        let toml = format!(
            r#"{MINIMAL}
[[markets]]
symbol = "vETH"
underlying = "ETH"
id = "0x0000000000000000000000000000000000000002"
price = "2000"
rate_model = {{ kind = "jump_rate", base_rate = "0.02", multiplier = "0.1", jump_multiplier = "2", kink = "0.8" }}
"#
        );
        let config = ProtocolConfig::from_toml(&toml).unwrap();
        let model = config.market("vETH").unwrap().rate_model.build().unwrap();
        assert_eq!(model.name(), "jump_rate");

        let bad = RateModelConfig::JumpRate {
            base_rate: dec!(0),
            multiplier: dec!(0.1),
            jump_multiplier: dec!(1),
            kink: dec!(1.5),
        };
        assert!(matches!(bad.build(), Err(ConfigError::Interface(_))));
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let toml = format!(
            r#"{MINIMAL}
[[markets]]
symbol = "vUSDC"
underlying = "USDC"
id = "0x0000000000000000000000000000000000000003"
price = "1"
"#
        );
        assert!(matches!(
            ProtocolConfig::from_toml(&toml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_unknown_market() {
        let config = ProtocolConfig::from_toml(MINIMAL).unwrap();
        assert!(matches!(
            config.market("vDAI"),
            Err(ConfigError::UnknownMarket(s)) if s == "vDAI"
        ));
    }
}
