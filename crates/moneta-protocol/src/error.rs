//! Protocol error types.

use moneta_core::{Action, BlockNumber, MathError};
use moneta_interfaces::InterfaceError;
use moneta_ledger::LedgerError;
use moneta_registry::RegistryError;
use moneta_risk::RiskError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Risk check failed: {0}")]
    Risk(#[from] RiskError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Underlying asset error: {0}")]
    Asset(#[from] InterfaceError),

    #[error("Math error: {0}")]
    Math(#[from] MathError),

    #[error("Block clock cannot move from {current} back to {requested}")]
    ClockBackwards {
        current: BlockNumber,
        requested: BlockNumber,
    },
}

impl ProtocolError {
    /// Short label for metrics and scenario output.
    pub fn reason(&self) -> &'static str {
        match self {
            ProtocolError::Risk(e) => match e {
                RiskError::Unauthorized => "unauthorized",
                RiskError::MarketNotListed(_) => "market_not_listed",
                RiskError::MarketAlreadyListed(_) => "market_already_listed",
                RiskError::ProtocolPaused => "protocol_paused",
                RiskError::ActionPaused { action, .. } => match action {
                    Action::Mint => "mint_paused",
                    Action::Borrow => "borrow_paused",
                    Action::Transfer => "transfer_paused",
                    Action::Seize => "seize_paused",
                },
                RiskError::InsufficientLiquidity => "insufficient_liquidity",
                RiskError::InsufficientShortfall => "insufficient_shortfall",
                RiskError::TooMuchRepay => "too_much_repay",
                RiskError::TooLittleRepay => "too_little_repay",
                RiskError::LiquidatorIsBorrower => "liquidator_is_borrower",
                RiskError::PriceUnavailable(_) => "price_unavailable",
                RiskError::BorrowCapExceeded(_) => "borrow_cap_exceeded",
                RiskError::TooManyAssets => "too_many_assets",
                RiskError::NonzeroBalance(_) => "nonzero_balance",
                RiskError::NonzeroBorrowBalance(_) => "nonzero_borrow_balance",
                RiskError::InvalidParameter(_) => "invalid_parameter",
                RiskError::InvalidAmount(_) => "invalid_amount",
                RiskError::MarketNotDeployed(_) => "market_not_deployed",
                RiskError::Math(_) => "math_error",
            },
            ProtocolError::Ledger(e) => match e {
                LedgerError::InsufficientCash => "insufficient_cash",
                LedgerError::InsufficientBalance { .. } => "insufficient_balance",
                LedgerError::InsufficientAllowance { .. } => "insufficient_allowance",
                LedgerError::LiquidatorIsBorrower => "liquidator_is_borrower",
                LedgerError::InvalidAmount(_) => "invalid_amount",
                LedgerError::InvalidParameter(_) => "invalid_parameter",
                LedgerError::BorrowRateTooHigh(_) | LedgerError::Math(_) => "math_error",
                LedgerError::RateModel(_) => "rate_model_error",
            },
            ProtocolError::Registry(e) => match e {
                RegistryError::MarketNotFound(_) => "market_not_deployed",
                RegistryError::AlreadyDeployed(_) => "market_already_deployed",
            },
            ProtocolError::Asset(_) => "transfer_failed",
            ProtocolError::Math(_) => "math_error",
            ProtocolError::ClockBackwards { .. } => "clock_backwards",
        }
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Unknown market symbol: {0}")]
    UnknownMarket(String),

    #[error("Math error: {0}")]
    Math(#[from] MathError),

    #[error("Interface error: {0}")]
    Interface(#[from] InterfaceError),

    #[error("Deployment failed: {0}")]
    Deploy(#[from] ProtocolError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
