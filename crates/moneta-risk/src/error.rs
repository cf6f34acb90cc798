//! Risk error types.

use moneta_core::{Action, MarketId, MathError};
use moneta_interfaces::InterfaceError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RiskError {
    #[error("Caller is not the admin")]
    Unauthorized,

    #[error("Market not listed: {0}")]
    MarketNotListed(MarketId),

    #[error("Market already listed: {0}")]
    MarketAlreadyListed(MarketId),

    #[error("Protocol is paused")]
    ProtocolPaused,

    #[error("Action {action} is paused")]
    ActionPaused {
        action: Action,
        market: Option<MarketId>,
    },

    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    #[error("Account has no shortfall")]
    InsufficientShortfall,

    #[error("Repay amount above close factor")]
    TooMuchRepay,

    #[error("Repay amount is zero")]
    TooLittleRepay,

    #[error("Liquidator is the borrower")]
    LiquidatorIsBorrower,

    #[error("No usable price for market {0}")]
    PriceUnavailable(MarketId),

    #[error("Borrow cap of market {0} reached")]
    BorrowCapExceeded(MarketId),

    #[error("Account already in the maximum number of markets")]
    TooManyAssets,

    #[error("Account still holds tokens in market {0}")]
    NonzeroBalance(MarketId),

    #[error("Account still owes in market {0}")]
    NonzeroBorrowBalance(MarketId),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Market not deployed: {0}")]
    MarketNotDeployed(MarketId),

    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

impl From<InterfaceError> for RiskError {
    fn from(err: InterfaceError) -> Self {
        match err {
            InterfaceError::PriceUnavailable(market) => RiskError::PriceUnavailable(market),
            InterfaceError::Math(e) => RiskError::Math(e),
            other => RiskError::InvalidParameter(other.to_string()),
        }
    }
}

pub type RiskResult<T> = Result<T, RiskError>;
