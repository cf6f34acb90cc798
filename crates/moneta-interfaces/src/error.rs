//! Error types for moneta-interfaces.

use moneta_core::{Account, MarketId, MathError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterfaceError {
    #[error("No usable price for market {0}")]
    PriceUnavailable(MarketId),

    #[error("Token transfer failed: {0}")]
    TransferFailed(String),

    #[error("Token balance of {account} too low")]
    InsufficientBalance { account: Account },

    #[error("Token allowance of {owner} too low")]
    InsufficientAllowance { owner: Account },

    #[error("Invalid rate model parameter: {0}")]
    InvalidParameter(String),

    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

pub type InterfaceResult<T> = std::result::Result<T, InterfaceError>;
