//! Error types for moneta-ledger.

use moneta_core::{Account, Exp, MathError};
use moneta_interfaces::InterfaceError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Market cash too low")]
    InsufficientCash,

    #[error("Token balance of {account} too low")]
    InsufficientBalance { account: Account },

    #[error("Allowance of {spender} over {owner} too low")]
    InsufficientAllowance { owner: Account, spender: Account },

    #[error("Liquidator is the borrower")]
    LiquidatorIsBorrower,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Borrow rate {0} per block above the protocol maximum")]
    BorrowRateTooHigh(Exp),

    #[error("Math error: {0}")]
    Math(#[from] MathError),

    #[error("Rate model error: {0}")]
    RateModel(#[from] InterfaceError),
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
