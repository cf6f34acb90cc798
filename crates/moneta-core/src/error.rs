//! Error types for moneta-core.

use thiserror::Error;

/// Arithmetic failures. Always fatal to the operation that hit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("Integer overflow")]
    Overflow,

    #[error("Integer underflow")]
    Underflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Negative value where an unsigned fraction is required")]
    Negative,

    #[error("Value does not fit the target representation")]
    Conversion,
}

/// Result type alias for fixed-point arithmetic.
pub type MathResult<T> = std::result::Result<T, MathError>;
