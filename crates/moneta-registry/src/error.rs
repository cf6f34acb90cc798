//! Registry error types.

use moneta_core::MarketId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Market not deployed: {0}")]
    MarketNotFound(MarketId),

    #[error("Market already deployed: {0}")]
    AlreadyDeployed(MarketId),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
