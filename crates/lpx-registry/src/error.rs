//! Registry error types.

use lpx_core::MarketId;
use thiserror::Error;

/// Registry error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unknown market: {0}")]
    UnknownMarket(MarketId),

    #[error("Market already registered: {0}")]
    DuplicateMarket(MarketId),
}

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
