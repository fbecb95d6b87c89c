//! Vault error types.

use lpx_core::{AccountId, Amount, MarketId, TokenSymbol};
use thiserror::Error;

/// Ledger failures. Inside the execution boundary these classify as
/// recoverable domain errors; at create time they abort the creation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    #[error("Insufficient balance for {account}: {token} have {have}, need {need}")]
    InsufficientBalance {
        account: AccountId,
        token: TokenSymbol,
        have: Amount,
        need: Amount,
    },

    #[error("Insufficient escrow of {token}: have {have}, need {need}")]
    InsufficientEscrow {
        token: TokenSymbol,
        have: Amount,
        need: Amount,
    },

    #[error("Insufficient pool balance of {token} in {market}: have {have}, need {need}")]
    InsufficientPool {
        market: MarketId,
        token: TokenSymbol,
        have: Amount,
        need: Amount,
    },

    #[error("Insufficient market-token supply of {token}: have {have}, need {need}")]
    InsufficientSupply {
        token: TokenSymbol,
        have: Amount,
        need: Amount,
    },

    #[error("Open interest underflow in {market}")]
    OpenInterestUnderflow { market: MarketId },
}

/// Result type alias for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;
