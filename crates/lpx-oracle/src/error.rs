//! Oracle error types.
//!
//! Every variant here is fatal to the pipeline: an oracle failure aborts
//! the whole operation, including the price-cache publication, and leaves
//! the request pending.

use lpx_core::{BlockNumber, TokenSymbol};
use thiserror::Error;

/// Oracle validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("No price reports supplied")]
    EmptyReports,

    #[error("Unauthorized oracle signer: {0}")]
    UnauthorizedSigner(String),

    #[error("Malformed validity proof for {token}: {detail}")]
    MalformedProof { token: TokenSymbol, detail: String },

    #[error("Insufficient confirmations for {token}: {got} < {min}")]
    InsufficientConfirmations {
        token: TokenSymbol,
        got: u32,
        min: u32,
    },

    #[error(
        "Stale oracle price for {token}: source block {source_block} older than \
         {max_age_blocks} blocks at block {current_block}"
    )]
    StaleOraclePrice {
        token: TokenSymbol,
        source_block: BlockNumber,
        current_block: BlockNumber,
        max_age_blocks: u64,
    },

    #[error(
        "Source block {source_block} for {token} outside expected range \
         [{min_block}, {max_block}]"
    )]
    InvalidBlockRange {
        token: TokenSymbol,
        source_block: BlockNumber,
        min_block: BlockNumber,
        max_block: BlockNumber,
    },

    #[error("Invalid price range for {0}: min must be positive and not exceed max")]
    InvalidPriceRange(TokenSymbol),

    #[error("No published price for {0}")]
    MissingPrice(TokenSymbol),
}

/// Result type alias for oracle operations.
pub type OracleResult<T> = Result<T, OracleError>;
