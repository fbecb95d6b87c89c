//! Externally supplied price reports.
//!
//! Reports are transient call inputs: validated, published into the cache
//! for one guarded call, and never persisted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use lpx_core::{BlockNumber, Price, TokenSymbol};

/// Expected byte width of a validity proof (r ++ s ++ v signature).
pub const PROOF_BYTES: usize = 65;

/// One signed min/max price observation for a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceReport {
    /// Token the report prices.
    pub token: TokenSymbol,
    /// Lower bound of the observed price.
    pub min_price: Price,
    /// Upper bound of the observed price.
    pub max_price: Price,
    /// Block at which the price was sourced.
    pub source_block: BlockNumber,
    /// Confirmations behind the source block.
    pub confirmations: u32,
    /// Reporting signer identity.
    pub signer: String,
    /// Hex-encoded validity proof over (token, prices, source block).
    pub proof: String,
}

/// Caller-pinned bounds on a report's source block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub min_block: BlockNumber,
    pub max_block: BlockNumber,
}

impl BlockRange {
    pub fn new(min_block: BlockNumber, max_block: BlockNumber) -> Self {
        Self {
            min_block,
            max_block,
        }
    }

    pub fn contains(&self, block: BlockNumber) -> bool {
        block >= self.min_block && block <= self.max_block
    }
}

/// A batch of reports plus the caller's per-token source-block pins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBatch {
    pub reports: Vec<PriceReport>,
    /// Per-token expected source-block ranges; tokens without an entry
    /// are bounded only by the configured maximum age.
    #[serde(default)]
    pub block_ranges: HashMap<TokenSymbol, BlockRange>,
}

impl PriceBatch {
    pub fn new(reports: Vec<PriceReport>) -> Self {
        Self {
            reports,
            block_ranges: HashMap::new(),
        }
    }

    pub fn with_range(mut self, token: TokenSymbol, range: BlockRange) -> Self {
        self.block_ranges.insert(token, range);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_range_contains() {
        let range = BlockRange::new(10, 20);
        assert!(range.contains(10));
        assert!(range.contains(20));
        assert!(!range.contains(9));
        assert!(!range.contains(21));
    }
}
