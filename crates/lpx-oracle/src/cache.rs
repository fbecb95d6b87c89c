//! The transient price cache.
//!
//! Populated by the oracle gate at the entry of a guarded call, read by
//! the execution engines, and cleared on every exit path — success or
//! failure — via the RAII `PublishGuard`. The cache is empty immediately
//! before and after every guarded call.

use dashmap::DashMap;

use lpx_core::{BlockNumber, Price, TokenSymbol};

use crate::error::{OracleError, OracleResult};

/// A validated min/max price entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedPrice {
    pub min: Price,
    pub max: Price,
    pub source_block: BlockNumber,
}

impl ValidatedPrice {
    /// Midpoint of the min/max band, used for pool valuation.
    ///
    /// The gate rejects reports whose midpoint is not representable,
    /// so this is `Some` for every published price.
    pub fn mid(&self) -> Option<Price> {
        Price::midpoint(self.min, self.max)
    }
}

/// Process-wide price cache.
#[derive(Debug, Default)]
pub struct PriceCache {
    entries: DashMap<TokenSymbol, ValidatedPrice>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no prices are published.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(&self, token: TokenSymbol, price: ValidatedPrice) {
        self.entries.insert(token, price);
    }

    pub(crate) fn clear(&self) {
        self.entries.clear();
    }

    fn get(&self, token: &TokenSymbol) -> Option<ValidatedPrice> {
        self.entries.get(token).map(|e| *e.value())
    }
}

/// Scoped publication of validated prices.
///
/// Holds the cache populated for the duration of one guarded call and
/// clears it on drop, so no price survives the call on any exit path.
#[derive(Debug)]
pub struct PublishGuard<'a> {
    cache: &'a PriceCache,
}

impl<'a> PublishGuard<'a> {
    pub(crate) fn new(cache: &'a PriceCache) -> Self {
        Self { cache }
    }

    /// Look up a published price; a token the batch did not cover is an
    /// oracle failure.
    pub fn price(&self, token: &TokenSymbol) -> OracleResult<ValidatedPrice> {
        self.cache
            .get(token)
            .ok_or_else(|| OracleError::MissingPrice(token.clone()))
    }
}

impl Drop for PublishGuard<'_> {
    fn drop(&mut self) {
        self.cache.clear();
    }
}
