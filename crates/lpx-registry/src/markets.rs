//! Market registry.
//!
//! Per-market configuration consulted by the execution engines: which
//! tokens the pool holds, whether the market accepts new activity, and
//! the caps the domain checks enforce.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use lpx_core::{Amount, MarketId, TokenSymbol};

use crate::error::{RegistryError, RegistryResult};

/// Static configuration of one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub market: MarketId,
    /// Disabled markets reject execution with a recoverable domain error.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Long-side pool token.
    pub long_token: TokenSymbol,
    /// Short-side pool token.
    pub short_token: TokenSymbol,
    /// Liquidity share token minted to depositors.
    pub market_token: TokenSymbol,
    /// Cap on either pool side, in token units.
    pub max_pool_amount: Amount,
    /// Cap on aggregate open interest, in index-token units.
    pub max_open_interest: Amount,
    /// Cap on a single order's size, in index-token units.
    pub max_order_size: Amount,
}

fn default_enabled() -> bool {
    true
}

impl MarketConfig {
    /// True when `token` is one of this market's pool tokens.
    pub fn holds(&self, token: &TokenSymbol) -> bool {
        self.long_token == *token || self.short_token == *token
    }
}

/// Lookup table of registered markets.
#[derive(Debug, Default)]
pub struct MarketRegistry {
    markets: RwLock<HashMap<MarketId, MarketConfig>>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a market. Duplicate registration is an error — market
    /// parameters change through governance, not re-registration.
    pub fn register(&self, config: MarketConfig) -> RegistryResult<()> {
        let mut markets = self.markets.write();
        if markets.contains_key(&config.market) {
            return Err(RegistryError::DuplicateMarket(config.market));
        }
        info!(market = %config.market, "Market registered");
        markets.insert(config.market.clone(), config);
        Ok(())
    }

    pub fn get(&self, market: &MarketId) -> RegistryResult<MarketConfig> {
        self.markets
            .read()
            .get(market)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownMarket(market.clone()))
    }

    pub fn set_enabled(&self, market: &MarketId, enabled: bool) -> RegistryResult<()> {
        let mut markets = self.markets.write();
        let config = markets
            .get_mut(market)
            .ok_or_else(|| RegistryError::UnknownMarket(market.clone()))?;
        config.enabled = enabled;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.markets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.read().is_empty()
    }
}
