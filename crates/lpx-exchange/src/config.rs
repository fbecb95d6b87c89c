//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use tracing::info;

use lpx_oracle::OracleConfig;
use lpx_registry::MarketConfig;

use crate::budget::BudgetConfig;
use crate::error::{ExchangeError, ExchangeResult};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Blocks a request must age before user cancellation is allowed.
    #[serde(default = "default_min_request_age_blocks")]
    pub min_request_age_blocks: u64,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    /// Markets registered at startup.
    #[serde(default)]
    pub markets: Vec<MarketConfig>,
}

fn default_min_request_age_blocks() -> u64 {
    2
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            min_request_age_blocks: default_min_request_age_blocks(),
            oracle: OracleConfig::default(),
            budget: BudgetConfig::default(),
            markets: Vec::new(),
        }
    }
}

impl ExchangeConfig {
    /// Load from a TOML file.
    pub fn from_file(path: &str) -> ExchangeResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ExchangeError::Config(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ExchangeError::Config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        info!(path, markets = config.markets.len(), "Config loaded");
        Ok(config)
    }

    /// Reject configurations that would break pipeline guarantees.
    pub fn validate(&self) -> ExchangeResult<()> {
        if self.budget.cancellation_cost > self.budget.fixed_reserve {
            return Err(ExchangeError::Config(format!(
                "cancellation cost {} exceeds the fixed reserve {}",
                self.budget.cancellation_cost, self.budget.fixed_reserve
            )));
        }
        if self.budget.max_reason_len == 0 {
            return Err(ExchangeError::Config(
                "max_reason_len must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpx_core::Budget;

    #[test]
    fn test_defaults_validate() {
        let config = ExchangeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_request_age_blocks, 2);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            min_request_age_blocks = 5

            [oracle]
            max_price_age_blocks = 20
            min_confirmations = 3
            authorized_signers = ["signer-a"]

            [budget]
            fixed_reserve = 200

            [[markets]]
            market = "ETH-USD"
            long_token = "WETH"
            short_token = "USDC"
            market_token = "LP-ETHUSD"
            max_pool_amount = "1000000"
            max_open_interest = "5000"
            max_order_size = "100"
        "#;
        let config: ExchangeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.min_request_age_blocks, 5);
        assert_eq!(config.oracle.max_price_age_blocks, 20);
        assert_eq!(config.budget.fixed_reserve, Budget::new(200));
        // Unspecified budget fields fall back to defaults.
        assert_eq!(config.budget.max_reason_len, 256);
        assert_eq!(config.markets.len(), 1);
        assert!(config.markets[0].enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reserve_must_cover_cancellation() {
        let mut config = ExchangeConfig::default();
        config.budget.fixed_reserve = Budget::new(10);
        config.budget.cancellation_cost = Budget::new(60);
        assert!(matches!(
            config.validate(),
            Err(ExchangeError::Config(_))
        ));
    }
}
