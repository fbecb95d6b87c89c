//! Pipeline error types.
//!
//! Errors fall into two classes with very different consequences inside
//! `execute`:
//!
//! - **Recoverable** errors describe a request that is well-formed but
//!   cannot succeed under current market conditions. The keeper path
//!   reacts by cancelling the request and refunding its escrow. Only
//!   `Domain` and `BudgetExhausted` are recoverable.
//! - Everything else is **fatal**: the call fails outright, the request
//!   stays pending, and no state changes. Fatal errors point at a broken
//!   caller, a broken oracle batch, or a misconfigured system, none of
//!   which a cancellation would fix.
//!
//! The recoverable set is a closed whitelist. A new error variant is
//! fatal until it is deliberately added to `is_recoverable`.

use thiserror::Error;

use lpx_core::{AccountId, Amount, Budget, MarketId, Price, RequestId, TokenSymbol};
use lpx_oracle::OracleError;
use lpx_registry::FeatureKey;
use lpx_vault::VaultError;

/// A request-level failure the canceller can resolve by refunding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Market {0} is disabled")]
    MarketDisabled(MarketId),

    #[error("Request carries an empty amount")]
    EmptyAmount,

    #[error("Token {token} is not a pool token of market {market}")]
    UnsupportedToken { market: MarketId, token: TokenSymbol },

    #[error("Pool amount constraint violated for {token} in market {market}")]
    MaxPoolAmountExceeded { market: MarketId, token: TokenSymbol },

    #[error("Open interest cap exceeded in market {market}")]
    MaxOpenInterestExceeded { market: MarketId },

    #[error("Order size cap exceeded in market {market}")]
    MaxOrderSizeExceeded { market: MarketId },

    #[error("Output {actual} below requested minimum {min_out}")]
    SlippageExceeded { min_out: Amount, actual: Amount },

    #[error("Execution price {actual} outside acceptable price {acceptable}")]
    UnacceptablePrice { acceptable: Price, actual: Price },

    #[error("Computed output rounds to zero")]
    PrecisionLoss,

    #[error(transparent)]
    Vault(#[from] VaultError),
}

impl DomainError {
    /// Short reason code recorded on keeper-cancellation events.
    pub fn reason(&self) -> String {
        match self {
            Self::MarketDisabled(_) => "MarketDisabled".to_string(),
            Self::EmptyAmount => "EmptyAmount".to_string(),
            Self::UnsupportedToken { .. } => "UnsupportedToken".to_string(),
            Self::MaxPoolAmountExceeded { .. } => "MaxPoolAmountExceeded".to_string(),
            Self::MaxOpenInterestExceeded { .. } => "MaxOpenInterestExceeded".to_string(),
            Self::MaxOrderSizeExceeded { .. } => "MaxOrderSizeExceeded".to_string(),
            Self::SlippageExceeded { .. } => "SlippageExceeded".to_string(),
            Self::UnacceptablePrice { .. } => "UnacceptablePrice".to_string(),
            Self::PrecisionLoss => "PrecisionLoss".to_string(),
            Self::Vault(e) => format!("VaultRejected: {e}"),
        }
    }
}

/// Errors surfaced by the public pipeline operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    #[error("Account {account} lacks the {role} role")]
    Unauthorized {
        account: AccountId,
        role: &'static str,
    },

    #[error("Feature {0} is disabled")]
    DisabledFeature(FeatureKey),

    #[error("Request {0} not found")]
    NotFound(RequestId),

    #[error("Unknown market {0}")]
    UnknownMarket(MarketId),

    #[error("Request is {age} blocks old, minimum cancellation age is {min}")]
    RequestTooYoung { age: u64, min: u64 },

    #[error("Exclusion lock already held")]
    Reentrant,

    #[error("Execution fee {provided} below required {required}")]
    InsufficientExecutionFee { provided: Budget, required: Budget },

    #[error("Remaining budget {remaining} cannot cover the {reserve} cancellation reserve")]
    InsufficientBudget { remaining: Budget, reserve: Budget },

    #[error("Cancellation reason of {len} bytes exceeds the {max} byte bound")]
    OversizedReason { len: usize, max: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal invariant violated: {0}")]
    Internal(String),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("Execution budget exhausted")]
    BudgetExhausted,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ExchangeError {
    /// True for failures the keeper path resolves by cancelling the
    /// request instead of failing the call.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Domain(_) | Self::BudgetExhausted)
    }
}

impl From<VaultError> for ExchangeError {
    fn from(e: VaultError) -> Self {
        Self::Domain(DomainError::Vault(e))
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
