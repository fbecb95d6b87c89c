//! The pending-request model.
//!
//! A `Request` is created once, never mutated, and destroyed by exactly
//! one of: successful execution, keeper-triggered cancellation (after a
//! recoverable execution failure), or user cancellation. There is no
//! update operation — a request is replaced by deletion, never edited.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::block::BlockNumber;
use crate::budget::Budget;
use crate::decimal::{Amount, Price};
use crate::ids::{AccountId, MarketId, RequestId, TokenSymbol};

/// Order side: buy (long) or sell (short).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Parameters of a deposit request: pay tokens in, receive market tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositParams {
    /// Token paid into the pool.
    pub token: TokenSymbol,
    /// Amount paid in (escrowed at creation).
    pub amount: Amount,
    /// Minimum acceptable market-token output.
    pub min_market_tokens: Amount,
}

/// Parameters of a withdrawal request: burn market tokens, receive pool
/// tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalParams {
    /// Market tokens burned (escrowed at creation).
    pub market_token_amount: Amount,
    /// Token to withdraw from the pool.
    pub out_token: TokenSymbol,
    /// Minimum acceptable output amount.
    pub min_out: Amount,
}

/// Parameters of an order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderParams {
    pub side: Side,
    /// Collateral token (escrowed at creation).
    pub collateral_token: TokenSymbol,
    /// Collateral amount.
    pub collateral_amount: Amount,
    /// Position size in index-token units.
    pub size: Amount,
    /// Worst execution price the requester accepts.
    pub acceptable_price: Price,
}

/// Request kind with per-kind parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RequestKind {
    Deposit(DepositParams),
    Withdrawal(WithdrawalParams),
    Order(OrderParams),
}

impl RequestKind {
    /// Short name used in feature keys, events and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Deposit(_) => "deposit",
            Self::Withdrawal(_) => "withdrawal",
            Self::Order(_) => "order",
        }
    }

    /// Token and amount escrowed at creation for this request.
    ///
    /// The canceller refunds exactly this escrow, so it must not depend
    /// on prices.
    pub fn escrow(&self, market_token: &TokenSymbol) -> (TokenSymbol, Amount) {
        match self {
            Self::Deposit(p) => (p.token.clone(), p.amount),
            Self::Withdrawal(p) => (market_token.clone(), p.market_token_amount),
            Self::Order(p) => (p.collateral_token.clone(), p.collateral_amount),
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A pending request awaiting keeper execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Store-issued identifier.
    pub id: RequestId,
    /// Account the request acts for.
    pub account: AccountId,
    /// Target market.
    pub market: MarketId,
    /// Kind and parameters.
    pub kind: RequestKind,
    /// Block at which the request was created.
    pub created_at_block: BlockNumber,
    /// Block of the last lifecycle transition (creation, for an
    /// immutable request).
    pub updated_at_block: BlockNumber,
    /// Prepaid execution budget.
    pub execution_fee: Budget,
}

impl Request {
    /// Age of the request in blocks at the given height.
    pub fn age_at(&self, current_block: BlockNumber) -> u64 {
        current_block.saturating_sub(self.created_at_block)
    }
}
