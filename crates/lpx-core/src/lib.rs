//! Core domain types for the LPX keeper execution pipeline.
//!
//! This crate provides the fundamental types shared across the system:
//! - `Price`, `Amount`: precision-safe numeric types
//! - `AccountId`, `TokenSymbol`, `MarketId`, `RequestId`: identifiers
//! - `Request`, `RequestKind`: the pending-request model
//! - `RequestEvent`, `EventLog`: the append-only event surface
//! - `BlockClock`: the current-block source

pub mod block;
pub mod budget;
pub mod decimal;
pub mod error;
pub mod event;
pub mod ids;
pub mod request;

pub use block::{BlockClock, BlockNumber};
pub use budget::Budget;
pub use decimal::{Amount, Price};
pub use error::{CoreError, Result};
pub use event::{EventLog, InMemoryEventLog, RequestEvent};
pub use ids::{AccountId, MarketId, RequestId, TokenSymbol};
pub use request::{
    DepositParams, OrderParams, Request, RequestKind, Side, WithdrawalParams,
};
