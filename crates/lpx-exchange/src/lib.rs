//! Keeper-driven request execution pipeline.
//!
//! Requests are created by controllers, escrowed immediately, and
//! executed later by keepers under a global exclusion lock with
//! keeper-supplied, oracle-validated prices. Execution either commits
//! all of a request's ledger effects atomically or, on a recoverable
//! failure, cancels the request and refunds its escrow. Fatal failures
//! leave the request pending and change nothing.
//!
//! Pipeline shape per `execute` call:
//!
//! 1. role check, exclusion lock, feature kill-switch
//! 2. oracle gate: validate and publish the price batch for the call
//! 3. budget split: execution sub-budget vs. the cancellation reserve
//! 4. per-kind engine: metered domain gates, journaled effects
//! 5. atomic commit, or fallback cancellation with a bounded reason

pub mod budget;
pub mod config;
mod engine;
pub mod error;
pub mod exchange;
pub mod guard;
pub mod journal;
pub mod store;

pub use budget::{BudgetConfig, BudgetMeter, CostEstimator};
pub use config::ExchangeConfig;
pub use error::{DomainError, ExchangeError, ExchangeResult};
pub use exchange::{Exchange, Outcome};
pub use guard::{ExclusionGuard, ExclusionToken};
pub use journal::EffectJournal;
pub use store::RequestStore;
