//! Oracle price gate for the LPX execution pipeline.
//!
//! Keepers supply signed min/max price reports with every `execute` call.
//! The gate validates each report (signer, proof shape, confirmations,
//! source-block age and caller-pinned block ranges) and publishes the
//! surviving prices into a process-wide cache for exactly the duration of
//! the guarded call: publication is a scoped acquisition whose guard
//! clears the cache on every exit path.

pub mod cache;
pub mod error;
pub mod report;
pub mod validate;

pub use cache::{PriceCache, PublishGuard, ValidatedPrice};
pub use error::{OracleError, OracleResult};
pub use report::{BlockRange, PriceBatch, PriceReport, PROOF_BYTES};
pub use validate::{OracleConfig, OracleGate};
