//! Token ledger for the LPX pipeline.
//!
//! Tracks free account balances, the per-token escrow pot, per-market
//! pool balances, market-token supply and open interest. The pipeline's
//! rollback boundary is built on `VaultLedger::apply`: a journaled batch
//! of operations is validated in full and applied in full, or not at all.

pub mod error;
pub mod ledger;

pub use error::{VaultError, VaultResult};
pub use ledger::{InMemoryVault, VaultLedger, VaultOp};
