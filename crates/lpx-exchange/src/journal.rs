//! The effect journal.
//!
//! Execution engines never touch the ledger directly. They record the
//! ledger operations a request implies into a journal, and the pipeline
//! commits the whole journal atomically once the engine has finished.
//! Dropping an uncommitted journal discards every recorded effect, which
//! is what both failure paths and simulation rely on.

use lpx_vault::{VaultLedger, VaultOp, VaultResult};

/// Ordered batch of pending ledger operations.
#[derive(Debug, Default)]
pub struct EffectJournal {
    ops: Vec<VaultOp>,
}

impl EffectJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, op: VaultOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[VaultOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply every recorded operation to the ledger, all-or-nothing.
    pub fn commit(self, vault: &dyn VaultLedger) -> VaultResult<()> {
        vault.apply(&self.ops)
    }
}
