//! Block numbering.
//!
//! The pipeline is driven by an externally advanced block height: request
//! age, oracle report freshness and event stamping are all expressed in
//! blocks, never in wall-clock time.

use std::sync::atomic::{AtomicU64, Ordering};

/// Block height.
pub type BlockNumber = u64;

/// Source of the current block number.
///
/// Advanced by the embedding system; read by the pipeline at the entry of
/// every guarded operation. Monotonic — `advance` only moves forward.
#[derive(Debug, Default)]
pub struct BlockClock {
    current: AtomicU64,
}

impl BlockClock {
    /// Create a clock starting at the given block.
    pub fn new(start: BlockNumber) -> Self {
        Self {
            current: AtomicU64::new(start),
        }
    }

    /// Current block number.
    pub fn current(&self) -> BlockNumber {
        self.current.load(Ordering::SeqCst)
    }

    /// Advance by `n` blocks, returning the new height.
    pub fn advance(&self, n: u64) -> BlockNumber {
        self.current.fetch_add(n, Ordering::SeqCst) + n
    }
}
