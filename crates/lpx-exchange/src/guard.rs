//! The global exclusion lock.
//!
//! Every public pipeline operation runs under this lock. Acquisition is
//! non-blocking: a call arriving while another is active fails with
//! `Reentrant` rather than waiting, which turns any reentrant callback
//! (for example a ledger implementation calling back into the pipeline
//! mid-commit) into an immediate error. Release is tied to the token's
//! drop, so the lock cannot leak on early returns.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{ExchangeError, ExchangeResult};

/// Non-reentrant global lock.
#[derive(Debug, Default)]
pub struct ExclusionGuard {
    held: AtomicBool,
}

/// Proof of holding the exclusion lock; releases it on drop.
#[derive(Debug)]
pub struct ExclusionToken<'a> {
    guard: &'a ExclusionGuard,
}

impl ExclusionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock or fail immediately if it is held.
    pub fn try_acquire(&self) -> ExchangeResult<ExclusionToken<'_>> {
        if self
            .held
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            lpx_telemetry::metrics::REENTRANCY_REJECTIONS.inc();
            return Err(ExchangeError::Reentrant);
        }
        Ok(ExclusionToken { guard: self })
    }

    /// True while some token is alive.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

impl Drop for ExclusionToken<'_> {
    fn drop(&mut self) {
        self.guard.held.store(false, Ordering::SeqCst);
    }
}
