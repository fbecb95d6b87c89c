//! Resource budget control.
//!
//! Execution runs against a metered sub-budget carved out of the
//! keeper's remaining transaction budget, minus a fixed reserve that
//! stays untouched for the cancellation path. A request that exhausts
//! its sub-budget fails with the recoverable `BudgetExhausted`, and the
//! reserve guarantees the subsequent cancellation can still run. A
//! remaining budget that cannot even cover the reserve is fatal.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use lpx_core::{Budget, RequestKind};

use crate::error::{ExchangeError, ExchangeResult};

/// Budget parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Units withheld from every execution for the cancellation path.
    #[serde(default = "default_fixed_reserve")]
    pub fixed_reserve: Budget,
    /// Upper bound on the cancellation reason recorded in events.
    #[serde(default = "default_max_reason_len")]
    pub max_reason_len: usize,
    /// Estimated execution cost per request kind.
    #[serde(default = "default_deposit_cost")]
    pub deposit_execution_cost: Budget,
    #[serde(default = "default_withdrawal_cost")]
    pub withdrawal_execution_cost: Budget,
    #[serde(default = "default_order_cost")]
    pub order_execution_cost: Budget,
    /// Estimated cost of the cancellation path. Must fit inside
    /// `fixed_reserve`.
    #[serde(default = "default_cancellation_cost")]
    pub cancellation_cost: Budget,
}

fn default_fixed_reserve() -> Budget {
    Budget::new(100)
}

fn default_max_reason_len() -> usize {
    256
}

fn default_deposit_cost() -> Budget {
    Budget::new(120)
}

fn default_withdrawal_cost() -> Budget {
    Budget::new(120)
}

fn default_order_cost() -> Budget {
    Budget::new(150)
}

fn default_cancellation_cost() -> Budget {
    Budget::new(60)
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            fixed_reserve: default_fixed_reserve(),
            max_reason_len: default_max_reason_len(),
            deposit_execution_cost: default_deposit_cost(),
            withdrawal_execution_cost: default_withdrawal_cost(),
            order_execution_cost: default_order_cost(),
            cancellation_cost: default_cancellation_cost(),
        }
    }
}

/// Deterministic per-kind cost estimates, used for the create-time fee
/// preflight.
#[derive(Debug, Clone)]
pub struct CostEstimator {
    config: BudgetConfig,
}

impl CostEstimator {
    pub fn new(config: BudgetConfig) -> Self {
        Self { config }
    }

    pub fn execution_cost(&self, kind: &RequestKind) -> Budget {
        match kind {
            RequestKind::Deposit(_) => self.config.deposit_execution_cost,
            RequestKind::Withdrawal(_) => self.config.withdrawal_execution_cost,
            RequestKind::Order(_) => self.config.order_execution_cost,
        }
    }

    pub fn cancellation_cost(&self, _kind: &RequestKind) -> Budget {
        self.config.cancellation_cost
    }

    /// Minimum fee a request must prepay: worst case is executing up to
    /// the point of failure and then cancelling.
    pub fn required_fee(&self, kind: &RequestKind) -> Budget {
        self.execution_cost(kind)
            .saturating_add(self.cancellation_cost(kind))
    }
}

/// Metered allowance for one execution attempt.
#[derive(Debug)]
pub struct BudgetMeter {
    remaining: AtomicU64,
}

impl BudgetMeter {
    pub fn new(budget: Budget) -> Self {
        Self {
            remaining: AtomicU64::new(budget.units()),
        }
    }

    pub fn remaining(&self) -> Budget {
        Budget::new(self.remaining.load(Ordering::SeqCst))
    }

    /// Deduct `cost`, or fail with the recoverable `BudgetExhausted`
    /// when the meter cannot cover it.
    pub fn charge(&self, cost: Budget) -> ExchangeResult<()> {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |r| {
                r.checked_sub(cost.units())
            })
            .map(|_| ())
            .map_err(|_| ExchangeError::BudgetExhausted)
    }
}
