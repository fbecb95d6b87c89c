//! Prometheus metrics for the LPX pipeline.
//!
//! Observability over the request lifecycle:
//! - Requests created / completed / cancelled, by kind and outcome
//! - Oracle batch rejections by error kind
//! - Reentrancy rejections and budget exhaustions
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration
//! fails, it indicates a fatal configuration error (e.g., duplicate
//! metric names) that should crash at startup rather than fail silently.
//! These panics only occur during static initialization, never at
//! runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_int_counter, register_int_gauge, CounterVec, IntCounter,
    IntGauge,
};

/// Requests created, labeled by kind.
pub static REQUESTS_CREATED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "lpx_requests_created_total",
        "Requests accepted into the store",
        &["kind"]
    )
    .unwrap()
});

/// Requests reaching a terminal state, labeled by kind and outcome
/// (completed / cancelled_by_keeper / cancelled_by_user).
pub static REQUESTS_TERMINAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "lpx_requests_terminal_total",
        "Requests reaching a terminal state",
        &["kind", "outcome"]
    )
    .unwrap()
});

/// Oracle batch rejections, labeled by error kind.
pub static ORACLE_REJECTIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "lpx_oracle_rejections_total",
        "Price batches rejected by the oracle gate",
        &["error"]
    )
    .unwrap()
});

/// Guarded calls rejected because the exclusion lock was held.
pub static REENTRANCY_REJECTIONS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "lpx_reentrancy_rejections_total",
        "Guarded calls rejected while another was active"
    )
    .unwrap()
});

/// Executions that exhausted their sub-budget and fell back to
/// cancellation.
pub static BUDGET_EXHAUSTIONS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "lpx_budget_exhaustions_total",
        "Executions cancelled after exhausting the execution budget"
    )
    .unwrap()
});

/// Requests currently pending in the store.
pub static PENDING_REQUESTS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("lpx_pending_requests", "Requests pending in the store").unwrap()
});
