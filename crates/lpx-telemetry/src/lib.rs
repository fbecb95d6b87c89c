//! Telemetry for the LPX pipeline.
//!
//! - Structured logging via tracing (JSON in production, pretty in dev)
//! - Prometheus metrics for request lifecycle and gate rejections

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
