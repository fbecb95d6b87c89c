//! Roles, feature flags and market configuration for LPX.
//!
//! These are the governance-facing collaborators the pipeline consults at
//! the entry of every guarded operation: who may call what, which
//! operations are switched off, and what each market permits.

pub mod error;
pub mod features;
pub mod markets;
pub mod roles;

pub use error::{RegistryError, RegistryResult};
pub use features::{FeatureFlags, FeatureKey};
pub use markets::{MarketConfig, MarketRegistry};
pub use roles::RoleRegistry;
