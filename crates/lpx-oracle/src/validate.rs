//! Report validation and publication.
//!
//! Gates are checked in a fixed order with early return, cheapest and
//! most-fundamental first: signer, proof shape, confirmations, price
//! range, then block constraints. Nothing is published until every report
//! in the batch has passed.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use lpx_core::{BlockNumber, Price};

use crate::cache::{PriceCache, PublishGuard, ValidatedPrice};
use crate::error::{OracleError, OracleResult};
use crate::report::{PriceBatch, PriceReport, PROOF_BYTES};

/// Oracle gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Maximum allowed age of a report's source block, in blocks.
    #[serde(default = "default_max_price_age_blocks")]
    pub max_price_age_blocks: u64,
    /// Minimum confirmations behind the source block.
    #[serde(default = "default_min_confirmations")]
    pub min_confirmations: u32,
    /// Signers allowed to submit reports.
    #[serde(default)]
    pub authorized_signers: HashSet<String>,
}

fn default_max_price_age_blocks() -> u64 {
    30
}

fn default_min_confirmations() -> u32 {
    2
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            max_price_age_blocks: default_max_price_age_blocks(),
            min_confirmations: default_min_confirmations(),
            authorized_signers: HashSet::new(),
        }
    }
}

/// Validates report batches and publishes them into the price cache.
#[derive(Debug)]
pub struct OracleGate {
    config: OracleConfig,
    cache: PriceCache,
}

impl OracleGate {
    pub fn new(config: OracleConfig) -> Self {
        Self {
            config,
            cache: PriceCache::new(),
        }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// True when nothing is currently published. Holds immediately
    /// before and after every guarded call.
    pub fn cache_is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Validate a batch and publish it for the duration of the returned
    /// guard. Any failure leaves the cache untouched.
    pub fn publish(
        &self,
        batch: &PriceBatch,
        current_block: BlockNumber,
    ) -> OracleResult<PublishGuard<'_>> {
        if batch.reports.is_empty() {
            return Err(OracleError::EmptyReports);
        }

        let mut validated = Vec::with_capacity(batch.reports.len());
        for report in &batch.reports {
            let price = self.validate_report(report, batch, current_block)?;
            validated.push((report.token.clone(), price));
        }

        for (token, price) in validated {
            self.cache.insert(token, price);
        }
        debug!(
            reports = batch.reports.len(),
            current_block, "Price batch published"
        );
        Ok(PublishGuard::new(&self.cache))
    }

    fn validate_report(
        &self,
        report: &PriceReport,
        batch: &PriceBatch,
        current_block: BlockNumber,
    ) -> OracleResult<ValidatedPrice> {
        // Gate 1: signer authorization.
        if !self.config.authorized_signers.contains(&report.signer) {
            warn!(token = %report.token, signer = %report.signer, "Unauthorized oracle signer");
            return Err(OracleError::UnauthorizedSigner(report.signer.clone()));
        }

        // Gate 2: proof shape. The proof must decode to a full signature.
        let bytes = hex::decode(&report.proof).map_err(|e| OracleError::MalformedProof {
            token: report.token.clone(),
            detail: e.to_string(),
        })?;
        if bytes.len() != PROOF_BYTES {
            return Err(OracleError::MalformedProof {
                token: report.token.clone(),
                detail: format!("expected {} bytes, got {}", PROOF_BYTES, bytes.len()),
            });
        }

        // Gate 3: confirmation depth.
        if report.confirmations < self.config.min_confirmations {
            return Err(OracleError::InsufficientConfirmations {
                token: report.token.clone(),
                got: report.confirmations,
                min: self.config.min_confirmations,
            });
        }

        // Gate 4: price sanity. min must be positive, not exceed max,
        // and the band midpoint must be representable.
        if !report.min_price.is_positive()
            || report.min_price > report.max_price
            || Price::midpoint(report.min_price, report.max_price).is_none()
        {
            return Err(OracleError::InvalidPriceRange(report.token.clone()));
        }

        // Gate 5: freshness. A source block in the future is as invalid
        // as one that is too old.
        let age = current_block.checked_sub(report.source_block);
        match age {
            Some(age) if age <= self.config.max_price_age_blocks => {}
            _ => {
                warn!(
                    token = %report.token,
                    source_block = report.source_block,
                    current_block,
                    "Stale or future-dated oracle report"
                );
                return Err(OracleError::StaleOraclePrice {
                    token: report.token.clone(),
                    source_block: report.source_block,
                    current_block,
                    max_age_blocks: self.config.max_price_age_blocks,
                });
            }
        }

        // Gate 6: caller-pinned block range, when present.
        if let Some(range) = batch.block_ranges.get(&report.token) {
            if !range.contains(report.source_block) {
                return Err(OracleError::InvalidBlockRange {
                    token: report.token.clone(),
                    source_block: report.source_block,
                    min_block: range.min_block,
                    max_block: range.max_block,
                });
            }
        }

        Ok(ValidatedPrice {
            min: report.min_price,
            max: report.max_price,
            source_block: report.source_block,
        })
    }
}
