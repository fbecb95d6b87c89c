//! The public pipeline surface.
//!
//! `Exchange` wires the collaborators together and exposes the five
//! operations of the request lifecycle:
//!
//! - `create_deposit` / `create_withdrawal` / `create_order` — controller
//!   path; preflights the execution fee, escrows the request's tokens and
//!   stores it.
//! - `cancel` — controller path; refunds escrow after the minimum age.
//! - `execute` — keeper path; publishes prices, runs the engine inside
//!   the rollback boundary, and on recoverable failure falls back to
//!   cancellation with a refund.
//! - `simulate` — controller path; runs the engine without committing.
//!
//! Every operation acquires the global exclusion lock for its whole
//! duration and the oracle cache is empty again by the time it returns.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use lpx_core::{
    AccountId, BlockClock, BlockNumber, Budget, DepositParams, EventLog, MarketId, OrderParams,
    Request, RequestEvent, RequestId, RequestKind, WithdrawalParams,
};
use lpx_oracle::{OracleError, OracleGate, PriceBatch, PublishGuard};
use lpx_registry::{FeatureFlags, FeatureKey, MarketRegistry, RoleRegistry};
use lpx_telemetry::metrics;
use lpx_vault::VaultLedger;

use crate::budget::{BudgetMeter, CostEstimator};
use crate::config::ExchangeConfig;
use crate::engine::{self, EngineCtx};
use crate::error::{DomainError, ExchangeError, ExchangeResult};
use crate::guard::ExclusionGuard;
use crate::journal::EffectJournal;
use crate::store::RequestStore;

/// Result of a successful `execute` call.
///
/// Both variants destroy the request. Keepers do not branch on the
/// outcome; the requester learns which path ran from the event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The request's effects were committed.
    Completed,
    /// A recoverable failure cancelled the request; escrow was refunded.
    Cancelled { reason: String },
}

/// The request execution pipeline.
pub struct Exchange {
    config: ExchangeConfig,
    store: RequestStore,
    guard: ExclusionGuard,
    gate: OracleGate,
    estimator: CostEstimator,
    roles: RoleRegistry,
    features: FeatureFlags,
    markets: MarketRegistry,
    vault: Arc<dyn VaultLedger>,
    events: Arc<dyn EventLog>,
    clock: Arc<BlockClock>,
}

impl Exchange {
    pub fn new(
        config: ExchangeConfig,
        vault: Arc<dyn VaultLedger>,
        events: Arc<dyn EventLog>,
        clock: Arc<BlockClock>,
    ) -> ExchangeResult<Self> {
        config.validate()?;

        let markets = MarketRegistry::new();
        for market in &config.markets {
            markets
                .register(market.clone())
                .map_err(|e| ExchangeError::Config(e.to_string()))?;
        }

        let gate = OracleGate::new(config.oracle.clone());
        let estimator = CostEstimator::new(config.budget.clone());

        Ok(Self {
            config,
            store: RequestStore::new(),
            guard: ExclusionGuard::new(),
            gate,
            estimator,
            roles: RoleRegistry::new(),
            features: FeatureFlags::new(),
            markets,
            vault,
            events,
            clock,
        })
    }

    /// Governance handle: role grants and revocations.
    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    /// Governance handle: feature kill-switches.
    pub fn features(&self) -> &FeatureFlags {
        &self.features
    }

    /// Governance handle: market registration and toggling.
    pub fn markets(&self) -> &MarketRegistry {
        &self.markets
    }

    /// Number of requests currently pending.
    pub fn pending_count(&self) -> usize {
        self.store.len()
    }

    /// True when no prices are published. Holds between guarded calls.
    pub fn oracle_cache_is_empty(&self) -> bool {
        self.gate.cache_is_empty()
    }

    /// Pending request lookup, for controllers and monitoring.
    pub fn request(&self, id: RequestId) -> Option<Request> {
        self.store.get(&id)
    }

    pub fn create_deposit(
        &self,
        caller: &AccountId,
        account: &AccountId,
        market: &MarketId,
        params: DepositParams,
        execution_fee: Budget,
    ) -> ExchangeResult<RequestId> {
        self.create(caller, account, market, RequestKind::Deposit(params), execution_fee)
    }

    pub fn create_withdrawal(
        &self,
        caller: &AccountId,
        account: &AccountId,
        market: &MarketId,
        params: WithdrawalParams,
        execution_fee: Budget,
    ) -> ExchangeResult<RequestId> {
        self.create(
            caller,
            account,
            market,
            RequestKind::Withdrawal(params),
            execution_fee,
        )
    }

    pub fn create_order(
        &self,
        caller: &AccountId,
        account: &AccountId,
        market: &MarketId,
        params: OrderParams,
        execution_fee: Budget,
    ) -> ExchangeResult<RequestId> {
        self.create(caller, account, market, RequestKind::Order(params), execution_fee)
    }

    fn create(
        &self,
        caller: &AccountId,
        account: &AccountId,
        market: &MarketId,
        kind: RequestKind,
        execution_fee: Budget,
    ) -> ExchangeResult<RequestId> {
        self.require_controller(caller)?;
        let _lock = self.guard.try_acquire()?;
        self.require_enabled_feature(FeatureKey::create(kind.name()))?;

        let required = self.estimator.required_fee(&kind);
        if execution_fee < required {
            return Err(ExchangeError::InsufficientExecutionFee {
                provided: execution_fee,
                required,
            });
        }

        let market_config = self
            .markets
            .get(market)
            .map_err(|_| ExchangeError::UnknownMarket(market.clone()))?;

        let (escrow_token, escrow_amount) = kind.escrow(&market_config.market_token);
        if !escrow_amount.is_positive() {
            return Err(DomainError::EmptyAmount.into());
        }
        self.vault.escrow(account, &escrow_token, escrow_amount)?;

        let id = self.store.next_id();
        let block = self.clock.current();
        let kind_name = kind.name();
        let data = serde_json::to_value(&kind).unwrap_or_default();
        self.store.insert(Request {
            id,
            account: account.clone(),
            market: market.clone(),
            kind,
            created_at_block: block,
            updated_at_block: block,
            execution_fee,
        });

        metrics::REQUESTS_CREATED.with_label_values(&[kind_name]).inc();
        metrics::PENDING_REQUESTS.set(self.store.len() as i64);
        self.events.emit(RequestEvent::Created {
            id,
            account: account.clone(),
            kind: kind_name.to_string(),
            block,
            data,
        });
        info!(%id, %account, %market, kind = kind_name, block, "Request created");
        Ok(id)
    }

    /// Cancel a pending request on the requester's behalf, refunding its
    /// escrow. Rejected until the request has aged past the configured
    /// minimum, so a keeper gets first claim on fresh requests.
    pub fn cancel(&self, caller: &AccountId, id: RequestId) -> ExchangeResult<()> {
        self.require_controller(caller)?;
        let _lock = self.guard.try_acquire()?;

        let request = self.store.get(&id).ok_or(ExchangeError::NotFound(id))?;
        self.require_enabled_feature(FeatureKey::cancel(request.kind.name()))?;

        let block = self.clock.current();
        let age = request.age_at(block);
        if age < self.config.min_request_age_blocks {
            return Err(ExchangeError::RequestTooYoung {
                age,
                min: self.config.min_request_age_blocks,
            });
        }

        self.refund_escrow(&request)?;
        self.store.remove(&id);

        metrics::REQUESTS_TERMINAL
            .with_label_values(&[request.kind.name(), "cancelled_by_user"])
            .inc();
        metrics::PENDING_REQUESTS.set(self.store.len() as i64);
        self.events.emit(RequestEvent::CancelledByUser {
            id,
            account: request.account.clone(),
            kind: request.kind.name().to_string(),
            block,
        });
        info!(%id, account = %request.account, block, "Request cancelled by user");
        Ok(())
    }

    /// Execute a pending request with keeper-supplied prices.
    ///
    /// `remaining_budget` is the keeper's remaining transaction
    /// allowance; execution runs against that minus the fixed
    /// cancellation reserve. A recoverable failure cancels the request
    /// and still returns `Ok`; only the fatal taxonomy uses the error
    /// channel.
    pub fn execute(
        &self,
        caller: &AccountId,
        id: RequestId,
        batch: &PriceBatch,
        remaining_budget: Budget,
    ) -> ExchangeResult<Outcome> {
        self.require_keeper(caller)?;
        let _lock = self.guard.try_acquire()?;

        let request = self.store.get(&id).ok_or(ExchangeError::NotFound(id))?;
        self.require_enabled_feature(FeatureKey::execute(request.kind.name()))?;

        let block = self.clock.current();
        let prices = self.publish_prices(batch, block)?;

        let reserve = self.config.budget.fixed_reserve;
        let execution_budget =
            remaining_budget
                .checked_sub(reserve)
                .ok_or(ExchangeError::InsufficientBudget {
                    remaining: remaining_budget,
                    reserve,
                })?;
        let meter = BudgetMeter::new(execution_budget);

        match self.run_engine(&request, &prices, &meter) {
            Ok((journal, output)) => {
                if let Err(e) = journal.commit(self.vault.as_ref()) {
                    // Commit rejections are market conditions like any
                    // other domain failure.
                    return self.cancel_on_failure(&request, DomainError::Vault(e).into(), block);
                }
                self.store.remove(&id);
                metrics::REQUESTS_TERMINAL
                    .with_label_values(&[request.kind.name(), "completed"])
                    .inc();
                metrics::PENDING_REQUESTS.set(self.store.len() as i64);
                self.events.emit(RequestEvent::Completed {
                    id,
                    account: request.account.clone(),
                    kind: request.kind.name().to_string(),
                    block,
                    data: output,
                });
                info!(%id, account = %request.account, block, "Request executed");
                Ok(Outcome::Completed)
            }
            Err(e) if e.is_recoverable() => self.cancel_on_failure(&request, e, block),
            Err(e) => {
                warn!(%id, error = %e, "Execution failed fatally; request stays pending");
                Err(e)
            }
        }
    }

    /// Dry-run a pending request: full gate and engine pass, nothing
    /// committed, the request untouched. Unlike `execute`, every failure
    /// propagates, recoverable or not.
    pub fn simulate(
        &self,
        caller: &AccountId,
        id: RequestId,
        batch: &PriceBatch,
        remaining_budget: Budget,
    ) -> ExchangeResult<Value> {
        self.require_controller(caller)?;
        let _lock = self.guard.try_acquire()?;

        let request = self.store.get(&id).ok_or(ExchangeError::NotFound(id))?;
        self.require_enabled_feature(FeatureKey::execute(request.kind.name()))?;

        let block = self.clock.current();
        let prices = self.publish_prices(batch, block)?;

        let reserve = self.config.budget.fixed_reserve;
        let execution_budget =
            remaining_budget
                .checked_sub(reserve)
                .ok_or(ExchangeError::InsufficientBudget {
                    remaining: remaining_budget,
                    reserve,
                })?;
        let meter = BudgetMeter::new(execution_budget);

        let (journal, output) = self.run_engine(&request, &prices, &meter)?;
        debug!(%id, ops = journal.len(), "Simulation complete");
        // The journal is dropped here; no effect reaches the ledger.
        Ok(output)
    }

    fn run_engine(
        &self,
        request: &Request,
        prices: &PublishGuard<'_>,
        meter: &BudgetMeter,
    ) -> ExchangeResult<(EffectJournal, Value)> {
        // Creation verified the market, and markets are never removed.
        let market = self.markets.get(&request.market).map_err(|e| {
            ExchangeError::Internal(format!("market lost for pending request: {e}"))
        })?;
        let ctx = EngineCtx {
            request,
            market: &market,
            prices,
            vault: self.vault.as_ref(),
            meter,
        };
        engine::run(&ctx)
    }

    /// The fallback canceller: destroy the request, refund its escrow
    /// and record the bounded failure reason.
    fn cancel_on_failure(
        &self,
        request: &Request,
        err: ExchangeError,
        block: BlockNumber,
    ) -> ExchangeResult<Outcome> {
        if matches!(err, ExchangeError::BudgetExhausted) {
            metrics::BUDGET_EXHAUSTIONS.inc();
        }

        let reason = match &err {
            ExchangeError::Domain(domain) => domain.reason(),
            ExchangeError::BudgetExhausted => "ExecutionBudgetExhausted".to_string(),
            other => other.to_string(),
        };
        let max = self.config.budget.max_reason_len;
        if reason.len() > max {
            return Err(ExchangeError::OversizedReason {
                len: reason.len(),
                max,
            });
        }

        self.refund_escrow(request).map_err(|e| {
            ExchangeError::Internal(format!("escrow refund failed during cancellation: {e}"))
        })?;
        self.store.remove(&request.id);

        metrics::REQUESTS_TERMINAL
            .with_label_values(&[request.kind.name(), "cancelled_by_keeper"])
            .inc();
        metrics::PENDING_REQUESTS.set(self.store.len() as i64);
        self.events.emit(RequestEvent::CancelledByKeeper {
            id: request.id,
            account: request.account.clone(),
            kind: request.kind.name().to_string(),
            block,
            reason: reason.clone(),
        });
        warn!(
            id = %request.id,
            account = %request.account,
            %reason,
            block,
            "Request cancelled after recoverable failure"
        );
        Ok(Outcome::Cancelled { reason })
    }

    /// Refund exactly the escrow taken at creation. Price-free by
    /// construction.
    fn refund_escrow(&self, request: &Request) -> ExchangeResult<()> {
        let market_config = self
            .markets
            .get(&request.market)
            .map_err(|e| ExchangeError::Internal(format!("market lost for refund: {e}")))?;
        let (token, amount) = request.kind.escrow(&market_config.market_token);
        self.vault.release_escrow(&request.account, &token, amount)?;
        Ok(())
    }

    fn publish_prices<'a>(
        &'a self,
        batch: &PriceBatch,
        block: BlockNumber,
    ) -> ExchangeResult<PublishGuard<'a>> {
        self.gate.publish(batch, block).map_err(|e| {
            metrics::ORACLE_REJECTIONS
                .with_label_values(&[oracle_error_label(&e)])
                .inc();
            ExchangeError::Oracle(e)
        })
    }

    fn require_controller(&self, caller: &AccountId) -> ExchangeResult<()> {
        if !self.roles.is_controller(caller) {
            return Err(ExchangeError::Unauthorized {
                account: caller.clone(),
                role: "controller",
            });
        }
        Ok(())
    }

    fn require_keeper(&self, caller: &AccountId) -> ExchangeResult<()> {
        if !self.roles.is_keeper(caller) {
            return Err(ExchangeError::Unauthorized {
                account: caller.clone(),
                role: "keeper",
            });
        }
        Ok(())
    }

    fn require_enabled_feature(&self, key: FeatureKey) -> ExchangeResult<()> {
        if self.features.is_disabled(&key) {
            warn!(feature = %key, "Rejected by feature kill-switch");
            return Err(ExchangeError::DisabledFeature(key));
        }
        Ok(())
    }
}

fn oracle_error_label(err: &OracleError) -> &'static str {
    match err {
        OracleError::EmptyReports => "empty_reports",
        OracleError::UnauthorizedSigner(_) => "unauthorized_signer",
        OracleError::MalformedProof { .. } => "malformed_proof",
        OracleError::InsufficientConfirmations { .. } => "insufficient_confirmations",
        OracleError::StaleOraclePrice { .. } => "stale_price",
        OracleError::InvalidBlockRange { .. } => "invalid_block_range",
        OracleError::InvalidPriceRange(_) => "invalid_price_range",
        OracleError::MissingPrice(_) => "missing_price",
    }
}
