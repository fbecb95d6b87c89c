//! End-to-end pipeline tests against the in-memory ledger.

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use std::sync::Arc;

use lpx_core::{
    AccountId, Amount, BlockClock, Budget, DepositParams, InMemoryEventLog, MarketId, OrderParams,
    Price, RequestEvent, RequestId, Side, TokenSymbol, WithdrawalParams,
};
use lpx_exchange::{DomainError, Exchange, ExchangeConfig, ExchangeError, Outcome};
use lpx_oracle::{OracleError, PriceBatch, PriceReport, PROOF_BYTES};
use lpx_registry::{FeatureKey, MarketConfig};
use lpx_vault::{InMemoryVault, VaultLedger, VaultOp, VaultResult};

const SIGNER: &str = "signer-a";

fn ctrl() -> AccountId {
    AccountId::from("ctrl")
}

fn keeper() -> AccountId {
    AccountId::from("keeper")
}

fn alice() -> AccountId {
    AccountId::from("alice")
}

fn market() -> MarketId {
    MarketId::from("ETH-USD")
}

fn weth() -> TokenSymbol {
    TokenSymbol::from("WETH")
}

fn usdc() -> TokenSymbol {
    TokenSymbol::from("USDC")
}

fn lp() -> TokenSymbol {
    TokenSymbol::from("LP-ETHUSD")
}

fn test_config() -> ExchangeConfig {
    let mut config = ExchangeConfig::default();
    config.min_request_age_blocks = 10;
    config.oracle.max_price_age_blocks = 30;
    config.oracle.min_confirmations = 2;
    config.oracle.authorized_signers = [SIGNER.to_string()].into_iter().collect();
    config.markets = vec![MarketConfig {
        market: market(),
        enabled: true,
        long_token: weth(),
        short_token: usdc(),
        market_token: lp(),
        max_pool_amount: Amount::new(dec!(1000000)),
        max_open_interest: Amount::new(dec!(5000)),
        max_order_size: Amount::new(dec!(100)),
    }];
    config
}

struct Fixture {
    exchange: Exchange,
    vault: Arc<InMemoryVault>,
    events: Arc<InMemoryEventLog>,
    clock: Arc<BlockClock>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(test_config())
    }

    fn with_config(config: ExchangeConfig) -> Self {
        let vault = Arc::new(InMemoryVault::new());
        let events = Arc::new(InMemoryEventLog::new());
        let clock = Arc::new(BlockClock::new(100));
        let exchange = Exchange::new(
            config,
            vault.clone() as Arc<dyn VaultLedger>,
            events.clone(),
            clock.clone(),
        )
        .unwrap();
        exchange.roles().grant_controller(ctrl());
        exchange.roles().grant_keeper(keeper());
        vault.credit(&alice(), &weth(), Amount::new(dec!(10000)));
        vault.credit(&alice(), &usdc(), Amount::new(dec!(10000)));
        Self {
            exchange,
            vault,
            events,
            clock,
        }
    }

    /// Fresh batch covering both pool tokens: WETH at 99/101, USDC at
    /// par.
    fn batch(&self) -> PriceBatch {
        let source = self.clock.current() - 2;
        PriceBatch::new(vec![
            report(weth(), dec!(99), dec!(101), source),
            report(usdc(), dec!(1), dec!(1), source),
        ])
    }

    fn create_deposit(&self, amount: rust_decimal::Decimal) -> RequestId {
        self.exchange
            .create_deposit(
                &ctrl(),
                &alice(),
                &market(),
                DepositParams {
                    token: weth(),
                    amount: Amount::new(amount),
                    min_market_tokens: Amount::ZERO,
                },
                Budget::new(500),
            )
            .unwrap()
    }

    /// Seed the pool: deposit and execute 1000 WETH for alice.
    fn seed_pool(&self) -> RequestId {
        let id = self.create_deposit(dec!(1000));
        let outcome = self
            .exchange
            .execute(&keeper(), id, &self.batch(), Budget::new(1000))
            .unwrap();
        assert_eq!(outcome, Outcome::Completed);
        id
    }
}

fn report(
    token: TokenSymbol,
    min: rust_decimal::Decimal,
    max: rust_decimal::Decimal,
    source_block: u64,
) -> PriceReport {
    PriceReport {
        token,
        min_price: Price::new(min),
        max_price: Price::new(max),
        source_block,
        confirmations: 3,
        signer: SIGNER.to_string(),
        proof: hex::encode([0x5a; PROOF_BYTES]),
    }
}

#[test]
fn deposit_executes_and_mints_market_tokens() {
    let fx = Fixture::new();
    let id = fx.create_deposit(dec!(1000));

    // Creation escrowed the deposit immediately.
    assert_eq!(fx.vault.balance(&alice(), &weth()), Amount::new(dec!(9000)));
    assert_eq!(fx.vault.escrowed(&weth()), Amount::new(dec!(1000)));

    let outcome = fx
        .exchange
        .execute(&keeper(), id, &fx.batch(), Budget::new(1000))
        .unwrap();
    assert_eq!(outcome, Outcome::Completed);

    // Escrow drained into the pool, market tokens minted at par:
    // 1000 WETH at mid 100 = 100000 value, initial price one.
    assert_eq!(fx.vault.escrowed(&weth()), Amount::ZERO);
    assert_eq!(
        fx.vault.pool_balance(&market(), &weth()),
        Amount::new(dec!(1000))
    );
    assert_eq!(fx.vault.market_token_supply(&lp()), Amount::new(dec!(100000)));
    assert_eq!(fx.vault.balance(&alice(), &lp()), Amount::new(dec!(100000)));

    // The request is gone and exactly one terminal event exists.
    assert_eq!(fx.exchange.pending_count(), 0);
    let terminal = fx.events.terminal_events_for(id);
    assert_eq!(terminal.len(), 1);
    assert!(matches!(terminal[0], RequestEvent::Completed { .. }));
    assert!(fx.exchange.oracle_cache_is_empty());
}

#[test]
fn withdrawal_violating_pool_constraint_is_cancelled_with_refund() {
    let fx = Fixture::new();
    fx.seed_pool();
    let lp_before = fx.vault.balance(&alice(), &lp());

    // 500 market tokens redeem to 500 USDC at these prices, but the
    // USDC pool side is empty.
    let id = fx
        .exchange
        .create_withdrawal(
            &ctrl(),
            &alice(),
            &market(),
            WithdrawalParams {
                market_token_amount: Amount::new(dec!(500)),
                out_token: usdc(),
                min_out: Amount::ZERO,
            },
            Budget::new(500),
        )
        .unwrap();
    assert_eq!(fx.vault.escrowed(&lp()), Amount::new(dec!(500)));

    let outcome = fx
        .exchange
        .execute(&keeper(), id, &fx.batch(), Budget::new(1000))
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::Cancelled {
            reason: "MaxPoolAmountExceeded".to_string()
        }
    );

    // Escrowed market tokens refunded in full; nothing burned or paid.
    assert_eq!(fx.vault.escrowed(&lp()), Amount::ZERO);
    assert_eq!(fx.vault.balance(&alice(), &lp()), lp_before);
    assert_eq!(fx.vault.pool_balance(&market(), &usdc()), Amount::ZERO);

    assert_eq!(fx.exchange.pending_count(), 0);
    let terminal = fx.events.terminal_events_for(id);
    assert_eq!(terminal.len(), 1);
    match &terminal[0] {
        RequestEvent::CancelledByKeeper { reason, .. } => {
            assert_eq!(reason, "MaxPoolAmountExceeded");
        }
        other => panic!("expected keeper cancellation, got {other:?}"),
    }
}

#[test]
fn user_cancellation_respects_minimum_age() {
    let fx = Fixture::new();
    fx.clock.advance(1);
    let id = fx.create_deposit(dec!(100));

    fx.clock.advance(1);
    let err = fx.exchange.cancel(&ctrl(), id).unwrap_err();
    assert_eq!(err, ExchangeError::RequestTooYoung { age: 1, min: 10 });
    // The rejected cancellation touched nothing.
    assert_eq!(fx.vault.escrowed(&weth()), Amount::new(dec!(100)));
    assert_eq!(fx.exchange.pending_count(), 1);

    fx.clock.advance(9);
    fx.exchange.cancel(&ctrl(), id).unwrap();
    assert_eq!(fx.vault.escrowed(&weth()), Amount::ZERO);
    assert_eq!(fx.vault.balance(&alice(), &weth()), Amount::new(dec!(10000)));
    assert_eq!(fx.exchange.pending_count(), 0);

    let terminal = fx.events.terminal_events_for(id);
    assert_eq!(terminal.len(), 1);
    assert!(matches!(terminal[0], RequestEvent::CancelledByUser { .. }));
}

#[test]
fn terminal_requests_are_gone_for_good() {
    let fx = Fixture::new();
    let id = fx.seed_pool();

    // Executing or cancelling a completed request reports NotFound.
    let err = fx
        .exchange
        .execute(&keeper(), id, &fx.batch(), Budget::new(1000))
        .unwrap_err();
    assert_eq!(err, ExchangeError::NotFound(id));
    fx.clock.advance(20);
    let err = fx.exchange.cancel(&ctrl(), id).unwrap_err();
    assert_eq!(err, ExchangeError::NotFound(id));

    // Still exactly one terminal event.
    assert_eq!(fx.events.terminal_events_for(id).len(), 1);
}

#[test]
fn stale_prices_fail_fatally_and_retry_succeeds() {
    let fx = Fixture::new();
    let id = fx.create_deposit(dec!(1000));

    let stale = PriceBatch::new(vec![report(weth(), dec!(99), dec!(101), 10)]);
    let err = fx
        .exchange
        .execute(&keeper(), id, &stale, Budget::new(1000))
        .unwrap_err();
    assert!(matches!(err, ExchangeError::Oracle(_)));
    assert!(!err.is_recoverable());

    // The request survived the fatal failure untouched.
    assert_eq!(fx.exchange.pending_count(), 1);
    assert_eq!(fx.vault.escrowed(&weth()), Amount::new(dec!(1000)));
    assert!(fx.events.terminal_events_for(id).is_empty());
    assert!(fx.exchange.oracle_cache_is_empty());

    // The same request executes once fresh prices arrive.
    let outcome = fx
        .exchange
        .execute(&keeper(), id, &fx.batch(), Budget::new(1000))
        .unwrap();
    assert_eq!(outcome, Outcome::Completed);
}

#[test]
fn budget_exhaustion_cancels_through_the_reserve() {
    let fx = Fixture::new();
    let id = fx.create_deposit(dec!(1000));

    // 108 units leave 8 for execution after the 100-unit reserve, not
    // enough to clear the precondition gates.
    let outcome = fx
        .exchange
        .execute(&keeper(), id, &fx.batch(), Budget::new(108))
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::Cancelled {
            reason: "ExecutionBudgetExhausted".to_string()
        }
    );

    // The reserve still funded a full refund.
    assert_eq!(fx.vault.escrowed(&weth()), Amount::ZERO);
    assert_eq!(fx.vault.balance(&alice(), &weth()), Amount::new(dec!(10000)));
    assert_eq!(fx.exchange.pending_count(), 0);
    assert_eq!(fx.events.terminal_events_for(id).len(), 1);
}

#[test]
fn budget_below_reserve_is_fatal() {
    let fx = Fixture::new();
    let id = fx.create_deposit(dec!(1000));

    let err = fx
        .exchange
        .execute(&keeper(), id, &fx.batch(), Budget::new(99))
        .unwrap_err();
    assert_eq!(
        err,
        ExchangeError::InsufficientBudget {
            remaining: Budget::new(99),
            reserve: Budget::new(100),
        }
    );
    // Fatal: the request stays pending with its escrow.
    assert_eq!(fx.exchange.pending_count(), 1);
    assert_eq!(fx.vault.escrowed(&weth()), Amount::new(dec!(1000)));
}

#[test]
fn extreme_price_band_fails_fatally_at_the_gate() {
    let fx = Fixture::new();
    let id = fx.create_deposit(dec!(1000));

    // A well-formed report whose band midpoint is not representable
    // must never reach the pricing step.
    let source = fx.clock.current() - 2;
    let top = rust_decimal::Decimal::MAX;
    let batch = PriceBatch::new(vec![report(weth(), top, top, source)]);
    let err = fx
        .exchange
        .execute(&keeper(), id, &batch, Budget::new(1000))
        .unwrap_err();
    assert_eq!(
        err,
        ExchangeError::Oracle(OracleError::InvalidPriceRange(weth()))
    );

    // Fatal: the request stays pending with its escrow.
    assert_eq!(fx.exchange.pending_count(), 1);
    assert_eq!(fx.vault.escrowed(&weth()), Amount::new(dec!(1000)));
    assert!(fx.events.terminal_events_for(id).is_empty());
    assert!(fx.exchange.oracle_cache_is_empty());
}

#[test]
fn overflowing_deposit_valuation_is_cancelled() {
    let mut config = test_config();
    config.markets[0].max_pool_amount = Amount::new(rust_decimal::Decimal::MAX);
    let fx = Fixture::with_config(config);
    fx.vault
        .credit(&alice(), &weth(), Amount::new(rust_decimal::Decimal::MAX));

    // Valuing the deposit at mid 100 overflows; that is a recoverable
    // domain failure, not a panic.
    let id = fx.create_deposit(rust_decimal::Decimal::MAX);
    let outcome = fx
        .exchange
        .execute(&keeper(), id, &fx.batch(), Budget::new(1000))
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::Cancelled {
            reason: "PrecisionLoss".to_string()
        }
    );
    assert_eq!(fx.vault.escrowed(&weth()), Amount::ZERO);
    assert_eq!(fx.vault.market_token_supply(&lp()), Amount::ZERO);
}

#[test]
fn oversized_cancellation_reason_is_fatal() {
    let mut config = test_config();
    config.budget.max_reason_len = 10;
    let fx = Fixture::with_config(config);
    fx.seed_pool();

    // The pool-constraint violation cancels with a 21-byte reason code,
    // over the configured bound.
    let id = fx
        .exchange
        .create_withdrawal(
            &ctrl(),
            &alice(),
            &market(),
            WithdrawalParams {
                market_token_amount: Amount::new(dec!(500)),
                out_token: usdc(),
                min_out: Amount::ZERO,
            },
            Budget::new(500),
        )
        .unwrap();

    let err = fx
        .exchange
        .execute(&keeper(), id, &fx.batch(), Budget::new(1000))
        .unwrap_err();
    assert_eq!(err, ExchangeError::OversizedReason { len: 21, max: 10 });

    // Fatal: no cancellation happened, the escrow is untouched.
    assert_eq!(fx.exchange.pending_count(), 1);
    assert_eq!(fx.vault.escrowed(&lp()), Amount::new(dec!(500)));
    assert!(fx.events.terminal_events_for(id).is_empty());
}

#[test]
fn disabled_execute_feature_leaves_request_pending() {
    let fx = Fixture::new();
    let id = fx.create_deposit(dec!(1000));
    fx.exchange.features().disable(FeatureKey::execute("deposit"));

    let err = fx
        .exchange
        .execute(&keeper(), id, &fx.batch(), Budget::new(1000))
        .unwrap_err();
    assert!(matches!(err, ExchangeError::DisabledFeature(_)));
    assert_eq!(fx.exchange.pending_count(), 1);

    fx.exchange.features().enable(&FeatureKey::execute("deposit"));
    assert!(fx
        .exchange
        .execute(&keeper(), id, &fx.batch(), Budget::new(1000))
        .is_ok());
}

#[test]
fn execute_requires_keeper_role() {
    let fx = Fixture::new();
    let id = fx.create_deposit(dec!(1000));

    let err = fx
        .exchange
        .execute(&ctrl(), id, &fx.batch(), Budget::new(1000))
        .unwrap_err();
    assert!(matches!(
        err,
        ExchangeError::Unauthorized { role: "keeper", .. }
    ));
}

#[test]
fn buy_order_executes_at_band_max() {
    let fx = Fixture::new();
    fx.seed_pool();

    let id = fx
        .exchange
        .create_order(
            &ctrl(),
            &alice(),
            &market(),
            OrderParams {
                side: Side::Buy,
                collateral_token: weth(),
                collateral_amount: Amount::new(dec!(50)),
                size: Amount::new(dec!(10)),
                acceptable_price: Price::new(dec!(102)),
            },
            Budget::new(500),
        )
        .unwrap();

    let outcome = fx
        .exchange
        .execute(&keeper(), id, &fx.batch(), Budget::new(1000))
        .unwrap();
    assert_eq!(outcome, Outcome::Completed);

    assert_eq!(fx.vault.open_interest(&market()), Amount::new(dec!(10)));
    // Collateral joined the pool on top of the seeded 1000.
    assert_eq!(
        fx.vault.pool_balance(&market(), &weth()),
        Amount::new(dec!(1050))
    );
}

#[test]
fn order_beyond_acceptable_price_is_cancelled() {
    let fx = Fixture::new();
    fx.seed_pool();
    let weth_before = fx.vault.balance(&alice(), &weth());

    // A buy capped at 100 cannot execute against a 101 band max.
    let id = fx
        .exchange
        .create_order(
            &ctrl(),
            &alice(),
            &market(),
            OrderParams {
                side: Side::Buy,
                collateral_token: weth(),
                collateral_amount: Amount::new(dec!(50)),
                size: Amount::new(dec!(10)),
                acceptable_price: Price::new(dec!(100)),
            },
            Budget::new(500),
        )
        .unwrap();

    let outcome = fx
        .exchange
        .execute(&keeper(), id, &fx.batch(), Budget::new(1000))
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::Cancelled {
            reason: "UnacceptablePrice".to_string()
        }
    );
    assert_eq!(fx.vault.balance(&alice(), &weth()), weth_before);
    assert_eq!(fx.vault.open_interest(&market()), Amount::ZERO);
}

#[test]
fn oversized_order_is_cancelled_with_reason() {
    let fx = Fixture::new();
    fx.seed_pool();

    let id = fx
        .exchange
        .create_order(
            &ctrl(),
            &alice(),
            &market(),
            OrderParams {
                side: Side::Sell,
                collateral_token: usdc(),
                collateral_amount: Amount::new(dec!(100)),
                size: Amount::new(dec!(101)),
                acceptable_price: Price::new(dec!(1)),
            },
            Budget::new(500),
        )
        .unwrap();

    let outcome = fx
        .exchange
        .execute(&keeper(), id, &fx.batch(), Budget::new(1000))
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::Cancelled {
            reason: "MaxOrderSizeExceeded".to_string()
        }
    );
}

#[test]
fn simulate_commits_nothing() {
    let fx = Fixture::new();
    let id = fx.create_deposit(dec!(1000));

    let output = fx
        .exchange
        .simulate(&ctrl(), id, &fx.batch(), Budget::new(1000))
        .unwrap();
    assert_eq!(output["minted"], serde_json::json!("100000"));

    // Nothing moved, the request is still pending and executable.
    assert_eq!(fx.vault.pool_balance(&market(), &weth()), Amount::ZERO);
    assert_eq!(fx.vault.market_token_supply(&lp()), Amount::ZERO);
    assert_eq!(fx.exchange.pending_count(), 1);
    assert!(fx.events.terminal_events_for(id).is_empty());
    assert!(fx.exchange.oracle_cache_is_empty());

    let outcome = fx
        .exchange
        .execute(&keeper(), id, &fx.batch(), Budget::new(1000))
        .unwrap();
    assert_eq!(outcome, Outcome::Completed);
}

#[test]
fn simulate_surfaces_recoverable_failures() {
    let fx = Fixture::new();
    let id = fx
        .exchange
        .create_deposit(
            &ctrl(),
            &alice(),
            &market(),
            DepositParams {
                token: weth(),
                amount: Amount::new(dec!(1000)),
                // Unsatisfiable: par minting yields 100000.
                min_market_tokens: Amount::new(dec!(999999999)),
            },
            Budget::new(500),
        )
        .unwrap();

    let err = fx
        .exchange
        .simulate(&ctrl(), id, &fx.batch(), Budget::new(1000))
        .unwrap_err();
    assert!(matches!(
        err,
        ExchangeError::Domain(DomainError::SlippageExceeded { .. })
    ));
    // Simulation never cancels.
    assert_eq!(fx.exchange.pending_count(), 1);
    assert!(fx.events.terminal_events_for(id).is_empty());
}

/// Ledger wrapper that calls back into the pipeline mid-commit, the way
/// a malicious token hook would.
struct ReentrantLedger {
    inner: InMemoryVault,
    exchange: OnceCell<Arc<Exchange>>,
    observed: Mutex<Option<ExchangeError>>,
}

impl VaultLedger for ReentrantLedger {
    fn balance(&self, account: &AccountId, token: &TokenSymbol) -> Amount {
        self.inner.balance(account, token)
    }

    fn escrowed(&self, token: &TokenSymbol) -> Amount {
        self.inner.escrowed(token)
    }

    fn pool_balance(&self, market: &MarketId, token: &TokenSymbol) -> Amount {
        self.inner.pool_balance(market, token)
    }

    fn market_token_supply(&self, token: &TokenSymbol) -> Amount {
        self.inner.market_token_supply(token)
    }

    fn open_interest(&self, market: &MarketId) -> Amount {
        self.inner.open_interest(market)
    }

    fn escrow(&self, account: &AccountId, token: &TokenSymbol, amount: Amount) -> VaultResult<()> {
        self.inner.escrow(account, token, amount)
    }

    fn release_escrow(
        &self,
        account: &AccountId,
        token: &TokenSymbol,
        amount: Amount,
    ) -> VaultResult<()> {
        self.inner.release_escrow(account, token, amount)
    }

    fn apply(&self, ops: &[VaultOp]) -> VaultResult<()> {
        if let Some(exchange) = self.exchange.get() {
            let err = exchange
                .cancel(&ctrl(), RequestId::new(1))
                .expect_err("reentrant call must be rejected");
            *self.observed.lock() = Some(err);
        }
        self.inner.apply(ops)
    }
}

#[test]
fn reentrant_ledger_callback_is_rejected() {
    let ledger = Arc::new(ReentrantLedger {
        inner: InMemoryVault::new(),
        exchange: OnceCell::new(),
        observed: Mutex::new(None),
    });
    ledger
        .inner
        .credit(&alice(), &weth(), Amount::new(dec!(10000)));

    let clock = Arc::new(BlockClock::new(100));
    let exchange = Arc::new(
        Exchange::new(
            test_config(),
            ledger.clone() as Arc<dyn VaultLedger>,
            Arc::new(InMemoryEventLog::new()),
            clock.clone(),
        )
        .unwrap(),
    );
    exchange.roles().grant_controller(ctrl());
    exchange.roles().grant_keeper(keeper());
    ledger.exchange.set(exchange.clone()).ok();

    let id = exchange
        .create_deposit(
            &ctrl(),
            &alice(),
            &market(),
            DepositParams {
                token: weth(),
                amount: Amount::new(dec!(1000)),
                min_market_tokens: Amount::ZERO,
            },
            Budget::new(500),
        )
        .unwrap();

    let source = clock.current() - 2;
    let batch = PriceBatch::new(vec![report(weth(), dec!(99), dec!(101), source)]);
    let outcome = exchange
        .execute(&keeper(), id, &batch, Budget::new(1000))
        .unwrap();

    // The outer execution completed; the inner callback was rejected.
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(*ledger.observed.lock(), Some(ExchangeError::Reentrant));
}
