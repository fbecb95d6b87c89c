//! Execution engines.
//!
//! One engine per request kind. Each engine runs its domain gates in a
//! fixed order with early return, cheapest first, then records the
//! resulting ledger operations into an effect journal. Engines never
//! mutate the ledger; the pipeline commits the journal after the engine
//! returns.
//!
//! Every step is charged against the metered execution budget before it
//! runs, so a too-small budget fails deterministically at the same step
//! every time.

mod deposit;
mod order;
mod withdrawal;

use serde_json::Value;

use lpx_core::{Amount, Budget, Price, Request, RequestKind, TokenSymbol};
use lpx_oracle::PublishGuard;
use lpx_registry::MarketConfig;
use lpx_vault::VaultLedger;

use crate::budget::BudgetMeter;
use crate::error::{DomainError, ExchangeResult};
use crate::journal::EffectJournal;

/// Cost of one precondition gate.
pub(crate) const GATE_COST: Budget = Budget(5);
/// Cost of one pricing computation.
pub(crate) const PRICING_COST: Budget = Budget(15);
/// Cost of journaling one ledger operation.
pub(crate) const EFFECT_COST: Budget = Budget(10);

/// Everything an engine needs for one execution attempt.
pub(crate) struct EngineCtx<'a> {
    pub request: &'a Request,
    pub market: &'a MarketConfig,
    pub prices: &'a PublishGuard<'a>,
    pub vault: &'a dyn VaultLedger,
    pub meter: &'a BudgetMeter,
}

/// Run the engine for the request's kind.
pub(crate) fn run(ctx: &EngineCtx<'_>) -> ExchangeResult<(EffectJournal, Value)> {
    match &ctx.request.kind {
        RequestKind::Deposit(params) => deposit::run(ctx, params),
        RequestKind::Withdrawal(params) => withdrawal::run(ctx, params),
        RequestKind::Order(params) => order::run(ctx, params),
    }
}

/// Midpoint of the published min/max band for a token. A token the
/// batch did not cover is a fatal oracle failure; the gate guarantees
/// a published band has a representable midpoint.
pub(crate) fn mid_price(ctx: &EngineCtx<'_>, token: &TokenSymbol) -> ExchangeResult<Price> {
    let band = ctx.prices.price(token)?;
    Ok(band.mid().ok_or(DomainError::PrecisionLoss)?)
}

/// Market-token price: total pool value at midpoint prices divided by
/// supply. An empty supply prices the first deposit at one. A pool
/// valuation that overflows is a recoverable domain failure.
pub(crate) fn market_token_price(ctx: &EngineCtx<'_>) -> ExchangeResult<Price> {
    let supply = ctx.vault.market_token_supply(&ctx.market.market_token);
    if supply.is_zero() {
        return Ok(Price::ONE);
    }

    let market = &ctx.market.market;
    let long_value = ctx
        .vault
        .pool_balance(market, &ctx.market.long_token)
        .value_at(mid_price(ctx, &ctx.market.long_token)?)
        .ok_or(DomainError::PrecisionLoss)?;
    let short_value = ctx
        .vault
        .pool_balance(market, &ctx.market.short_token)
        .value_at(mid_price(ctx, &ctx.market.short_token)?)
        .ok_or(DomainError::PrecisionLoss)?;

    let total = long_value
        .checked_add(short_value)
        .ok_or(DomainError::PrecisionLoss)?;
    let price = total
        .inner()
        .checked_div(supply.inner())
        .ok_or(DomainError::PrecisionLoss)?;
    Ok(Price::new(price))
}

/// Shared first gate: disabled markets reject all execution.
pub(crate) fn require_enabled(ctx: &EngineCtx<'_>) -> ExchangeResult<()> {
    ctx.meter.charge(GATE_COST)?;
    if !ctx.market.enabled {
        return Err(DomainError::MarketDisabled(ctx.market.market.clone()).into());
    }
    Ok(())
}

/// Shared token gate: the token must be one of the market's pool
/// tokens.
pub(crate) fn require_pool_token(ctx: &EngineCtx<'_>, token: &TokenSymbol) -> ExchangeResult<()> {
    ctx.meter.charge(GATE_COST)?;
    if !ctx.market.holds(token) {
        return Err(DomainError::UnsupportedToken {
            market: ctx.market.market.clone(),
            token: token.clone(),
        }
        .into());
    }
    Ok(())
}

/// Shared amount gate.
pub(crate) fn require_positive(ctx: &EngineCtx<'_>, amount: Amount) -> ExchangeResult<()> {
    ctx.meter.charge(GATE_COST)?;
    if !amount.is_positive() {
        return Err(DomainError::EmptyAmount.into());
    }
    Ok(())
}
