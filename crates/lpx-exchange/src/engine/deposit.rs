//! Deposit engine: pool tokens in, market tokens out.

use serde_json::{json, Value};
use tracing::debug;

use lpx_core::DepositParams;
use lpx_vault::VaultOp;

use crate::engine::{self, EngineCtx, EFFECT_COST, GATE_COST, PRICING_COST};
use crate::error::{DomainError, ExchangeResult};
use crate::journal::EffectJournal;

pub(crate) fn run(
    ctx: &EngineCtx<'_>,
    params: &DepositParams,
) -> ExchangeResult<(EffectJournal, Value)> {
    engine::require_enabled(ctx)?;
    engine::require_positive(ctx, params.amount)?;
    engine::require_pool_token(ctx, &params.token)?;

    // Pool cap, checked against the post-deposit balance.
    ctx.meter.charge(GATE_COST)?;
    let pool = ctx.vault.pool_balance(&ctx.market.market, &params.token);
    if pool.saturating_add(params.amount) > ctx.market.max_pool_amount {
        return Err(DomainError::MaxPoolAmountExceeded {
            market: ctx.market.market.clone(),
            token: params.token.clone(),
        }
        .into());
    }

    // Market-token price reflects the pool before this deposit lands.
    ctx.meter.charge(PRICING_COST)?;
    let market_token_price = engine::market_token_price(ctx)?;
    let deposit_value = params
        .amount
        .value_at(engine::mid_price(ctx, &params.token)?)
        .ok_or(DomainError::PrecisionLoss)?;
    let minted = deposit_value
        .units_at(market_token_price)
        .ok_or(DomainError::PrecisionLoss)?;
    if !minted.is_positive() {
        return Err(DomainError::PrecisionLoss.into());
    }

    ctx.meter.charge(GATE_COST)?;
    if minted < params.min_market_tokens {
        return Err(DomainError::SlippageExceeded {
            min_out: params.min_market_tokens,
            actual: minted,
        }
        .into());
    }

    let mut journal = EffectJournal::new();
    ctx.meter.charge(EFFECT_COST)?;
    journal.record(VaultOp::EscrowToPool {
        market: ctx.market.market.clone(),
        token: params.token.clone(),
        amount: params.amount,
    });
    ctx.meter.charge(EFFECT_COST)?;
    journal.record(VaultOp::MintMarketTokens {
        token: ctx.market.market_token.clone(),
        account: ctx.request.account.clone(),
        amount: minted,
    });

    debug!(
        id = %ctx.request.id,
        amount = %params.amount,
        minted = %minted,
        "Deposit priced"
    );
    Ok((
        journal,
        json!({
            "minted": minted,
            "market_token": ctx.market.market_token,
        }),
    ))
}
