//! Withdrawal engine: burn escrowed market tokens, pay out pool tokens.

use serde_json::{json, Value};
use tracing::debug;

use lpx_core::WithdrawalParams;
use lpx_vault::VaultOp;

use crate::engine::{self, EngineCtx, EFFECT_COST, GATE_COST, PRICING_COST};
use crate::error::{DomainError, ExchangeResult};
use crate::journal::EffectJournal;

pub(crate) fn run(
    ctx: &EngineCtx<'_>,
    params: &WithdrawalParams,
) -> ExchangeResult<(EffectJournal, Value)> {
    engine::require_enabled(ctx)?;
    engine::require_positive(ctx, params.market_token_amount)?;
    engine::require_pool_token(ctx, &params.out_token)?;

    ctx.meter.charge(PRICING_COST)?;
    let market_token_price = engine::market_token_price(ctx)?;
    let redeemed_value = params
        .market_token_amount
        .value_at(market_token_price)
        .ok_or(DomainError::PrecisionLoss)?;
    let payout = redeemed_value
        .units_at(engine::mid_price(ctx, &params.out_token)?)
        .ok_or(DomainError::PrecisionLoss)?;
    if !payout.is_positive() {
        return Err(DomainError::PrecisionLoss.into());
    }

    // A payout the pool cannot hold violates its amount constraint.
    ctx.meter.charge(GATE_COST)?;
    let pool = ctx.vault.pool_balance(&ctx.market.market, &params.out_token);
    if payout > pool {
        return Err(DomainError::MaxPoolAmountExceeded {
            market: ctx.market.market.clone(),
            token: params.out_token.clone(),
        }
        .into());
    }

    ctx.meter.charge(GATE_COST)?;
    if payout < params.min_out {
        return Err(DomainError::SlippageExceeded {
            min_out: params.min_out,
            actual: payout,
        }
        .into());
    }

    let mut journal = EffectJournal::new();
    ctx.meter.charge(EFFECT_COST)?;
    journal.record(VaultOp::BurnEscrowedMarketTokens {
        token: ctx.market.market_token.clone(),
        amount: params.market_token_amount,
    });
    ctx.meter.charge(EFFECT_COST)?;
    journal.record(VaultOp::PoolToAccount {
        market: ctx.market.market.clone(),
        token: params.out_token.clone(),
        amount: payout,
        account: ctx.request.account.clone(),
    });

    debug!(
        id = %ctx.request.id,
        burned = %params.market_token_amount,
        payout = %payout,
        "Withdrawal priced"
    );
    Ok((
        journal,
        json!({
            "paid_out": payout,
            "token": params.out_token,
        }),
    ))
}
