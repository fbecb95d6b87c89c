//! Order engine: open a position against the pool.
//!
//! Executes at the conservative edge of the published band: buys at the
//! max price, sells at the min price. Collateral moves into the pool and
//! open interest increases by the order size.

use serde_json::{json, Value};
use tracing::debug;

use lpx_core::{OrderParams, Side};
use lpx_vault::VaultOp;

use crate::engine::{self, EngineCtx, EFFECT_COST, GATE_COST, PRICING_COST};
use crate::error::{DomainError, ExchangeResult};
use crate::journal::EffectJournal;

pub(crate) fn run(
    ctx: &EngineCtx<'_>,
    params: &OrderParams,
) -> ExchangeResult<(EffectJournal, Value)> {
    engine::require_enabled(ctx)?;
    engine::require_positive(ctx, params.size)?;
    engine::require_positive(ctx, params.collateral_amount)?;
    engine::require_pool_token(ctx, &params.collateral_token)?;

    ctx.meter.charge(GATE_COST)?;
    if params.size > ctx.market.max_order_size {
        return Err(DomainError::MaxOrderSizeExceeded {
            market: ctx.market.market.clone(),
        }
        .into());
    }

    ctx.meter.charge(GATE_COST)?;
    let open_interest = ctx.vault.open_interest(&ctx.market.market);
    if open_interest.saturating_add(params.size) > ctx.market.max_open_interest {
        return Err(DomainError::MaxOpenInterestExceeded {
            market: ctx.market.market.clone(),
        }
        .into());
    }

    // Index pricing uses the long token's band.
    ctx.meter.charge(PRICING_COST)?;
    let band = ctx.prices.price(&ctx.market.long_token)?;
    let execution_price = match params.side {
        Side::Buy => band.max,
        Side::Sell => band.min,
    };

    ctx.meter.charge(GATE_COST)?;
    let acceptable = match params.side {
        Side::Buy => execution_price <= params.acceptable_price,
        Side::Sell => execution_price >= params.acceptable_price,
    };
    if !acceptable {
        return Err(DomainError::UnacceptablePrice {
            acceptable: params.acceptable_price,
            actual: execution_price,
        }
        .into());
    }

    let mut journal = EffectJournal::new();
    ctx.meter.charge(EFFECT_COST)?;
    journal.record(VaultOp::EscrowToPool {
        market: ctx.market.market.clone(),
        token: params.collateral_token.clone(),
        amount: params.collateral_amount,
    });
    ctx.meter.charge(EFFECT_COST)?;
    journal.record(VaultOp::IncreaseOpenInterest {
        market: ctx.market.market.clone(),
        amount: params.size,
    });

    debug!(
        id = %ctx.request.id,
        side = %params.side,
        size = %params.size,
        price = %execution_price,
        "Order priced"
    );
    Ok((
        journal,
        json!({
            "side": params.side,
            "size": params.size,
            "execution_price": execution_price,
        }),
    ))
}
