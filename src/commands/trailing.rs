//! Trailing-stop subroutine shared by `trailingStop` and phase 2 of
//! `trailingTakeProfit` (§4.3: "transitions to phase 2 which is exactly the
//! trailing-stop loop above").

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::commands::stop_common::place_protective_stop;
use crate::context::CommandCtx;
use crate::domain::order::BrokerOrder;
use crate::domain::types::{Side, Trigger};
use crate::error::Error;
use crate::expr::offset::{offset_to_absolute_price, OffsetSpec};
use crate::normalizer::Args;
use crate::scheduler::CommandState;

/// Live state of a trailing-stop loop: the resting protective order, the
/// distance it trails by, and the price it was last placed at.
pub struct TrailingState {
    pub side: Side,
    pub order: BrokerOrder,
    pub trailing_offset: OffsetSpec,
    pub last_price: Decimal,
    pub tag: String,
}

/// Places the initial protective stop and resolves the offset into a
/// trailing distance the ratchet can keep applying (§4.3: "if the user gave
/// `@X`, compute `trailingOffset = |initialPrice - orderPrice|`; if `N%`,
/// keep it as a percent").
pub async fn place_initial_stop(
    ctx: &CommandCtx,
    args: &mut Args,
    side: Side,
    trigger: Trigger,
) -> Result<TrailingState, Error> {
    let spec = OffsetSpec::parse(
        args.get("offset")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::InvalidArgument("missing offset".into()))?,
    )?;

    let placed = place_protective_stop(ctx, args, side, trigger).await?;

    let trailing_offset = if let OffsetSpec::Absolute(_) = spec {
        let ticker = ctx.exchange.api().ticker(&ctx.symbol).await?;
        let reference = match side.opposite() {
            Side::Buy => ticker.bid,
            Side::Sell => ticker.ask,
        };
        OffsetSpec::Ticks((reference - placed.price).abs())
    } else {
        spec
    };

    let tag = args.string("tag").unwrap_or_default();
    Ok(TrailingState {
        side,
        order: placed.order,
        trailing_offset,
        last_price: placed.price,
        tag,
    })
}

/// One ratchet tick (§4.3): fetch the order, finish if it's no longer open;
/// otherwise compute the suggested protective price and move the stop if it
/// only ever moves in the protective direction.
pub async fn ratchet_step(ctx: &CommandCtx, state: &mut TrailingState) -> Result<CommandState, Error> {
    let current = ctx.exchange.api().order(&state.order.id).await?;
    match current {
        None => return Ok(CommandState::Finished),
        Some(o) if o.is_filled || !o.is_open => {
            debug!(order_id = %state.order.id, "trailing stop closed");
            return Ok(CommandState::Finished);
        }
        Some(_) => {}
    }

    let ticker = ctx.exchange.api().ticker(&ctx.symbol).await?;
    let protective_side = state.side.opposite();
    let suggested = ctx.exchange.round_price(
        &ctx.symbol,
        offset_to_absolute_price(protective_side, &ticker, state.trailing_offset),
    );

    let moves = match state.side {
        Side::Sell => suggested > state.last_price,
        Side::Buy => suggested < state.last_price,
    };

    if !moves {
        return Ok(CommandState::KeepGoingBackOff);
    }

    let updated = ctx
        .exchange
        .api()
        .update_order_price(&state.order, suggested)
        .await?;
    info!(old = %state.order.id, new = %updated.id, price = %suggested, "trailing stop ratcheted");
    ctx.session.lock().replace_last(&state.tag, updated.clone());
    state.order = updated;
    state.last_price = suggested;
    Ok(CommandState::KeepGoing)
}

pub async fn cancel_resting_order(ctx: &CommandCtx, state: &TrailingState) {
    let _ = ctx.exchange.api().cancel_orders(&[state.order.clone()]).await;
}
