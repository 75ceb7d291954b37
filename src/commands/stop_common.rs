//! Shared protective-stop placement, grounded on §4.1 step 5's
//! `offsetToAbsolutePrice(side.opposite(), ...)` composition note. Used by
//! both `stopMarketOrder` (one-shot) and the trailing-stop subroutine
//! (§4.3, [`crate::commands::trailing`]).

use rust_decimal::Decimal;

use crate::context::CommandCtx;
use crate::domain::order::BrokerOrder;
use crate::domain::types::{Side, Trigger};
use crate::error::Error;
use crate::expr::offset::{offset_to_absolute_price, OffsetSpec};
use crate::normalizer::Args;

pub struct PlacedStop {
    pub order: BrokerOrder,
    pub price: Decimal,
    pub amount: Decimal,
}

/// Resolve `offset` into a protective price for `side` (favourable for
/// `side.opposite()`, i.e. below market for a long-protecting sell, above
/// for a short-protecting buy), clamp `amount` against balance, and place
/// the stop.
pub async fn place_protective_stop(
    ctx: &CommandCtx,
    args: &mut Args,
    side: Side,
    trigger: Trigger,
) -> Result<PlacedStop, Error> {
    let raw_offset = args
        .get("offset")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::InvalidArgument("missing offset".into()))?;
    let spec = OffsetSpec::parse(raw_offset)?;

    let ticker = ctx.exchange.api().ticker(&ctx.symbol).await?;
    let price = ctx
        .exchange
        .round_price(&ctx.symbol, offset_to_absolute_price(side.opposite(), &ticker, spec));
    args.set("orderPrice", price.to_string());

    crate::normalizer::calculate_amount(ctx, args).await?;
    let amount = args.decimal("amount")?;

    let order = ctx
        .exchange
        .api()
        .stop_order(&ctx.symbol, amount, price, side, trigger)
        .await?;

    Ok(PlacedStop { order, price, amount })
}
