//! `scaledOrder(side, amount, from, to, count, skew, tag)` (§4.3, builder
//! command supplementing the distilled catalogue): splits one requested
//! amount into `count` limit orders spread linearly between the `from` and
//! `to` offsets. Never suspends.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::commands::register_order;
use crate::context::CommandCtx;
use crate::error::CommandResult;
use crate::expr::offset::{offset_to_absolute_price, OffsetSpec};
use crate::normalizer::{merge_args, validate_side};
use crate::parser::ParsedArg;
use crate::scheduler::{Command, CommandState};

const DEFAULTS: &[(&str, &str)] = &[
    ("side", ""),
    ("amount", "0"),
    ("from", ""),
    ("to", ""),
    ("count", "1"),
    ("skew", "1"),
    ("tag", ""),
];

pub struct ScaledOrder {
    raw_args: Vec<ParsedArg>,
}

impl ScaledOrder {
    pub fn new(raw_args: Vec<ParsedArg>) -> Self {
        Self { raw_args }
    }
}

/// `count` evenly spaced prices between the `from` and `to` offsets
/// (inclusive), each resolved to an absolute price for `side`.
async fn resolve_ladder_prices(
    ctx: &CommandCtx,
    side: crate::domain::types::Side,
    from: OffsetSpec,
    to: OffsetSpec,
    count: u32,
) -> Result<Vec<Decimal>, crate::error::Error> {
    let ticker = ctx.exchange.api().ticker(&ctx.symbol).await?;
    let from_price = offset_to_absolute_price(side, &ticker, from);
    let to_price = offset_to_absolute_price(side, &ticker, to);

    if count <= 1 {
        return Ok(vec![ctx.exchange.round_price(&ctx.symbol, from_price)]);
    }

    let step = (to_price - from_price) / Decimal::from(count - 1);
    Ok((0..count)
        .map(|i| ctx.exchange.round_price(&ctx.symbol, from_price + step * Decimal::from(i)))
        .collect())
}

/// Skew-weighted split of `total` across `count` slices, `skew.powi` biasing
/// more size toward the `from` end (index 0) for `skew > 1.0`. Falls back to
/// `f64` for the exponent since `rust_decimal` has no general `powf`.
fn skewed_weights(total: Decimal, count: u32, skew: f64) -> Vec<Decimal> {
    let raw: Vec<f64> = (0..count).map(|i| skew.powi((count - 1 - i) as i32)).collect();
    let sum: f64 = raw.iter().sum();
    if sum <= 0.0 {
        let even = total / Decimal::from(count);
        return vec![even; count as usize];
    }

    let mut weights: Vec<Decimal> = raw
        .iter()
        .map(|w| total * Decimal::from_f64_retain(w / sum).unwrap_or_default())
        .collect();

    // Rounding may leave a residual; dump it onto the last slice.
    let assigned: Decimal = weights.iter().sum();
    if let Some(last) = weights.last_mut() {
        *last += total - assigned;
    }
    weights
}

#[async_trait]
impl Command for ScaledOrder {
    async fn execute(&mut self, ctx: &CommandCtx) -> CommandResult<CommandState> {
        let mut args = merge_args(DEFAULTS, &self.raw_args);
        let side = validate_side(&mut args)?;

        let total = args.decimal("amount")?;
        let from = OffsetSpec::parse(
            args.get("from")
                .filter(|v| !v.is_empty())
                .ok_or_else(|| crate::error::Error::InvalidArgument("missing from".into()))?,
        )?;
        let to = OffsetSpec::parse(
            args.get("to")
                .filter(|v| !v.is_empty())
                .ok_or_else(|| crate::error::Error::InvalidArgument("missing to".into()))?,
        )?;
        let count: u32 = args
            .get("count")
            .unwrap_or("1")
            .trim()
            .parse()
            .map_err(|_| crate::error::Error::InvalidArgument("bad count".into()))?;
        if count == 0 {
            return Err(crate::error::Error::InvalidArgument("count must be >= 1".into()).into());
        }
        let skew: f64 = args
            .get("skew")
            .unwrap_or("1")
            .trim()
            .parse()
            .map_err(|_| crate::error::Error::InvalidArgument("bad skew".into()))?;

        let prices = resolve_ladder_prices(ctx, side, from, to, count).await?;
        let weights = skewed_weights(total, count, skew);
        let min_size = ctx.exchange.min_order_size(&ctx.symbol);

        let mut placed = 0usize;
        for (price, amount) in prices.into_iter().zip(weights) {
            let amount = ctx.exchange.round_amount(&ctx.symbol, amount);
            if amount.is_zero() || amount < min_size {
                warn!(%price, %amount, "scaledOrder slice skipped below minimum order size");
                continue;
            }

            let order = ctx
                .exchange
                .api()
                .limit_order(&ctx.symbol, amount, price, side, false, false)
                .await?;
            info!(order_id = %order.id, %price, %amount, "scaledOrder slice placed");
            register_order(ctx, &args, order);
            placed += 1;
        }

        if placed == 0 {
            return Err(crate::error::Error::ZeroSize(
                "scaledOrder: every slice rounded below minimum order size".into(),
            )
            .into());
        }

        Ok(CommandState::Finished)
    }
}
