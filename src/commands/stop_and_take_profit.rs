//! `stopAndTakeProfitOrder(side, tp, sl, amount, tag)` (§4.3): an OCO pair —
//! a post-only reduce-only limit at `tp` and a stop-market at `sl` — driven
//! by a foreground loop at `maxPollingDelay` pace until either fills or
//! closes, then best-effort cancels the other.

use async_trait::async_trait;
use tracing::info;

use crate::commands::register_order;
use crate::context::CommandCtx;
use crate::domain::order::BrokerOrder;
use crate::domain::types::Side;
use crate::error::CommandResult;
use crate::expr::offset::{offset_to_absolute_price, OffsetSpec};
use crate::normalizer::{calculate_amount, merge_args, validate_side, Args};
use crate::parser::ParsedArg;
use crate::scheduler::{Command, CommandState};

const DEFAULTS: &[(&str, &str)] = &[
    ("side", ""),
    ("tp", ""),
    ("sl", ""),
    ("amount", "0"),
    ("tag", ""),
];

struct Pair {
    tp: BrokerOrder,
    sl: BrokerOrder,
}

pub struct StopAndTakeProfitOrder {
    raw_args: Vec<ParsedArg>,
    pair: Option<Pair>,
}

impl StopAndTakeProfitOrder {
    pub fn new(raw_args: Vec<ParsedArg>) -> Self {
        Self { raw_args, pair: None }
    }
}

async fn place_pair(ctx: &CommandCtx, args: &mut Args, side: Side) -> Result<Pair, crate::error::Error> {
    let ticker = ctx.exchange.api().ticker(&ctx.symbol).await?;

    let tp_spec = OffsetSpec::parse(
        args.get("tp")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| crate::error::Error::InvalidArgument("missing tp".into()))?,
    )?;
    let sl_spec = OffsetSpec::parse(
        args.get("sl")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| crate::error::Error::InvalidArgument("missing sl".into()))?,
    )?;

    let tp_price = ctx
        .exchange
        .round_price(&ctx.symbol, offset_to_absolute_price(side, &ticker, tp_spec));
    let sl_price = ctx
        .exchange
        .round_price(&ctx.symbol, offset_to_absolute_price(side.opposite(), &ticker, sl_spec));

    args.set("orderPrice", tp_price.to_string());
    calculate_amount(ctx, args).await?;
    let amount = args.decimal("amount")?;

    let tp = ctx
        .exchange
        .api()
        .limit_order(&ctx.symbol, amount, tp_price, side, true, true)
        .await?;
    let sl = ctx
        .exchange
        .api()
        .stop_order(&ctx.symbol, amount, sl_price, side, args.trigger())
        .await?;

    Ok(Pair { tp, sl })
}

async fn cancel_both(ctx: &CommandCtx, pair: &Pair) {
    let _ = ctx.exchange.api().cancel_orders(&[pair.tp.clone(), pair.sl.clone()]).await;
}

#[async_trait]
impl Command for StopAndTakeProfitOrder {
    async fn execute(&mut self, ctx: &CommandCtx) -> CommandResult<CommandState> {
        let mut args = merge_args(DEFAULTS, &self.raw_args);
        let side = validate_side(&mut args)?;

        let pair = place_pair(ctx, &mut args, side).await?;
        info!(tp = %pair.tp.id, sl = %pair.sl.id, "stopAndTakeProfitOrder placed");
        register_order(ctx, &args, pair.tp.clone());
        register_order(ctx, &args, pair.sl.clone());
        self.pair = Some(pair);
        Ok(CommandState::KeepGoingBackOff)
    }

    async fn background_execute(&mut self, ctx: &CommandCtx) -> CommandResult<CommandState> {
        let Some(pair) = &self.pair else {
            return Ok(CommandState::Finished);
        };

        let tp = ctx.exchange.api().order(&pair.tp.id).await?;
        let sl = ctx.exchange.api().order(&pair.sl.id).await?;

        let tp_done = tp.as_ref().map_or(true, |o| o.is_filled || !o.is_open);
        let sl_done = sl.as_ref().map_or(true, |o| o.is_filled || !o.is_open);

        if tp_done || sl_done {
            cancel_both(ctx, pair).await;
            return Ok(CommandState::Finished);
        }

        Ok(CommandState::KeepGoingBackOff)
    }

    fn can_complete_in_background(&self) -> bool {
        false
    }

    fn poll_at_max_pace(&self) -> bool {
        true
    }

    async fn on_cancelled(&mut self, ctx: &CommandCtx) {
        if let Some(pair) = &self.pair {
            cancel_both(ctx, pair).await;
        }
    }

    fn algo_side(&self) -> Option<Side> {
        self.pair.as_ref().map(|p| p.tp.side)
    }

    fn tag(&self) -> Option<String> {
        self.raw_args
            .iter()
            .find(|a| a.name.as_deref() == Some("tag"))
            .map(|a| a.value.clone())
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::exchange::{Exchange, PollingBounds};
    use crate::domain::order::OrderState;
    use crate::domain::session::Session;
    use crate::port::exchange::Ticker;
    use crate::port::notifier::LoggingNotifier;
    use crate::testkit::exchange::FakeExchangeApi;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn named(name: &str, value: &str, index: usize) -> ParsedArg {
        ParsedArg {
            name: Some(name.to_string()),
            value: value.to_string(),
            index,
        }
    }

    #[tokio::test]
    async fn fill_of_either_leg_cancels_the_other() {
        let fake = Arc::new(FakeExchangeApi::new().with_ticker(Ticker {
            bid: dec!(1000),
            ask: dec!(1000),
            last_price: dec!(1000),
        }));
        let exchange = Arc::new(Exchange::new("deribit", fake.clone(), PollingBounds { min: 1, max: 5 }));
        let ctx = CommandCtx {
            exchange,
            symbol: "X".into(),
            session: Arc::new(parking_lot::Mutex::new(Session::new())),
            notifier: Arc::new(LoggingNotifier),
        };

        let mut cmd = StopAndTakeProfitOrder::new(vec![
            named("side", "sell", 0),
            named("tp", "100", 1),
            named("sl", "100", 2),
            named("amount", "1", 3),
        ]);
        cmd.execute(&ctx).await.unwrap();
        assert_eq!(fake.calls().limit_order, 1);
        assert_eq!(fake.calls().stop_order, 1);

        let tp_id = cmd.pair.as_ref().unwrap().tp.id.clone();
        fake.set_order_state(
            &tp_id,
            OrderState {
                id: tp_id,
                amount: dec!(1),
                remaining: dec!(0),
                executed: dec!(1),
                is_filled: true,
                is_open: false,
            },
        );

        let state = cmd.background_execute(&ctx).await.unwrap();
        assert_eq!(state, CommandState::Finished);
        assert_eq!(fake.calls().cancel_orders, 1);
    }
}
