//! `limitOrder(side, amount, offset, postOnly=false, reduceOnly=false, tag)`
//! (§4.3): one API call, registers under session+tag. Never suspends.

use async_trait::async_trait;
use tracing::debug;

use crate::commands::register_order;
use crate::context::CommandCtx;
use crate::error::CommandResult;
use crate::normalizer::{calculate_amount, merge_args, offset_to_price, validate_side, validate_trigger};
use crate::parser::ParsedArg;
use crate::scheduler::{Command, CommandState};

const DEFAULTS: &[(&str, &str)] = &[
    ("side", ""),
    ("amount", "0"),
    ("offset", ""),
    ("postOnly", "false"),
    ("reduceOnly", "false"),
    ("tag", ""),
];

pub struct LimitOrder {
    raw_args: Vec<ParsedArg>,
}

impl LimitOrder {
    pub fn new(raw_args: Vec<ParsedArg>) -> Self {
        Self { raw_args }
    }
}

#[async_trait]
impl Command for LimitOrder {
    async fn execute(&mut self, ctx: &CommandCtx) -> CommandResult<CommandState> {
        let mut args = merge_args(DEFAULTS, &self.raw_args);
        let side = validate_side(&mut args)?;
        validate_trigger(&mut args);
        offset_to_price(ctx, &mut args, side).await?;
        calculate_amount(ctx, &mut args).await?;

        let amount = args.decimal("amount")?;
        let price = args.decimal("orderPrice")?;
        let post_only = args.bool_flag("postOnly");
        let reduce_only = args.bool_flag("reduceOnly");

        let order = ctx
            .exchange
            .api()
            .limit_order(&ctx.symbol, amount, price, side, post_only, reduce_only)
            .await?;

        debug!(order_id = %order.id, %side, %amount, %price, "limitOrder placed");
        register_order(ctx, &args, order);
        Ok(CommandState::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::exchange::{Exchange, PollingBounds};
    use crate::domain::session::Session;
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
    async fn places_a_limit_order_and_registers_it_under_its_tag() {
        let fake = Arc::new(
            FakeExchangeApi::new().with_ticker(crate::port::exchange::Ticker {
                bid: dec!(1000),
                ask: dec!(1001),
                last_price: dec!(1000),
            }),
        );
        let exchange = Arc::new(Exchange::new("deribit", fake.clone(), PollingBounds { min: 1, max: 5 }));
        let session = Arc::new(parking_lot::Mutex::new(Session::new()));
        let ctx = CommandCtx {
            exchange,
            symbol: "BTC-PERP".into(),
            session: session.clone(),
            notifier: Arc::new(LoggingNotifier),
        };

        let mut cmd = LimitOrder::new(vec![
            named("side", "buy", 0),
            named("amount", "1", 1),
            named("offset", "100", 2),
            named("tag", "entry", 3),
        ]);
        cmd.execute(&ctx).await.unwrap();

        assert_eq!(fake.calls().limit_order, 1);
        assert_eq!(session.lock().orders_for_tag("entry").len(), 1);
    }

    #[tokio::test]
    async fn missing_side_fails_before_any_order_is_placed() {
        let fake = Arc::new(FakeExchangeApi::new());
        let exchange = Arc::new(Exchange::new("deribit", fake.clone(), PollingBounds { min: 1, max: 5 }));
        let ctx = CommandCtx {
            exchange,
            symbol: "BTC-PERP".into(),
            session: Arc::new(parking_lot::Mutex::new(Session::new())),
            notifier: Arc::new(LoggingNotifier),
        };

        let mut cmd = LimitOrder::new(vec![named("amount", "1", 0)]);
        assert!(cmd.execute(&ctx).await.is_err());
        assert_eq!(fake.calls().limit_order, 0);
    }
}
