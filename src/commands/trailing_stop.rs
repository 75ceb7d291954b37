//! `trailingStop(side, offset, amount, position, trigger=last,
//! background=true, tag)` (§4.3): places the initial stop, then ratchets it
//! in the protective direction as the market moves in its favour.

use async_trait::async_trait;

use crate::commands::register_order;
use crate::commands::trailing::{self, TrailingState};
use crate::context::CommandCtx;
use crate::domain::types::Side;
use crate::error::CommandResult;
use crate::normalizer::{calculate_position, merge_args, validate_background, validate_side, validate_trigger};
use crate::parser::ParsedArg;
use crate::scheduler::{Command, CommandState};

const DEFAULTS: &[(&str, &str)] = &[
    ("side", ""),
    ("offset", ""),
    ("amount", "0"),
    ("position", ""),
    ("trigger", "last"),
    ("background", "true"),
    ("tag", ""),
];

pub struct TrailingStop {
    raw_args: Vec<ParsedArg>,
    state: Option<TrailingState>,
    background: bool,
}

impl TrailingStop {
    pub fn new(raw_args: Vec<ParsedArg>) -> Self {
        Self {
            raw_args,
            state: None,
            background: false,
        }
    }
}

#[async_trait]
impl Command for TrailingStop {
    async fn execute(&mut self, ctx: &CommandCtx) -> CommandResult<CommandState> {
        let mut args = merge_args(DEFAULTS, &self.raw_args);
        let side = validate_side(&mut args)?;
        let trigger = validate_trigger(&mut args);
        self.background = validate_background(&mut args);
        calculate_position(ctx, &mut args, side).await?;
        let side = args.side().unwrap_or(side);

        let state = trailing::place_initial_stop(ctx, &mut args, side, trigger).await?;
        register_order(ctx, &args, state.order.clone());
        self.state = Some(state);
        Ok(CommandState::KeepGoingBackOff)
    }

    async fn background_execute(&mut self, ctx: &CommandCtx) -> CommandResult<CommandState> {
        let Some(state) = &mut self.state else {
            return Ok(CommandState::Finished);
        };
        Ok(trailing::ratchet_step(ctx, state).await?)
    }

    fn can_complete_in_background(&self) -> bool {
        self.background
    }

    async fn on_cancelled(&mut self, ctx: &CommandCtx) {
        if let Some(state) = &self.state {
            trailing::cancel_resting_order(ctx, state).await;
        }
    }

    fn algo_side(&self) -> Option<Side> {
        self.state.as_ref().map(|s| s.side)
    }

    fn tag(&self) -> Option<String> {
        self.state.as_ref().map(|s| s.tag.clone()).filter(|t| !t.is_empty())
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
    async fn ratchets_up_for_a_protective_sell_stop_then_finishes_on_fill() {
        let fake = Arc::new(
            FakeExchangeApi::new().with_ticker(Ticker {
                bid: dec!(1000),
                ask: dec!(1000),
                last_price: dec!(1000),
            }),
        );
        let exchange = Arc::new(Exchange::new("deribit", fake.clone(), PollingBounds { min: 1, max: 5 }));
        let ctx = CommandCtx {
            exchange,
            symbol: "X".into(),
            session: Arc::new(parking_lot::Mutex::new(Session::new())),
            notifier: Arc::new(LoggingNotifier),
        };

        let mut cmd = TrailingStop::new(vec![
            named("side", "sell", 0),
            named("offset", "100", 1),
            named("amount", "1", 2),
        ]);
        let initial_state = cmd.execute(&ctx).await.unwrap();
        assert_eq!(initial_state, CommandState::KeepGoingBackOff);
        assert_eq!(cmd.state.as_ref().unwrap().last_price, dec!(900));

        // Market rises: stop should ratchet up.
        fake.set_ticker(Ticker {
            bid: dec!(1050),
            ask: dec!(1050),
            last_price: dec!(1050),
        });
        let state = cmd.background_execute(&ctx).await.unwrap();
        assert_eq!(state, CommandState::KeepGoing);
        assert_eq!(cmd.state.as_ref().unwrap().last_price, dec!(950));

        // Order fills: loop should finish.
        let order_id = cmd.state.as_ref().unwrap().order.id.clone();
        fake.set_order_state(
            &order_id,
            OrderState {
                id: order_id,
                amount: dec!(1),
                remaining: dec!(0),
                executed: dec!(1),
                is_filled: true,
                is_open: false,
            },
        );
        let state = cmd.background_execute(&ctx).await.unwrap();
        assert_eq!(state, CommandState::Finished);
    }
}
