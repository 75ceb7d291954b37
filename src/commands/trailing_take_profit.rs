//! `trailingTakeProfit(side, offset, triggerOffset=1%, amount, position,
//! trigger=last, background=true, tag)` (§4.3): two-phase. Phase 1 waits for
//! price to cross a fixed trigger; phase 2 is exactly the trailing-stop
//! loop.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;

use crate::commands::register_order;
use crate::commands::trailing::{self, TrailingState};
use crate::context::CommandCtx;
use crate::domain::types::{Side, Trigger};
use crate::error::CommandResult;
use crate::expr::offset::{offset_to_absolute_price, OffsetSpec};
use crate::normalizer::{calculate_position, merge_args, validate_background, validate_side, validate_trigger, Args};
use crate::parser::ParsedArg;
use crate::scheduler::{Command, CommandState};

const DEFAULTS: &[(&str, &str)] = &[
    ("side", ""),
    ("offset", ""),
    ("triggerOffset", "1%"),
    ("amount", "0"),
    ("position", ""),
    ("trigger", "last"),
    ("background", "true"),
    ("tag", ""),
];

struct WaitingForTrigger {
    side: Side,
    trigger: Trigger,
    trigger_price: Decimal,
    tag: String,
}

enum Phase {
    WaitingForTrigger(WaitingForTrigger),
    Trailing(TrailingState),
}

pub struct TrailingTakeProfit {
    raw_args: Vec<ParsedArg>,
    args: Option<Args>,
    phase: Option<Phase>,
    background: bool,
}

impl TrailingTakeProfit {
    pub fn new(raw_args: Vec<ParsedArg>) -> Self {
        Self {
            raw_args,
            args: None,
            phase: None,
            background: false,
        }
    }
}

/// `max(bid,ask,last)` for a sell, `min(bid,ask,last)` for a buy (§4.3).
fn live_price(side: Side, ticker: &crate::port::exchange::Ticker) -> Decimal {
    let candidates = [ticker.bid, ticker.ask, ticker.last_price];
    match side {
        Side::Sell => candidates.into_iter().fold(candidates[0], Decimal::max),
        Side::Buy => candidates.into_iter().fold(candidates[0], Decimal::min),
    }
}

fn crossed(side: Side, live: Decimal, trigger_price: Decimal) -> bool {
    match side {
        Side::Sell => live >= trigger_price,
        Side::Buy => live <= trigger_price,
    }
}

#[async_trait]
impl Command for TrailingTakeProfit {
    async fn execute(&mut self, ctx: &CommandCtx) -> CommandResult<CommandState> {
        let mut args = merge_args(DEFAULTS, &self.raw_args);
        let side = validate_side(&mut args)?;
        let trigger = validate_trigger(&mut args);
        self.background = validate_background(&mut args);
        calculate_position(ctx, &mut args, side).await?;
        let side = args.side().unwrap_or(side);

        let trigger_offset = OffsetSpec::parse(args.get("triggerOffset").unwrap_or("1%"))?;
        let ticker = ctx.exchange.api().ticker(&ctx.symbol).await?;
        let trigger_price = ctx
            .exchange
            .round_price(&ctx.symbol, offset_to_absolute_price(side, &ticker, trigger_offset));
        let tag = args.string("tag").unwrap_or_default();

        self.phase = Some(Phase::WaitingForTrigger(WaitingForTrigger {
            side,
            trigger,
            trigger_price,
            tag,
        }));
        self.args = Some(args);
        Ok(CommandState::KeepGoingBackOff)
    }

    async fn background_execute(&mut self, ctx: &CommandCtx) -> CommandResult<CommandState> {
        match self.phase.take() {
            None => Ok(CommandState::Finished),
            Some(Phase::WaitingForTrigger(waiting)) => {
                let ticker = ctx.exchange.api().ticker(&ctx.symbol).await?;
                let live = live_price(waiting.side, &ticker);
                if !crossed(waiting.side, live, waiting.trigger_price) {
                    self.phase = Some(Phase::WaitingForTrigger(waiting));
                    return Ok(CommandState::KeepGoingBackOff);
                }

                info!(price = %live, trigger = %waiting.trigger_price, "trailingTakeProfit trigger crossed");
                let args = self.args.as_mut().expect("args set in execute");
                let state = trailing::place_initial_stop(ctx, args, waiting.side, waiting.trigger).await?;
                register_order(ctx, args, state.order.clone());
                self.phase = Some(Phase::Trailing(state));
                Ok(CommandState::KeepGoing)
            }
            Some(Phase::Trailing(mut state)) => {
                let result = trailing::ratchet_step(ctx, &mut state).await;
                self.phase = Some(Phase::Trailing(state));
                Ok(result?)
            }
        }
    }

    fn can_complete_in_background(&self) -> bool {
        self.background
    }

    async fn on_cancelled(&mut self, ctx: &CommandCtx) {
        if let Some(Phase::Trailing(state)) = &self.phase {
            trailing::cancel_resting_order(ctx, state).await;
        }
    }

    fn algo_side(&self) -> Option<Side> {
        match &self.phase {
            Some(Phase::WaitingForTrigger(w)) => Some(w.side),
            Some(Phase::Trailing(s)) => Some(s.side),
            None => None,
        }
    }

    fn tag(&self) -> Option<String> {
        let tag = match &self.phase {
            Some(Phase::WaitingForTrigger(w)) => w.tag.clone(),
            Some(Phase::Trailing(s)) => s.tag.clone(),
            None => return None,
        };
        (!tag.is_empty()).then_some(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::exchange::{Exchange, PollingBounds};
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
    async fn stays_waiting_until_trigger_crosses_then_places_the_stop() {
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

        let mut cmd = TrailingTakeProfit::new(vec![
            named("side", "sell", 0),
            named("offset", "100", 1),
            named("triggerOffset", "50", 2),
            named("amount", "1", 3),
        ]);
        cmd.execute(&ctx).await.unwrap();

        // Price still below trigger (1050): stays in phase 1, no stop placed.
        let state = cmd.background_execute(&ctx).await.unwrap();
        assert_eq!(state, CommandState::KeepGoingBackOff);
        assert_eq!(fake.calls().stop_order, 0);

        // Price crosses trigger: transitions to phase 2 and places the stop.
        fake.set_ticker(Ticker {
            bid: dec!(1050),
            ask: dec!(1050),
            last_price: dec!(1050),
        });
        let state = cmd.background_execute(&ctx).await.unwrap();
        assert_eq!(state, CommandState::KeepGoing);
        assert_eq!(fake.calls().stop_order, 1);
    }
}
