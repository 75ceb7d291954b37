//! `aggressiveEntry(side, amount, position, timeLimit=∞, slippageLimit=∅,
//! tag)` (§4.3): a synthetic market-taker — walks a post-only limit up to
//! the top of book over and over until the whole amount is filled, a time
//! limit elapses, or slippage is breached.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::context::CommandCtx;
use crate::domain::order::BrokerOrder;
use crate::domain::types::Side;
use crate::error::CommandResult;
use crate::expr::duration::parse_duration_secs;
use crate::normalizer::{calculate_position, merge_args, validate_side, Args};
use crate::parser::ParsedArg;
use crate::scheduler::{Command, CommandState};

const DEFAULTS: &[(&str, &str)] = &[
    ("side", ""),
    ("amount", "0"),
    ("position", ""),
    ("timeLimit", ""),
    ("slippageLimit", ""),
    ("tag", ""),
];

const MAX_PLACEMENT_RETRIES: u32 = 20;

struct State {
    side: Side,
    amount_left: Decimal,
    min_order_size: Decimal,
    deadline: Option<tokio::time::Instant>,
    slippage_price: Option<Decimal>,
    active_order: Option<BrokerOrder>,
    active_top_of_book: Option<Decimal>,
    wait: u64,
    tag: String,
}

pub struct AggressiveEntry {
    raw_args: Vec<ParsedArg>,
    state: Option<State>,
}

impl AggressiveEntry {
    pub fn new(raw_args: Vec<ParsedArg>) -> Self {
        Self { raw_args, state: None }
    }
}

fn top_of_book(side: Side, ticker: &crate::port::exchange::Ticker) -> Decimal {
    match side {
        Side::Buy => ticker.bid,
        Side::Sell => ticker.ask,
    }
}

/// Places a post-only limit at the current top of book, retrying up to
/// [`MAX_PLACEMENT_RETRIES`] times if the exchange doesn't hand back an
/// order (§4.3 step 5).
async fn place_at_top_of_book(
    ctx: &CommandCtx,
    side: Side,
    amount: Decimal,
) -> Result<(BrokerOrder, Decimal), crate::error::Error> {
    let mut last_err = None;
    for attempt in 0..MAX_PLACEMENT_RETRIES {
        let ticker = ctx.exchange.api().ticker(&ctx.symbol).await?;
        let price = top_of_book(side, &ticker);
        match ctx
            .exchange
            .api()
            .limit_order(&ctx.symbol, amount, price, side, true, false)
            .await
        {
            Ok(order) => return Ok((order, price)),
            Err(e) => {
                debug!(attempt, error = %e, "aggressiveEntry placement retry");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or(crate::error::Error::ApiTransient(
        "aggressiveEntry: placement exhausted retries".into(),
    )))
}

#[async_trait]
impl Command for AggressiveEntry {
    async fn execute(&mut self, ctx: &CommandCtx) -> CommandResult<CommandState> {
        let mut args = merge_args(DEFAULTS, &self.raw_args);
        let side = validate_side(&mut args)?;
        calculate_position(ctx, &mut args, side).await?;
        let side = args.side().unwrap_or(side);
        let amount_left = args.decimal("amount")?;

        let min_order_size = ctx.exchange.min_order_size(&ctx.symbol);
        let deadline = time_limit(&args)?;
        let slippage_price = slippage_price(ctx, side, &args).await?;
        let tag = args.string("tag").unwrap_or_default();

        // §4.3 step 5: "the initial wait is min + 2 seconds".
        let min_wait = ctx.exchange.polling_bounds().min;
        tokio::time::sleep(std::time::Duration::from_secs(min_wait + 2)).await;

        self.state = Some(State {
            side,
            amount_left,
            min_order_size,
            deadline,
            slippage_price,
            active_order: None,
            active_top_of_book: None,
            wait: min_wait,
            tag,
        });

        Ok(CommandState::KeepGoing)
    }

    async fn background_execute(&mut self, ctx: &CommandCtx) -> CommandResult<CommandState> {
        let Some(state) = &mut self.state else {
            return Ok(CommandState::Finished);
        };
        let max_wait = ctx.exchange.polling_bounds().max;

        if state.amount_left < state.min_order_size {
            return Ok(CommandState::Finished);
        }

        // step 2: time limit.
        if let Some(deadline) = state.deadline {
            if tokio::time::Instant::now() >= deadline {
                if let Some(order) = state.active_order.take() {
                    let _ = ctx.exchange.api().cancel_orders(&[order]).await;
                }
                return Ok(CommandState::Finished);
            }
        }

        let ticker = ctx.exchange.api().ticker(&ctx.symbol).await?;
        let price = top_of_book(state.side, &ticker);

        // step 4: slippage.
        if let Some(limit) = state.slippage_price {
            let breached = match state.side {
                Side::Buy => price > limit,
                Side::Sell => price < limit,
            };
            if breached {
                if let Some(order) = state.active_order.take() {
                    let _ = ctx.exchange.api().cancel_orders(&[order]).await;
                }
                return Ok(CommandState::Finished);
            }
        }

        match &state.active_order {
            None => {
                let amount = ctx.exchange.round_amount(&ctx.symbol, state.amount_left);
                let (order, placed_price) = place_at_top_of_book(ctx, state.side, amount).await?;
                info!(order_id = %order.id, price = %placed_price, "aggressiveEntry placed");
                if !state.tag.is_empty() {
                    ctx.session.lock().replace_last(&state.tag, order.clone());
                }
                state.active_top_of_book = Some(placed_price);
                state.active_order = Some(order);
            }
            Some(order) => {
                let current = ctx.exchange.api().order(&order.id).await?;
                match current {
                    Some(o) if o.is_filled => {
                        state.amount_left -= o.executed;
                        state.active_order = None;
                        state.active_top_of_book = None;
                        state.wait = ctx.exchange.polling_bounds().min;
                        return Ok(CommandState::KeepGoing);
                    }
                    Some(o) if !o.is_open => {
                        return Err(crate::error::AbortSequence.into());
                    }
                    Some(o) => {
                        let moved = state.active_top_of_book != Some(price);
                        if moved {
                            let _ = ctx.exchange.api().cancel_orders(&[order.clone()]).await;
                            state.amount_left -= o.executed;
                            state.active_order = None;
                            state.active_top_of_book = None;
                            state.wait = ctx.exchange.polling_bounds().min;
                            return Ok(CommandState::KeepGoing);
                        }
                    }
                    None => {
                        state.active_order = None;
                        state.active_top_of_book = None;
                        return Ok(CommandState::KeepGoing);
                    }
                }
            }
        }

        state.wait = (state.wait + 1).min(max_wait);
        Ok(CommandState::KeepGoingBackOff)
    }

    fn can_complete_in_background(&self) -> bool {
        true
    }

    async fn on_cancelled(&mut self, ctx: &CommandCtx) {
        if let Some(state) = &mut self.state {
            if let Some(order) = state.active_order.take() {
                let _ = ctx.exchange.api().cancel_orders(&[order]).await;
            }
        }
    }

    fn algo_side(&self) -> Option<Side> {
        self.state.as_ref().map(|s| s.side)
    }

    fn tag(&self) -> Option<String> {
        self.state.as_ref().map(|s| s.tag.clone()).filter(|t| !t.is_empty())
    }
}

fn time_limit(args: &Args) -> Result<Option<tokio::time::Instant>, crate::error::Error> {
    match args.get("timeLimit").filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => {
            let secs = parse_duration_secs(raw)?;
            Ok(Some(tokio::time::Instant::now() + std::time::Duration::from_secs(secs)))
        }
    }
}

/// Slippage is an adverse-direction cap (too high for a buy, too low for a
/// sell), so it resolves like a protective stop price — via `side.opposite()`
/// (§4.1 step 5's composition note, [`crate::commands::stop_common`]).
async fn slippage_price(
    ctx: &CommandCtx,
    side: Side,
    args: &Args,
) -> Result<Option<Decimal>, crate::error::Error> {
    let Some(raw) = args.get("slippageLimit").filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let spec = crate::expr::offset::OffsetSpec::parse(raw)?;
    let ticker = ctx.exchange.api().ticker(&ctx.symbol).await?;
    Ok(Some(crate::expr::offset::offset_to_absolute_price(
        side.opposite(),
        &ticker,
        spec,
    )))
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

    fn ctx(fake: Arc<FakeExchangeApi>) -> CommandCtx {
        let exchange = Arc::new(Exchange::new("deribit", fake, PollingBounds { min: 0, max: 1 }));
        CommandCtx {
            exchange,
            symbol: "X".into(),
            session: Arc::new(parking_lot::Mutex::new(Session::new())),
            notifier: Arc::new(LoggingNotifier),
        }
    }

    #[tokio::test]
    async fn places_at_top_of_book_then_finishes_on_full_fill() {
        let fake = Arc::new(FakeExchangeApi::new().with_ticker(Ticker {
            bid: dec!(1000),
            ask: dec!(1001),
            last_price: dec!(1000),
        }));
        let ctx = ctx(fake.clone());

        let mut cmd = AggressiveEntry::new(vec![named("side", "buy", 0), named("amount", "1", 1)]);
        let state = cmd.execute(&ctx).await.unwrap();
        assert_eq!(state, CommandState::KeepGoing);

        let state = cmd.background_execute(&ctx).await.unwrap();
        assert_eq!(state, CommandState::KeepGoingBackOff);
        assert_eq!(fake.calls().limit_order, 1);

        let order_id = cmd.state.as_ref().unwrap().active_order.as_ref().unwrap().id.clone();
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
        assert_eq!(state, CommandState::KeepGoing);

        let state = cmd.background_execute(&ctx).await.unwrap();
        assert_eq!(state, CommandState::Finished);
    }

    #[tokio::test]
    async fn time_limit_elapsing_cancels_the_active_order_and_finishes() {
        let fake = Arc::new(FakeExchangeApi::new().with_ticker(Ticker {
            bid: dec!(1000),
            ask: dec!(1001),
            last_price: dec!(1000),
        }));
        let ctx = ctx(fake.clone());

        let mut cmd = AggressiveEntry::new(vec![
            named("side", "buy", 0),
            named("amount", "1", 1),
            named("timeLimit", "1s", 2),
        ]);
        cmd.execute(&ctx).await.unwrap();

        let state = cmd.background_execute(&ctx).await.unwrap();
        assert_eq!(state, CommandState::KeepGoingBackOff);
        assert_eq!(fake.calls().limit_order, 1);

        // Once the deadline (§4.3 step 2) passes with no fill, the next poll
        // cancels the resting order and reports Finished.
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        let state = cmd.background_execute(&ctx).await.unwrap();
        assert_eq!(state, CommandState::Finished);
        assert_eq!(fake.calls().cancel_orders, 1);
    }

    #[tokio::test]
    async fn slippage_breach_cancels_and_finishes() {
        let fake = Arc::new(FakeExchangeApi::new().with_ticker(Ticker {
            bid: dec!(1000),
            ask: dec!(1001),
            last_price: dec!(1000),
        }));
        let ctx = ctx(fake.clone());

        let mut cmd = AggressiveEntry::new(vec![
            named("side", "buy", 0),
            named("amount", "1", 1),
            named("slippageLimit", "-10", 2),
        ]);
        cmd.execute(&ctx).await.unwrap();
        let state = cmd.background_execute(&ctx).await.unwrap();
        assert_eq!(state, CommandState::Finished);
        assert_eq!(fake.calls().limit_order, 0);
    }
}
