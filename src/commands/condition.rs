//! `continueIf` / `stopIf(if=condition, value)` (§4.3): evaluate a condition
//! against current market/position state. `continueIf` aborts the block if
//! the test is false; `stopIf` aborts if it's true — resolved symmetrically
//! so both route through [`crate::error::AbortSequence`].

use async_trait::async_trait;

use crate::context::CommandCtx;
use crate::error::{AbortSequence, CommandResult};
use crate::expr::condition::{Condition, EvalContext};
use crate::normalizer::merge_args;
use crate::parser::ParsedArg;
use crate::scheduler::{Command, CommandState};

const DEFAULTS: &[(&str, &str)] = &[("if", "always"), ("value", "")];

enum Kind {
    ContinueIf,
    StopIf,
}

pub struct ConditionCommand {
    raw_args: Vec<ParsedArg>,
    kind: Kind,
}

impl ConditionCommand {
    pub fn new_continue_if(raw_args: Vec<ParsedArg>) -> Self {
        Self {
            raw_args,
            kind: Kind::ContinueIf,
        }
    }

    pub fn new_stop_if(raw_args: Vec<ParsedArg>) -> Self {
        Self {
            raw_args,
            kind: Kind::StopIf,
        }
    }
}

#[async_trait]
impl Command for ConditionCommand {
    async fn execute(&mut self, ctx: &CommandCtx) -> CommandResult<CommandState> {
        let args = merge_args(DEFAULTS, &self.raw_args);
        let condition = Condition::parse(args.get("if").unwrap_or("always"))?;
        let value = args.get("value").unwrap_or("");

        let ticker = ctx.exchange.api().ticker(&ctx.symbol).await?;
        let position = ctx.exchange.api().position(&ctx.symbol).await?;
        let eval = EvalContext {
            position,
            bid: ticker.bid,
            ask: ticker.ask,
        };
        let result = condition.evaluate(&eval, value)?;

        let should_abort = match self.kind {
            Kind::ContinueIf => !result,
            Kind::StopIf => result,
        };
        if should_abort {
            return Err(AbortSequence.into());
        }
        Ok(CommandState::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::exchange::{Exchange, PollingBounds};
    use crate::domain::session::Session;
    use crate::error::CommandOutcome;
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

    fn ctx(position: rust_decimal::Decimal) -> CommandCtx {
        let fake = Arc::new(
            FakeExchangeApi::new()
                .with_ticker(Ticker {
                    bid: dec!(100),
                    ask: dec!(100),
                    last_price: dec!(100),
                })
                .with_position(position),
        );
        let exchange = Arc::new(Exchange::new("deribit", fake, PollingBounds { min: 1, max: 5 }));
        CommandCtx {
            exchange,
            symbol: "X".into(),
            session: Arc::new(parking_lot::Mutex::new(Session::new())),
            notifier: Arc::new(LoggingNotifier),
        }
    }

    #[tokio::test]
    async fn continue_if_aborts_when_condition_is_false() {
        let ctx = ctx(dec!(0));
        let mut cmd = ConditionCommand::new_continue_if(vec![named("if", "positionLong", 0)]);
        let err = cmd.execute(&ctx).await.unwrap_err();
        assert!(matches!(err, CommandOutcome::Abort(_)));
    }

    #[tokio::test]
    async fn continue_if_passes_through_when_condition_is_true() {
        let ctx = ctx(dec!(5));
        let mut cmd = ConditionCommand::new_continue_if(vec![named("if", "positionLong", 0)]);
        let state = cmd.execute(&ctx).await.unwrap();
        assert_eq!(state, CommandState::Finished);
    }

    #[tokio::test]
    async fn stop_if_aborts_when_condition_is_true() {
        let ctx = ctx(dec!(5));
        let mut cmd = ConditionCommand::new_stop_if(vec![named("if", "positionLong", 0)]);
        let err = cmd.execute(&ctx).await.unwrap_err();
        assert!(matches!(err, CommandOutcome::Abort(_)));
    }
}
