//! `stopMarketOrder(side, offset, amount, trigger, tag)` (§4.3): one API
//! `stopOrder` call, placed protectively (opposite-side offset direction).

use async_trait::async_trait;
use tracing::debug;

use crate::commands::register_order;
use crate::commands::stop_common::place_protective_stop;
use crate::context::CommandCtx;
use crate::error::CommandResult;
use crate::normalizer::{merge_args, validate_side, validate_trigger};
use crate::parser::ParsedArg;
use crate::scheduler::{Command, CommandState};

const DEFAULTS: &[(&str, &str)] = &[
    ("side", ""),
    ("offset", ""),
    ("amount", "0"),
    ("trigger", "last"),
    ("tag", ""),
];

pub struct StopMarketOrder {
    raw_args: Vec<ParsedArg>,
}

impl StopMarketOrder {
    pub fn new(raw_args: Vec<ParsedArg>) -> Self {
        Self { raw_args }
    }
}

#[async_trait]
impl Command for StopMarketOrder {
    async fn execute(&mut self, ctx: &CommandCtx) -> CommandResult<CommandState> {
        let mut args = merge_args(DEFAULTS, &self.raw_args);
        let side = validate_side(&mut args)?;
        let trigger = validate_trigger(&mut args);

        let placed = place_protective_stop(ctx, &mut args, side, trigger).await?;
        debug!(order_id = %placed.order.id, %side, price = %placed.price, "stopMarketOrder placed");
        register_order(ctx, &args, placed.order);
        Ok(CommandState::Finished)
    }
}
