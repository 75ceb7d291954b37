//! `marketOrder(side, amount, position, tag)` (§4.3): one API call;
//! `isEverything` is inferred from `position=all`.

use async_trait::async_trait;
use tracing::debug;

use crate::commands::register_order;
use crate::context::CommandCtx;
use crate::error::{CommandResult, Error};
use crate::normalizer::{calculate_position, merge_args, validate_side};
use crate::parser::ParsedArg;
use crate::scheduler::{Command, CommandState};

const DEFAULTS: &[(&str, &str)] = &[("side", ""), ("amount", "0"), ("position", ""), ("tag", "")];

pub struct MarketOrder {
    raw_args: Vec<ParsedArg>,
}

impl MarketOrder {
    pub fn new(raw_args: Vec<ParsedArg>) -> Self {
        Self { raw_args }
    }
}

#[async_trait]
impl Command for MarketOrder {
    async fn execute(&mut self, ctx: &CommandCtx) -> CommandResult<CommandState> {
        let mut args = merge_args(DEFAULTS, &self.raw_args);
        let side = validate_side(&mut args)?;
        let is_everything = args
            .get("position")
            .map(|p| p.eq_ignore_ascii_case("all"))
            .unwrap_or(false);
        calculate_position(ctx, &mut args, side).await?;
        let side = args.side().unwrap_or(side);

        let amount = args.decimal("amount")?;
        if amount.is_zero() {
            return Err(Error::ZeroSize(format!("marketOrder amount is zero for {}", ctx.symbol)).into());
        }

        let order = ctx
            .exchange
            .api()
            .market_order(&ctx.symbol, amount, side, is_everything)
            .await?;

        debug!(order_id = %order.id, %side, %amount, "marketOrder placed");
        register_order(ctx, &args, order);
        Ok(CommandState::Finished)
    }
}
