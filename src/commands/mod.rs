//! Command catalogue (§4.3). Each submodule implements one action name's
//! contract on top of the normalizer (§4.1) and the scheduler's `Command`
//! trait (§4.2). [`build`] maps a parsed action name to its command.

mod aggressive_entry;
mod cancel_orders;
mod condition;
mod limit_order;
mod market_order;
mod not_supported;
mod notify;
mod scaled_order;
mod stop_and_take_profit;
mod stop_common;
mod stop_market_order;
mod trailing;
mod trailing_stop;
mod trailing_take_profit;
mod wait;

use crate::domain::order::BrokerOrder;
use crate::normalizer::Args;
use crate::parser::ParsedArg;
use crate::scheduler::Command;

/// Resolve a parsed action name to its command, carrying the action's raw
/// argument list through to `execute()` where normalization happens (§4.1
/// needs the live exchange handle, so merging/validating can't happen here).
/// An unrecognized name is dispatched to [`not_supported::NotSupported`],
/// which logs it and sleeps 1s rather than aborting the block (§4.3
/// "notSupported").
pub fn build(name: &str, args: Vec<ParsedArg>) -> Box<dyn Command> {
    match name {
        "limitOrder" => Box::new(limit_order::LimitOrder::new(args)),
        "marketOrder" => Box::new(market_order::MarketOrder::new(args)),
        "stopMarketOrder" => Box::new(stop_market_order::StopMarketOrder::new(args)),
        "scaledOrder" => Box::new(scaled_order::ScaledOrder::new(args)),
        "trailingStop" => Box::new(trailing_stop::TrailingStop::new(args)),
        "trailingTakeProfit" => Box::new(trailing_take_profit::TrailingTakeProfit::new(args)),
        "aggressiveEntry" => Box::new(aggressive_entry::AggressiveEntry::new(args)),
        "stopAndTakeProfitOrder" => Box::new(stop_and_take_profit::StopAndTakeProfitOrder::new(args)),
        "wait" => Box::new(wait::Wait::new(args)),
        "continueIf" => Box::new(condition::ConditionCommand::new_continue_if(args)),
        "stopIf" => Box::new(condition::ConditionCommand::new_stop_if(args)),
        "notify" => Box::new(notify::Notify::new(args)),
        "cancelOrders" => Box::new(cancel_orders::CancelOrders::new(args)),
        _ => Box::new(not_supported::NotSupported::new(name)),
    }
}

/// Register a freshly-placed broker order under `args`' `tag` (empty string
/// tags to the session's untagged bucket) — shared by every one-shot order
/// command (§3: "Session").
pub(super) fn register_order(ctx: &crate::context::CommandCtx, args: &Args, order: BrokerOrder) {
    let tag = args.string("tag").unwrap_or_default();
    ctx.session.lock().register(tag, order);
}
