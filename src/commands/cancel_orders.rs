//! `cancelOrders(who, tag?, id?)` (§4.3). Marks matching algo-order entries
//! cancelled; the owning background loops observe the flag on their next
//! wake (§4.2). Never touches a resting order directly — cancellation here
//! is a request, carried out by each command's own `on_cancelled` hook.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::context::CommandCtx;
use crate::domain::algo_registry::CancelWho;
use crate::error::{CommandResult, Error};
use crate::normalizer::merge_args;
use crate::parser::ParsedArg;
use crate::scheduler::{Command, CommandState};

const DEFAULTS: &[(&str, &str)] = &[("who", "session"), ("tag", ""), ("id", "")];

pub struct CancelOrders {
    raw_args: Vec<ParsedArg>,
}

impl CancelOrders {
    pub fn new(raw_args: Vec<ParsedArg>) -> Self {
        Self { raw_args }
    }
}

#[async_trait]
impl Command for CancelOrders {
    async fn execute(&mut self, ctx: &CommandCtx) -> CommandResult<CommandState> {
        let args = merge_args(DEFAULTS, &self.raw_args);
        let who_raw = args.get("who").unwrap_or("session");

        let who = match who_raw.to_ascii_lowercase().as_str() {
            "all" => CancelWho::All,
            "session" => CancelWho::Session,
            "tagged" => CancelWho::Tagged(args.string("tag").unwrap_or_default()),
            "id" => {
                let raw_id = args.string("id").unwrap_or_default();
                let id = Uuid::parse_str(&raw_id)
                    .map_err(|_| Error::InvalidArgument(format!("bad cancelOrders id: {raw_id}")))?;
                CancelWho::Id(id)
            }
            other => {
                return Err(Error::InvalidArgument(format!("unknown cancelOrders who: {other}")).into())
            }
        };

        let cancelled = ctx.exchange.algo_registry().cancel(&who, ctx.session_id());
        info!(who = who_raw, cancelled, "cancelOrders");
        Ok(CommandState::Finished)
    }
}
