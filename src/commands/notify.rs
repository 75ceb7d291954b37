//! `notify(message)` (§4.3, §1: notifier port). Best-effort: a failed send
//! is logged by the notifier implementation itself and never aborts the
//! sequence.

use async_trait::async_trait;

use crate::context::CommandCtx;
use crate::error::CommandResult;
use crate::normalizer::merge_args;
use crate::parser::ParsedArg;
use crate::scheduler::{Command, CommandState};

const DEFAULTS: &[(&str, &str)] = &[("message", "")];

pub struct Notify {
    raw_args: Vec<ParsedArg>,
}

impl Notify {
    pub fn new(raw_args: Vec<ParsedArg>) -> Self {
        Self { raw_args }
    }
}

#[async_trait]
impl Command for Notify {
    async fn execute(&mut self, ctx: &CommandCtx) -> CommandResult<CommandState> {
        let args = merge_args(DEFAULTS, &self.raw_args);
        let message = args.get("message").unwrap_or_default();
        let _ = ctx.notifier.send(message).await;
        Ok(CommandState::Finished)
    }
}
