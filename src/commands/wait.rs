//! `wait(duration)` (§4.3): a plain foreground sleep, duration parsed by the
//! expression evaluator's duration grammar.

use async_trait::async_trait;

use crate::context::CommandCtx;
use crate::error::CommandResult;
use crate::expr::duration::parse_duration_secs;
use crate::normalizer::merge_args;
use crate::parser::ParsedArg;
use crate::scheduler::{Command, CommandState};

const DEFAULTS: &[(&str, &str)] = &[("duration", "0")];

pub struct Wait {
    raw_args: Vec<ParsedArg>,
}

impl Wait {
    pub fn new(raw_args: Vec<ParsedArg>) -> Self {
        Self { raw_args }
    }
}

#[async_trait]
impl Command for Wait {
    async fn execute(&mut self, _ctx: &CommandCtx) -> CommandResult<CommandState> {
        let args = merge_args(DEFAULTS, &self.raw_args);
        let secs = parse_duration_secs(args.get("duration").unwrap_or("0"))?;
        tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
        Ok(CommandState::Finished)
    }
}
