//! `notSupported` (§4.3): substituted for an action name an exchange (or
//! this build) doesn't implement. Sleeps a second and returns — the
//! sequence keeps going rather than aborting on an unrecognized action.

use async_trait::async_trait;
use tracing::warn;

use crate::context::CommandCtx;
use crate::error::CommandResult;
use crate::scheduler::{Command, CommandState};

pub struct NotSupported {
    action_name: String,
}

impl NotSupported {
    pub fn new(action_name: &str) -> Self {
        Self {
            action_name: action_name.to_string(),
        }
    }
}

#[async_trait]
impl Command for NotSupported {
    async fn execute(&mut self, _ctx: &CommandCtx) -> CommandResult<CommandState> {
        warn!(action = %self.action_name, "unsupported action, ignoring");
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        Ok(CommandState::Finished)
    }
}
