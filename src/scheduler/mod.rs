//! Scheduler (§4.2): the `Command` trait every command implements, and the
//! polling-loop driver shared by the scheduler's own foreground
//! drive-to-completion and by commands handed to the background-task pool.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::context::CommandCtx;
use crate::domain::types::Side;
use crate::error::{CommandOutcome, CommandResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Finished,
    KeepGoing,
    KeepGoingBackOff,
}

/// One action inside a command sequence (§3: "Command"). `execute` runs the
/// argument normalizer and whatever work completes synchronously; anything
/// returning a non-`Finished` state either runs to completion in place
/// (`can_complete_in_background() == false`) or is handed to the exchange's
/// background-task pool.
#[async_trait]
pub trait Command: Send + Sync {
    async fn execute(&mut self, ctx: &CommandCtx) -> CommandResult<CommandState>;

    async fn background_execute(&mut self, _ctx: &CommandCtx) -> CommandResult<CommandState> {
        Ok(CommandState::Finished)
    }

    fn can_complete_in_background(&self) -> bool {
        false
    }

    /// Commands that must poll at a fixed `maxPollingDelay` cadence (§4.3
    /// `stopAndTakeProfitOrder`) override this so the driver seeds `wait` at
    /// `bounds.max` from the first iteration, instead of ramping up from
    /// `bounds.min` like the default trailing/aggressive-entry loops.
    fn poll_at_max_pace(&self) -> bool {
        false
    }

    /// Called once, cooperatively, when the algo registry observes this
    /// command has been cancelled. Default is a no-op; commands holding a
    /// resting broker order override this to cancel it.
    async fn on_cancelled(&mut self, _ctx: &CommandCtx) {}

    /// Side recorded in the algo-order registry entry, if any (§3).
    fn algo_side(&self) -> Option<Side> {
        None
    }

    /// Tag recorded in the algo-order registry entry, if any (§3, §4.3
    /// `cancelOrders(who=tagged, ...)`).
    fn tag(&self) -> Option<String> {
        None
    }
}

/// Run one command to completion: its synchronous `execute()`, then either
/// a background-pool handoff or an inline drive-to-completion, per
/// `can_complete_in_background` (§4.2).
pub async fn run_to_completion(ctx: &CommandCtx, mut command: Box<dyn Command>) -> CommandResult<()> {
    let state = command.execute(ctx).await?;
    if state == CommandState::Finished {
        return Ok(());
    }

    if command.can_complete_in_background() {
        let ctx = ctx.clone();
        ctx.exchange.spawn_background(async move {
            drive_to_completion(ctx, command).await;
        });
    } else {
        drive_to_completion(ctx.clone(), command).await;
    }
    Ok(())
}

/// The shared polling loop (§4.2): sleeps `waitTime` seconds, checks for
/// cancellation, calls `background_execute`, and adjusts `waitTime` per the
/// returned state. A failure here is logged and ends the loop — a
/// backgrounded command's errors never propagate back to a sequence runner
/// that has already moved on (§7).
async fn drive_to_completion(ctx: CommandCtx, mut command: Box<dyn Command>) {
    let bounds = ctx.exchange.polling_bounds();
    let algo_id = ctx
        .exchange
        .algo_registry()
        .register(command.algo_side(), ctx.session_id(), command.tag());

    let mut wait = if command.poll_at_max_pace() { bounds.max } else { bounds.min };
    loop {
        tokio::time::sleep(Duration::from_secs(wait)).await;
        if wait < bounds.max {
            wait += 1;
        }

        if ctx.exchange.algo_registry().is_cancelled(algo_id) {
            info!(%algo_id, "command cancelled, running cancel hook");
            command.on_cancelled(&ctx).await;
            break;
        }

        match command.background_execute(&ctx).await {
            Ok(CommandState::Finished) => {
                debug!(%algo_id, "command finished");
                break;
            }
            Ok(CommandState::KeepGoing) => wait = bounds.min,
            Ok(CommandState::KeepGoingBackOff) => {}
            Err(outcome) => {
                log_outcome(&outcome);
                break;
            }
        }
    }

    ctx.exchange.algo_registry().remove(algo_id);
}

fn log_outcome(outcome: &CommandOutcome) {
    match outcome {
        CommandOutcome::Failed(e) => warn!(error = %e, "backgrounded command failed"),
        CommandOutcome::Abort(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;

    use super::*;
    use crate::domain::exchange::{Exchange, PollingBounds};
    use crate::domain::session::Session;
    use crate::port::notifier::LoggingNotifier;
    use crate::testkit::exchange::FakeExchangeApi;

    fn ctx() -> CommandCtx {
        let exchange = Arc::new(Exchange::new(
            "fake",
            Arc::new(FakeExchangeApi::new()),
            PollingBounds { min: 0, max: 0 },
        ));
        CommandCtx {
            exchange,
            symbol: "X".into(),
            session: Arc::new(SyncMutex::new(Session::new())),
            notifier: Arc::new(LoggingNotifier),
        }
    }

    struct CountThenFinish {
        remaining: u32,
        ticks: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Command for CountThenFinish {
        async fn execute(&mut self, _ctx: &CommandCtx) -> CommandResult<CommandState> {
            Ok(CommandState::KeepGoing)
        }

        async fn background_execute(&mut self, _ctx: &CommandCtx) -> CommandResult<CommandState> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            if self.remaining == 0 {
                return Ok(CommandState::Finished);
            }
            self.remaining -= 1;
            Ok(CommandState::KeepGoing)
        }
    }

    #[tokio::test]
    async fn drives_foreground_loop_to_completion() {
        let ctx = ctx();
        let ticks = Arc::new(AtomicU32::new(0));
        let command = Box::new(CountThenFinish {
            remaining: 3,
            ticks: ticks.clone(),
        });
        run_to_completion(&ctx, command).await.unwrap();
        assert_eq!(ticks.load(Ordering::SeqCst), 4);
        assert!(ctx.exchange.algo_registry().is_empty());
    }

    struct CancelAware {
        cancelled: Arc<std::sync::atomic::AtomicBool>,
    }

    #[async_trait]
    impl Command for CancelAware {
        async fn execute(&mut self, _ctx: &CommandCtx) -> CommandResult<CommandState> {
            Ok(CommandState::KeepGoingBackOff)
        }

        async fn background_execute(&mut self, _ctx: &CommandCtx) -> CommandResult<CommandState> {
            Ok(CommandState::KeepGoingBackOff)
        }

        async fn on_cancelled(&mut self, _ctx: &CommandCtx) {
            self.cancelled.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn cancellation_invokes_cancel_hook_and_stops_the_loop() {
        let ctx = ctx();
        let cancelled = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let command = Box::new(CancelAware {
            cancelled: cancelled.clone(),
        });

        // Run inline (not via run_to_completion) so we can cancel concurrently.
        let ctx_clone = ctx.clone();
        let handle = tokio::spawn(async move {
            drive_to_completion(ctx_clone, command).await;
        });

        // Give the loop a moment to register, then cancel everything.
        tokio::task::yield_now().await;
        let registry = ctx.exchange.algo_registry();
        let session = ctx.session_id();
        while registry.is_empty() {
            tokio::task::yield_now().await;
        }
        registry.cancel(&crate::domain::algo_registry::CancelWho::Session, session);

        handle.await.unwrap();
        assert!(cancelled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn background_handoff_runs_to_completion_via_wait_for_background_tasks() {
        let ctx = ctx();
        let ticks = Arc::new(AtomicU32::new(0));

        struct Backgroundable {
            ticks: Arc<AtomicU32>,
        }
        #[async_trait]
        impl Command for Backgroundable {
            async fn execute(&mut self, _ctx: &CommandCtx) -> CommandResult<CommandState> {
                Ok(CommandState::KeepGoing)
            }
            async fn background_execute(&mut self, _ctx: &CommandCtx) -> CommandResult<CommandState> {
                self.ticks.fetch_add(1, Ordering::SeqCst);
                Ok(CommandState::Finished)
            }
            fn can_complete_in_background(&self) -> bool {
                true
            }
        }

        run_to_completion(
            &ctx,
            Box::new(Backgroundable {
                ticks: ticks.clone(),
            }),
        )
        .await
        .unwrap();
        ctx.exchange.wait_for_background_tasks().await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }
}
