//! Exchange manager (§4.5): a reference-counted pool of open [`Exchange`]s
//! keyed by [`Credentials`], and the entry point that turns one raw webhook
//! message into parsed blocks dispatched in parallel across exchanges and
//! in series within one.
//!
//! Concrete exchange adapters are out of scope (§1) — the manager is handed
//! an [`ApiFactory`] at construction, grounded on the teacher's
//! `StreamFactory` pattern (`infrastructure/exchange/pool.rs`:
//! `Arc<dyn Fn() -> Box<dyn MarketDataStream> + Send + Sync>`) for injecting
//! a pluggable constructor instead of hard-wiring one venue.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::context::CommandCtx;
use crate::domain::credentials::{find_credentials, Credentials};
use crate::domain::exchange::{Exchange, PollingBounds};
use crate::domain::session::Session;
use crate::error::CommandOutcome;
use crate::parser::{extract_alert, parse_blocks, ParsedBlock};
use crate::port::exchange::ExchangeApi;
use crate::port::notifier::Notifier;
use crate::scheduler::run_to_completion;

/// Constructs a fresh [`ExchangeApi`] for one credentials record. Injected
/// rather than hard-coded since per-venue adapters live outside the core
/// (§1 Non-goals).
pub type ApiFactory = Arc<dyn Fn(&Credentials) -> Arc<dyn ExchangeApi> + Send + Sync>;

/// Grace window between a sequence finishing and its exchange's refcount
/// actually being decremented (§3 invariant, §4.5 point 3: "schedule
/// `closeExchange` after 500 ms").
const CLOSE_GRACE: Duration = Duration::from_millis(500);

pub struct ExchangeManager {
    pool: DashMap<Credentials, Arc<Exchange>>,
    api_factory: ApiFactory,
    polling_bounds: PollingBounds,
    notifier: Arc<dyn Notifier>,
}

impl ExchangeManager {
    pub fn new(api_factory: ApiFactory, polling_bounds: PollingBounds, notifier: Arc<dyn Notifier>) -> Arc<Self> {
        Arc::new(Self {
            pool: DashMap::new(),
            api_factory,
            polling_bounds,
            notifier,
        })
    }

    pub fn open_exchange_count(&self) -> usize {
        self.pool.len()
    }

    /// Returns the existing pool entry (incrementing refcount) or
    /// constructs one and calls `init()`; init failure tears the partial
    /// entry down and returns `None` (§4.5).
    async fn open_exchange(&self, credentials: &Credentials) -> Option<Arc<Exchange>> {
        if let Some(existing) = self.pool.get(credentials) {
            existing.mark_opened();
            return Some(existing.clone());
        }

        let api = (self.api_factory)(credentials);
        let exchange = Arc::new(Exchange::new(credentials.exchange.clone(), api, self.polling_bounds));
        if let Err(e) = exchange.api().init().await {
            warn!(exchange = %credentials.name, error = %e, "exchange init failed, discarding");
            return None;
        }
        exchange.mark_opened();

        // Lost the race to another opener for the same credentials: keep
        // theirs, let ours (never registered) drop uninitialized.
        if let Some(existing) = self.pool.get(credentials) {
            existing.mark_opened();
            return Some(existing.clone());
        }
        self.pool.insert(credentials.clone(), exchange.clone());
        Some(exchange)
    }

    /// Decrement the refcount for `credentials`'s exchange; tear it down and
    /// remove it from the pool if it reaches zero (§3: "torn down only on
    /// 0 with a ≥500 ms defer to let final callbacks drain" — the defer
    /// itself happens in the caller, before this runs).
    async fn close_exchange(&self, credentials: &Credentials) {
        let Some(exchange) = self.pool.get(credentials).map(|e| e.clone()) else {
            return;
        };
        if exchange.mark_closed() > 0 {
            return;
        }
        // Refcount is 0: remove and tear down. A concurrent open() between
        // the decrement above and this removal would re-insert a fresh
        // entry after us, which is fine — it simply starts a new exchange.
        if self.pool.remove_if(credentials, |_, e| e.refcount() == 0).is_some() {
            if let Err(e) = exchange.api().terminate().await {
                warn!(exchange = %credentials.name, error = %e, "exchange terminate failed");
            }
        }
    }

    fn schedule_close(manager: Arc<Self>, credentials: Credentials) {
        tokio::spawn(async move {
            tokio::time::sleep(CLOSE_GRACE).await;
            manager.close_exchange(&credentials).await;
        });
    }

    /// `executeMessage(msg, credentialList)` (§4.5): alert extraction, then
    /// per-block dispatch concurrently across exchanges. Takes `self` by
    /// `Arc` since each block's dispatch outlives this call (spawned tasks);
    /// callers hold an `Arc<ExchangeManager>` and clone it per invocation.
    pub async fn execute_message(self: Arc<Self>, message: &str, credentials: &[Credentials]) {
        if let Some(alert) = extract_alert(message) {
            if let Err(e) = self.notifier.send(&alert).await {
                warn!(error = %e, "alert notification failed");
            }
        }

        let blocks = parse_blocks(message);
        let mut joined = JoinSet::new();
        for block in blocks {
            let Some(creds) = find_credentials(credentials, &block.exchange).cloned() else {
                debug!(exchange = %block.exchange, "no matching credentials, dropping block");
                continue;
            };
            let manager = self.clone();
            joined.spawn(async move { manager.execute_block(block, creds).await });
        }
        while joined.join_next().await.is_some() {}
    }

    async fn execute_block(self: Arc<Self>, block: ParsedBlock, credentials: Credentials) {
        let Some(exchange) = self.open_exchange(&credentials).await else {
            return;
        };

        if let Err(e) = exchange.add_symbol(&block.symbol).await {
            warn!(exchange = %credentials.name, symbol = %block.symbol, error = %e, "addSymbol failed");
        }

        self.execute_command_sequence(&exchange, &block).await;
        Self::schedule_close(self.clone(), credentials);
    }

    /// `executeCommandSequence` (§4.5 point 4): actions run in series,
    /// stopping on a silent `AbortSequence` or a logged failure, then
    /// awaits the exchange's background-task set before returning.
    async fn execute_command_sequence(&self, exchange: &Arc<Exchange>, block: &ParsedBlock) {
        let session = Arc::new(parking_lot::Mutex::new(Session::new()));

        for action in &block.actions {
            let ctx = CommandCtx {
                exchange: exchange.clone(),
                symbol: block.symbol.clone(),
                session: session.clone(),
                notifier: self.notifier.clone(),
            };

            let command = commands::build(&action.name, action.args.clone());

            debug!(exchange = %exchange.name, symbol = %block.symbol, action = %action.name, "executing action");
            match run_to_completion(&ctx, command).await {
                Ok(()) => {}
                Err(CommandOutcome::Abort(_)) => break,
                Err(CommandOutcome::Failed(e)) => {
                    error!(exchange = %exchange.name, symbol = %block.symbol, action = %action.name, error = %e, "command failed");
                    break;
                }
            }
        }

        exchange.wait_for_background_tasks().await;
        info!(exchange = %exchange.name, symbol = %block.symbol, "command sequence finished");
    }
}
