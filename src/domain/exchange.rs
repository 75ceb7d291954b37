//! Exchange runtime handle (§3: "Exchange"). Owns everything a command
//! needs that must outlive a single command: the API port, the symbol
//! table, the algo-order registry, the background-task set, and the
//! reference count that gates teardown. Passed into every command instead
//! of reaching for process-global state (§9 design note).

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use tokio::task::JoinSet;

use crate::domain::algo_registry::AlgoOrderRegistry;
use crate::domain::symbol::SymbolTable;
use crate::error::Error;
use crate::port::exchange::ExchangeApi;

/// `[minPollingDelay, maxPollingDelay]` in seconds (§3, §5).
#[derive(Debug, Clone, Copy)]
pub struct PollingBounds {
    pub min: u64,
    pub max: u64,
}

pub struct Exchange {
    pub name: String,
    api: Arc<dyn ExchangeApi>,
    symbols: RwLock<SymbolTable>,
    algo_registry: AlgoOrderRegistry,
    background: Mutex<JoinSet<()>>,
    refcount: AtomicUsize,
    polling_bounds: PollingBounds,
}

impl Exchange {
    pub fn new(name: impl Into<String>, api: Arc<dyn ExchangeApi>, polling_bounds: PollingBounds) -> Self {
        Self {
            name: name.into(),
            api,
            symbols: RwLock::new(SymbolTable::new()),
            algo_registry: AlgoOrderRegistry::new(),
            background: Mutex::new(JoinSet::new()),
            refcount: AtomicUsize::new(0),
            polling_bounds,
        }
    }

    pub fn api(&self) -> &Arc<dyn ExchangeApi> {
        &self.api
    }

    pub fn polling_bounds(&self) -> PollingBounds {
        self.polling_bounds
    }

    pub fn algo_registry(&self) -> &AlgoOrderRegistry {
        &self.algo_registry
    }

    /// Fetch and cache `SymbolData` for `symbol` (§4.5 point 3).
    pub async fn add_symbol(&self, symbol: &str) -> Result<(), Error> {
        let data = self.api.add_symbol(symbol).await?;
        self.symbols.write().insert(symbol, data);
        Ok(())
    }

    pub fn min_order_size(&self, symbol: &str) -> Decimal {
        self.symbols.read().min_order_size(symbol)
    }

    pub fn round_amount(&self, symbol: &str, amount: Decimal) -> Decimal {
        self.symbols.read().round_amount(symbol, amount)
    }

    pub fn round_price(&self, symbol: &str, price: Decimal) -> Decimal {
        self.symbols.read().round_price(symbol, price)
    }

    /// Increment the reference count; returns the new count.
    pub fn mark_opened(&self) -> usize {
        self.refcount.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Decrement the reference count; returns the new count.
    pub fn mark_closed(&self) -> usize {
        self.refcount.fetch_sub(1, Ordering::SeqCst) - 1
    }

    pub fn refcount(&self) -> usize {
        self.refcount.load(Ordering::SeqCst)
    }

    /// Hand a future to this exchange's background-task set. `addTask` must
    /// make the task visible to [`Self::wait_for_background_tasks`] before
    /// the next foreground action starts (§5) — spawning synchronously
    /// under the lock satisfies that.
    pub fn spawn_background<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.background.lock().spawn(fut);
    }

    /// Await every currently-tracked background task. New tasks spawned
    /// concurrently with this call are not guaranteed to be awaited by it
    /// (§4.5 point 4 only requires waiting for the set as of sequence end).
    pub async fn wait_for_background_tasks(&self) {
        let mut set = {
            let mut guard = self.background.lock();
            std::mem::replace(&mut *guard, JoinSet::new())
        };
        while set.join_next().await.is_some() {}
    }
}
