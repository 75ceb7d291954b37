//! [`FakeExchangeApi`] — a scripted, in-memory [`ExchangeApi`]. Grounded on
//! the teacher's `testkit::stream::ScriptedStream` pattern: pre-loaded
//! per-method results plus atomic/lock-guarded call counters so tests can
//! assert on both outcome and call shape without any network I/O.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::domain::order::{BrokerOrder, OrderKind, OrderState};
use crate::domain::symbol::SymbolData;
use crate::domain::types::{Side, Trigger};
use crate::error::Error;
use crate::port::exchange::{Balance, ExchangeApi, PositionToAmount, Ticker};

/// Per-method call counts, snapshotted by [`FakeExchangeApi::calls`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Calls {
    pub ticker: u32,
    pub wallet_balances: u32,
    pub position: u32,
    pub position_to_amount: u32,
    pub limit_order: u32,
    pub market_order: u32,
    pub stop_order: u32,
    pub active_orders: u32,
    pub cancel_orders: u32,
    pub order: u32,
    pub update_order_price: u32,
}

struct Inner {
    tickers: VecDeque<Ticker>,
    last_ticker: Ticker,
    wallet_balances: Vec<Balance>,
    position_to_amount: Option<PositionToAmount>,
    position: Decimal,
    symbol_data: SymbolData,
    orders: HashMap<String, BrokerOrder>,
    order_states: HashMap<String, OrderState>,
    next_id: u64,
    calls: Calls,
    /// When set, every order-placement call fails with this error instead of
    /// succeeding — used to script `aggressiveEntry`'s retry-then-give-up path.
    fail_placements: Option<String>,
}

/// A scripted, in-memory [`ExchangeApi`] for unit and integration tests.
/// Defaults: flat ticker at 100/100/100, no balances, zero position, a
/// symbol with 8dp amount precision / 2dp price precision and no minimum
/// order size. Override any of these with the `with_*` builders before
/// wrapping in an `Arc` and handing to an [`crate::domain::exchange::Exchange`].
pub struct FakeExchangeApi {
    inner: Mutex<Inner>,
}

impl FakeExchangeApi {
    pub fn new() -> Self {
        let flat = Ticker {
            bid: Decimal::ONE_HUNDRED,
            ask: Decimal::ONE_HUNDRED,
            last_price: Decimal::ONE_HUNDRED,
        };
        Self {
            inner: Mutex::new(Inner {
                tickers: VecDeque::new(),
                last_ticker: flat,
                wallet_balances: Vec::new(),
                position_to_amount: None,
                position: Decimal::ZERO,
                symbol_data: SymbolData {
                    min_order_size: Decimal::ZERO,
                    asset_precision: 8,
                    price_precision: 2,
                },
                orders: HashMap::new(),
                order_states: HashMap::new(),
                next_id: 1,
                calls: Calls::default(),
                fail_placements: None,
            }),
        }
    }

    pub fn with_ticker(self, ticker: Ticker) -> Self {
        self.inner.lock().last_ticker = ticker;
        self
    }

    /// Mutate the live ticker after construction — for tests driving a
    /// ratchet or polling loop across multiple ticks on an already-shared
    /// `Arc<FakeExchangeApi>`.
    pub fn set_ticker(&self, ticker: Ticker) {
        let mut inner = self.inner.lock();
        inner.tickers.clear();
        inner.last_ticker = ticker;
    }

    /// Queue a sequence of tickers; each `ticker()` call pops the next one.
    /// Once exhausted, the last queued ticker repeats forever.
    pub fn with_tickers(self, tickers: Vec<Ticker>) -> Self {
        self.inner.lock().tickers = tickers.into();
        self
    }

    pub fn with_wallet_balances(self, balances: Vec<Balance>) -> Self {
        self.inner.lock().wallet_balances = balances;
        self
    }

    pub fn with_position(self, position: Decimal) -> Self {
        self.inner.lock().position = position;
        self
    }

    pub fn with_position_to_amount(self, result: PositionToAmount) -> Self {
        self.inner.lock().position_to_amount = Some(result);
        self
    }

    pub fn with_symbol_data(self, data: SymbolData) -> Self {
        self.inner.lock().symbol_data = data;
        self
    }

    pub fn with_failing_placements(self, reason: impl Into<String>) -> Self {
        self.inner.lock().fail_placements = Some(reason.into());
        self
    }

    pub fn calls(&self) -> Calls {
        self.inner.lock().calls
    }

    /// Directly set the terminal/ongoing state an `order(id)` call will
    /// return for `order_id` — lets a test script a fill or a cancellation
    /// without going through a real matching engine.
    pub fn set_order_state(&self, order_id: &str, state: OrderState) {
        self.inner.lock().order_states.insert(order_id.to_string(), state);
    }

    pub fn order_count(&self) -> usize {
        self.inner.lock().orders.len()
    }

    fn place(
        &self,
        symbol: &str,
        amount: Decimal,
        price: Option<Decimal>,
        side: Side,
        kind: OrderKind,
    ) -> Result<BrokerOrder, Error> {
        let mut inner = self.inner.lock();
        if let Some(reason) = inner.fail_placements.clone() {
            return Err(Error::ApiTransient(reason));
        }
        let id = format!("fake-{}", inner.next_id);
        inner.next_id += 1;
        let order = BrokerOrder {
            id: id.clone(),
            kind,
            symbol: symbol.to_string(),
            side,
            amount,
            price,
        };
        inner.orders.insert(id.clone(), order.clone());
        inner.order_states.insert(
            id.clone(),
            OrderState {
                id,
                amount,
                remaining: amount,
                executed: Decimal::ZERO,
                is_filled: false,
                is_open: true,
            },
        );
        Ok(order)
    }
}

impl Default for FakeExchangeApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeApi for FakeExchangeApi {
    async fn init(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn add_symbol(&self, _symbol: &str) -> Result<SymbolData, Error> {
        Ok(self.inner.lock().symbol_data)
    }

    async fn terminate(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn ticker(&self, _symbol: &str) -> Result<Ticker, Error> {
        let mut inner = self.inner.lock();
        inner.calls.ticker += 1;
        if let Some(next) = inner.tickers.pop_front() {
            inner.last_ticker = next;
        }
        Ok(inner.last_ticker)
    }

    async fn wallet_balances(&self) -> Result<Vec<Balance>, Error> {
        let mut inner = self.inner.lock();
        inner.calls.wallet_balances += 1;
        Ok(inner.wallet_balances.clone())
    }

    async fn position(&self, _symbol: &str) -> Result<Decimal, Error> {
        let mut inner = self.inner.lock();
        inner.calls.position += 1;
        Ok(inner.position)
    }

    async fn position_to_amount(
        &self,
        _symbol: &str,
        _position_spec: &str,
        side: Side,
        amount_spec: &str,
    ) -> Result<PositionToAmount, Error> {
        let mut inner = self.inner.lock();
        inner.calls.position_to_amount += 1;
        if let Some(scripted) = inner.position_to_amount {
            return Ok(scripted);
        }
        let amount = amount_spec.trim().parse::<Decimal>().unwrap_or(Decimal::ZERO);
        Ok(PositionToAmount { side, amount })
    }

    async fn limit_order(
        &self,
        symbol: &str,
        amount: Decimal,
        price: Decimal,
        side: Side,
        _post_only: bool,
        _reduce_only: bool,
    ) -> Result<BrokerOrder, Error> {
        self.inner.lock().calls.limit_order += 1;
        self.place(symbol, amount, Some(price), side, OrderKind::Limit)
    }

    async fn market_order(
        &self,
        symbol: &str,
        amount: Decimal,
        side: Side,
        _is_everything: bool,
    ) -> Result<BrokerOrder, Error> {
        self.inner.lock().calls.market_order += 1;
        self.place(symbol, amount, None, side, OrderKind::Market)
    }

    async fn stop_order(
        &self,
        symbol: &str,
        amount: Decimal,
        price: Decimal,
        side: Side,
        _trigger: Trigger,
    ) -> Result<BrokerOrder, Error> {
        self.inner.lock().calls.stop_order += 1;
        self.place(symbol, amount, Some(price), side, OrderKind::Stop)
    }

    async fn active_orders(&self, symbol: &str, side: Side) -> Result<Vec<OrderState>, Error> {
        let mut inner = self.inner.lock();
        inner.calls.active_orders += 1;
        let ids: Vec<String> = inner
            .orders
            .values()
            .filter(|o| o.symbol == symbol && o.side == side)
            .map(|o| o.id.clone())
            .collect();
        Ok(ids
            .into_iter()
            .filter_map(|id| inner.order_states.get(&id).cloned())
            .collect())
    }

    async fn cancel_orders(&self, orders: &[BrokerOrder]) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        inner.calls.cancel_orders += 1;
        for order in orders {
            if let Some(state) = inner.order_states.get_mut(&order.id) {
                if state.is_open {
                    state.is_open = false;
                    state.remaining = Decimal::ZERO;
                }
            }
        }
        Ok(())
    }

    async fn order(&self, order_id: &str) -> Result<Option<OrderState>, Error> {
        let mut inner = self.inner.lock();
        inner.calls.order += 1;
        Ok(inner.order_states.get(order_id).cloned())
    }

    async fn update_order_price(
        &self,
        order: &BrokerOrder,
        price: Decimal,
    ) -> Result<BrokerOrder, Error> {
        let mut inner = self.inner.lock();
        inner.calls.update_order_price += 1;
        let mut updated = order.clone();
        updated.price = Some(price);
        inner.orders.insert(updated.id.clone(), updated.clone());
        if let Some(state) = inner.order_states.get_mut(&updated.id) {
            state.amount = updated.amount;
        }
        Ok(updated)
    }
}

/// Convenience: an `Arc`-wrapped fake, ready to hand to `Exchange::new`.
pub fn fake_exchange_api() -> Arc<dyn ExchangeApi> {
    Arc::new(FakeExchangeApi::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn ticker_sequence_then_repeats_last() {
        let fake = FakeExchangeApi::new().with_tickers(vec![
            Ticker { bid: dec!(1), ask: dec!(1), last_price: dec!(1) },
            Ticker { bid: dec!(2), ask: dec!(2), last_price: dec!(2) },
        ]);
        assert_eq!(fake.ticker("X").await.unwrap().bid, dec!(1));
        assert_eq!(fake.ticker("X").await.unwrap().bid, dec!(2));
        assert_eq!(fake.ticker("X").await.unwrap().bid, dec!(2));
        assert_eq!(fake.calls().ticker, 3);
    }

    #[tokio::test]
    async fn placements_are_tracked_and_fillable() {
        let fake = FakeExchangeApi::new();
        let order = fake
            .limit_order("X", dec!(1), dec!(100), Side::Buy, false, false)
            .await
            .unwrap();
        assert_eq!(fake.calls().limit_order, 1);

        let state = fake.order(&order.id).await.unwrap().unwrap();
        assert!(state.is_open && !state.is_filled);

        fake.set_order_state(
            &order.id,
            OrderState {
                id: order.id.clone(),
                amount: dec!(1),
                remaining: dec!(0),
                executed: dec!(1),
                is_filled: true,
                is_open: false,
            },
        );
        let filled = fake.order(&order.id).await.unwrap().unwrap();
        assert!(filled.is_filled);
    }

    #[tokio::test]
    async fn cancel_orders_closes_them() {
        let fake = FakeExchangeApi::new();
        let order = fake
            .stop_order("X", dec!(1), dec!(90), Side::Sell, Trigger::Last)
            .await
            .unwrap();
        fake.cancel_orders(&[order.clone()]).await.unwrap();
        let state = fake.order(&order.id).await.unwrap().unwrap();
        assert!(!state.is_open);
        assert_eq!(fake.calls().cancel_orders, 1);
    }

    #[tokio::test]
    async fn failing_placements_return_api_transient() {
        let fake = FakeExchangeApi::new().with_failing_placements("venue down");
        let err = fake
            .market_order("X", dec!(1), Side::Buy, false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ApiTransient(_)));
    }
}
