//! Exchange API port (§6): the narrow, stateless capability set every
//! command and the argument normalizer program against. Concrete adapters
//! for specific venues are out of scope (§1) — only the trait and its value
//! types live here; [`crate::testkit`] provides an in-memory implementation
//! for tests.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::order::{BrokerOrder, OrderState};
use crate::domain::symbol::SymbolData;
use crate::domain::types::{Side, Trigger};
use crate::error::Error;

/// `ticker(symbol) → {bid, ask, last_price}` (§6). Numeric strings on the
/// wire are parsed to `Decimal` at the port boundary so nothing downstream
/// touches raw strings.
#[derive(Debug, Clone, Copy)]
pub struct Ticker {
    pub bid: Decimal,
    pub ask: Decimal,
    pub last_price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceType {
    Spot,
    Margin,
    Derivative,
}

/// One entry of `walletBalances()` (§6).
#[derive(Debug, Clone)]
pub struct Balance {
    pub balance_type: BalanceType,
    pub currency: String,
    pub amount: Decimal,
    pub available: Decimal,
}

/// Result of `positionToAmount` (§4.1 step 4): the normalizer replaces
/// `side`/`amount`/`oppositeSide` with these computed values.
#[derive(Debug, Clone, Copy)]
pub struct PositionToAmount {
    pub side: Side,
    pub amount: Decimal,
}

/// The exchange API port consumed by the normalizer, scheduler, and
/// commands (§6). Every method may fail with [`Error::ApiTransient`] — a
/// network error or a null/unexpected response from the venue.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    async fn init(&self) -> Result<(), Error>;

    async fn add_symbol(&self, symbol: &str) -> Result<SymbolData, Error>;

    async fn terminate(&self) -> Result<(), Error>;

    async fn ticker(&self, symbol: &str) -> Result<Ticker, Error>;

    async fn wallet_balances(&self) -> Result<Vec<Balance>, Error>;

    /// Current signed position size for `symbol` (positive long, negative
    /// short, zero flat). Needed by `continueIf`/`stopIf`'s position
    /// predicates (GLOSSARY "Condition") — not itself part of
    /// `positionToAmount`, which resolves a *target* position instead of
    /// reporting the current one.
    async fn position(&self, symbol: &str) -> Result<Decimal, Error>;

    /// `positionToAmount(symbol, positionSpec, side, amountSpec)` (§4.1 step
    /// 4): resolves a target position into a concrete side+amount given the
    /// current position and wallet balance.
    async fn position_to_amount(
        &self,
        symbol: &str,
        position_spec: &str,
        side: Side,
        amount_spec: &str,
    ) -> Result<PositionToAmount, Error>;

    #[allow(clippy::too_many_arguments)]
    async fn limit_order(
        &self,
        symbol: &str,
        amount: Decimal,
        price: Decimal,
        side: Side,
        post_only: bool,
        reduce_only: bool,
    ) -> Result<BrokerOrder, Error>;

    async fn market_order(
        &self,
        symbol: &str,
        amount: Decimal,
        side: Side,
        is_everything: bool,
    ) -> Result<BrokerOrder, Error>;

    async fn stop_order(
        &self,
        symbol: &str,
        amount: Decimal,
        price: Decimal,
        side: Side,
        trigger: Trigger,
    ) -> Result<BrokerOrder, Error>;

    async fn active_orders(&self, symbol: &str, side: Side) -> Result<Vec<OrderState>, Error>;

    async fn cancel_orders(&self, orders: &[BrokerOrder]) -> Result<(), Error>;

    async fn order(&self, order_id: &str) -> Result<Option<OrderState>, Error>;

    /// `updateOrderPrice(order, price) → {id}`; the returned order's id may
    /// differ from the input's (§3: "Broker order").
    async fn update_order_price(
        &self,
        order: &BrokerOrder,
        price: Decimal,
    ) -> Result<BrokerOrder, Error>;
}

/// Stand-in [`ExchangeApi`] for a credentials record that names a venue with
/// no bundled adapter (§1 Non-goals: per-exchange adapters are out of scope
/// for the core). `init`/`add_symbol`/`terminate` succeed trivially so the
/// manager's pool bookkeeping still works; every order-affecting call fails
/// with [`Error::ApiTransient`] rather than silently no-opping, so a
/// misconfigured deployment shows up in the logs instead of swallowing
/// orders (contrast with the `notSupported` *command*, §4.3, which is a
/// deliberate no-op for one unsupported feature on an otherwise-working
/// exchange).
pub struct UnconfiguredExchangeApi {
    name: String,
}

impl UnconfiguredExchangeApi {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn unconfigured(&self) -> Error {
        Error::ApiTransient(format!("no exchange adapter configured for '{}'", self.name))
    }
}

#[async_trait]
impl ExchangeApi for UnconfiguredExchangeApi {
    async fn init(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn add_symbol(&self, _symbol: &str) -> Result<SymbolData, Error> {
        Ok(SymbolData {
            min_order_size: Decimal::ZERO,
            asset_precision: 8,
            price_precision: 2,
        })
    }

    async fn terminate(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn ticker(&self, _symbol: &str) -> Result<Ticker, Error> {
        Err(self.unconfigured())
    }

    async fn wallet_balances(&self) -> Result<Vec<Balance>, Error> {
        Err(self.unconfigured())
    }

    async fn position(&self, _symbol: &str) -> Result<Decimal, Error> {
        Err(self.unconfigured())
    }

    async fn position_to_amount(
        &self,
        _symbol: &str,
        _position_spec: &str,
        _side: Side,
        _amount_spec: &str,
    ) -> Result<PositionToAmount, Error> {
        Err(self.unconfigured())
    }

    async fn limit_order(
        &self,
        _symbol: &str,
        _amount: Decimal,
        _price: Decimal,
        _side: Side,
        _post_only: bool,
        _reduce_only: bool,
    ) -> Result<BrokerOrder, Error> {
        Err(self.unconfigured())
    }

    async fn market_order(
        &self,
        _symbol: &str,
        _amount: Decimal,
        _side: Side,
        _is_everything: bool,
    ) -> Result<BrokerOrder, Error> {
        Err(self.unconfigured())
    }

    async fn stop_order(
        &self,
        _symbol: &str,
        _amount: Decimal,
        _price: Decimal,
        _side: Side,
        _trigger: Trigger,
    ) -> Result<BrokerOrder, Error> {
        Err(self.unconfigured())
    }

    async fn active_orders(&self, _symbol: &str, _side: Side) -> Result<Vec<OrderState>, Error> {
        Err(self.unconfigured())
    }

    async fn cancel_orders(&self, _orders: &[BrokerOrder]) -> Result<(), Error> {
        Err(self.unconfigured())
    }

    async fn order(&self, _order_id: &str) -> Result<Option<OrderState>, Error> {
        Err(self.unconfigured())
    }

    async fn update_order_price(&self, _order: &BrokerOrder, _price: Decimal) -> Result<BrokerOrder, Error> {
        Err(self.unconfigured())
    }
}
