//! External integration ports consumed by the core (§6). Concrete exchange
//! adapters (REST/WebSocket clients for specific venues) are out of scope
//! (§1) — this module defines only the capability surface the rest of the
//! engine programs against, plus a sample HTTP notifier.

pub mod exchange;
pub mod notifier;

pub use exchange::{ExchangeApi, Ticker, UnconfiguredExchangeApi};
pub use notifier::Notifier;
