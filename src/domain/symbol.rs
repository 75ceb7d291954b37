//! Per-symbol trading constraints (§2.2, §3).

use rust_decimal::Decimal;
use std::collections::HashMap;

/// Minimum order size and rounding precision for one symbol, as returned by
/// the exchange API's `addSymbol` call.
#[derive(Debug, Clone, Copy)]
pub struct SymbolData {
    pub min_order_size: Decimal,
    pub asset_precision: u32,
    pub price_precision: u32,
}

/// Table of [`SymbolData`] populated by `Exchange::add_symbol` and read by
/// the normalizer and commands (§3).
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, SymbolData>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, data: SymbolData) {
        self.symbols.insert(symbol.into(), data);
    }

    pub fn get(&self, symbol: &str) -> Option<SymbolData> {
        self.symbols.get(symbol).copied()
    }

    pub fn round_price(&self, symbol: &str, price: Decimal) -> Decimal {
        match self.get(symbol) {
            Some(data) => price.round_dp(data.price_precision),
            None => price,
        }
    }

    pub fn round_amount(&self, symbol: &str, amount: Decimal) -> Decimal {
        match self.get(symbol) {
            Some(data) => amount.round_dp(data.asset_precision),
            None => amount,
        }
    }

    pub fn min_order_size(&self, symbol: &str) -> Decimal {
        self.get(symbol).map_or(Decimal::ZERO, |d| d.min_order_size)
    }
}
