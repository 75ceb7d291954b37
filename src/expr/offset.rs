//! Offset parsing and resolution (§4.1 step 5, GLOSSARY: "Offset").
//!
//! `OffsetSpec` is the tagged union the design notes (§9) call for in place
//! of a dynamically-typed string: `Ticks(n)` for a plain number, `Percent(p)`
//! for `N%`, `Absolute(x)` for `@X`.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::domain::types::Side;
use crate::error::Error;
use crate::port::exchange::Ticker;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OffsetSpec {
    Ticks(Decimal),
    Percent(Decimal),
    Absolute(Decimal),
}

impl OffsetSpec {
    /// Parse the offset grammar: `NUMBER | NUMBER "%" | "@" NUMBER`.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix('@') {
            let x = Decimal::from_str(rest)
                .map_err(|_| Error::InvalidArgument(format!("bad absolute offset: {raw}")))?;
            return Ok(Self::Absolute(x));
        }
        if let Some(rest) = raw.strip_suffix('%') {
            let p = Decimal::from_str(rest)
                .map_err(|_| Error::InvalidArgument(format!("bad percent offset: {raw}")))?;
            return Ok(Self::Percent(p));
        }
        let n = Decimal::from_str(raw)
            .map_err(|_| Error::InvalidArgument(format!("bad offset: {raw}")))?;
        Ok(Self::Ticks(n))
    }

    /// Resolve against a reference price in the side-favourable direction.
    /// `favorable_sign` is `+1` when moving the reference price up is
    /// favourable for `side` (selling), `-1` when moving it down is
    /// favourable (buying). `Absolute` ignores the reference entirely.
    fn resolve(self, reference: Decimal, favorable_sign: Decimal) -> Decimal {
        match self {
            Self::Absolute(x) => x,
            Self::Ticks(n) => reference + favorable_sign * n,
            Self::Percent(p) => reference + favorable_sign * reference * p / Decimal::ONE_HUNDRED,
        }
    }
}

/// The side-quoted reference price and favourable-direction sign used by
/// `offset_to_absolute_price` (§4.1 step 5): buying is favoured by a lower
/// price (quoted off the bid), selling by a higher price (quoted off the
/// ask).
fn reference_and_sign(side: Side, ticker: &Ticker) -> (Decimal, Decimal) {
    match side {
        Side::Buy => (ticker.bid, Decimal::NEGATIVE_ONE),
        Side::Sell => (ticker.ask, Decimal::ONE),
    }
}

/// `offsetToAbsolutePrice(symbol, side, offset)` (§4.1 step 5). `side` here
/// is whichever side the offset should be favourable for — callers that
/// want a *protective* price (stops, §4.3) pass `side.opposite()`.
pub fn offset_to_absolute_price(side: Side, ticker: &Ticker, offset: OffsetSpec) -> Decimal {
    let (reference, sign) = reference_and_sign(side, ticker);
    offset.resolve(reference, sign)
}
