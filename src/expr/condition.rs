//! Condition grammar and evaluation for `continueIf`/`stopIf` (GLOSSARY,
//! §4.3). Date comparisons are day-precision UTC from `YYYY-MM-DD`; time
//! comparisons are `HH:mm` UTC "today"; price tests use `(bid+ask)/2`;
//! position tests use signed position size.

use chrono::{NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    Never,
    True,
    False,
    IsAfterDate,
    IsOnOrAfterDate,
    IsBeforeDate,
    IsOnOrBeforeDate,
    IsSameDate,
    IsAfterTime,
    IsBeforeTime,
    PositionLessThan,
    PositionGreaterThan,
    PositionLessThanEq,
    PositionGreaterThanEq,
    PositionLong,
    PositionShort,
    PositionNone,
    PriceLessThan,
    PriceGreaterThan,
    PriceLessThanEq,
    PriceGreaterThanEq,
}

impl Condition {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        Ok(match raw.trim() {
            "always" => Self::Always,
            "never" => Self::Never,
            "true" => Self::True,
            "false" => Self::False,
            "isAfterDate" => Self::IsAfterDate,
            "isOnOrAfterDate" => Self::IsOnOrAfterDate,
            "isBeforeDate" => Self::IsBeforeDate,
            "isOnOrBeforeDate" => Self::IsOnOrBeforeDate,
            "isSameDate" => Self::IsSameDate,
            "isAfterTime" => Self::IsAfterTime,
            "isBeforeTime" => Self::IsBeforeTime,
            "positionLessThan" => Self::PositionLessThan,
            "positionGreaterThan" => Self::PositionGreaterThan,
            "positionLessThanEq" => Self::PositionLessThanEq,
            "positionGreaterThanEq" => Self::PositionGreaterThanEq,
            "positionLong" => Self::PositionLong,
            "positionShort" => Self::PositionShort,
            "positionNone" => Self::PositionNone,
            "priceLessThan" => Self::PriceLessThan,
            "priceGreaterThan" => Self::PriceGreaterThan,
            "priceLessThanEq" => Self::PriceLessThanEq,
            "priceGreaterThanEq" => Self::PriceGreaterThanEq,
            other => return Err(Error::InvalidArgument(format!("unknown condition: {other}"))),
        })
    }
}

/// Market/position context a condition is evaluated against.
pub struct EvalContext {
    pub position: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
}

impl EvalContext {
    fn mid_price(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }
}

impl Condition {
    /// Evaluate the condition. `value` is the comparator's right-hand side
    /// for the conditions that need one; conditions that don't (e.g.
    /// `positionLong`) ignore it.
    pub fn evaluate(self, ctx: &EvalContext, value: &str) -> Result<bool, Error> {
        use Condition::*;
        Ok(match self {
            Always | True => true,
            Never | False => false,
            IsAfterDate | IsOnOrAfterDate | IsBeforeDate | IsOnOrBeforeDate | IsSameDate => {
                let target = parse_date(value)?;
                let today = Utc::now().date_naive();
                match self {
                    IsAfterDate => today > target,
                    IsOnOrAfterDate => today >= target,
                    IsBeforeDate => today < target,
                    IsOnOrBeforeDate => today <= target,
                    IsSameDate => today == target,
                    _ => unreachable!(),
                }
            }
            IsAfterTime | IsBeforeTime => {
                let target = parse_time(value)?;
                let now = Utc::now().time();
                match self {
                    IsAfterTime => now > target,
                    IsBeforeTime => now < target,
                    _ => unreachable!(),
                }
            }
            PositionLessThan | PositionGreaterThan | PositionLessThanEq | PositionGreaterThanEq => {
                let target = parse_decimal(value)?;
                match self {
                    PositionLessThan => ctx.position < target,
                    PositionGreaterThan => ctx.position > target,
                    PositionLessThanEq => ctx.position <= target,
                    PositionGreaterThanEq => ctx.position >= target,
                    _ => unreachable!(),
                }
            }
            PositionLong => ctx.position > Decimal::ZERO,
            PositionShort => ctx.position < Decimal::ZERO,
            PositionNone => ctx.position == Decimal::ZERO,
            PriceLessThan | PriceGreaterThan | PriceLessThanEq | PriceGreaterThanEq => {
                let target = parse_decimal(value)?;
                let price = ctx.mid_price();
                match self {
                    PriceLessThan => price < target,
                    PriceGreaterThan => price > target,
                    PriceLessThanEq => price <= target,
                    PriceGreaterThanEq => price >= target,
                    _ => unreachable!(),
                }
            }
        })
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidArgument(format!("bad date: {raw}")))
}

fn parse_time(raw: &str) -> Result<NaiveTime, Error> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| Error::InvalidArgument(format!("bad time: {raw}")))
}

fn parse_decimal(raw: &str) -> Result<Decimal, Error> {
    Decimal::from_str(raw.trim()).map_err(|_| Error::InvalidArgument(format!("bad number: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ctx(position: Decimal, bid: Decimal, ask: Decimal) -> EvalContext {
        EvalContext { position, bid, ask }
    }

    #[test]
    fn parses_all_literals() {
        for lit in [
            "always",
            "never",
            "true",
            "false",
            "isAfterDate",
            "isOnOrAfterDate",
            "isBeforeDate",
            "isOnOrBeforeDate",
            "isSameDate",
            "isAfterTime",
            "isBeforeTime",
            "positionLessThan",
            "positionGreaterThan",
            "positionLessThanEq",
            "positionGreaterThanEq",
            "positionLong",
            "positionShort",
            "positionNone",
            "priceLessThan",
            "priceGreaterThan",
            "priceLessThanEq",
            "priceGreaterThanEq",
        ] {
            assert!(Condition::parse(lit).is_ok(), "failed to parse {lit}");
        }
    }

    #[test]
    fn rejects_unknown_condition() {
        assert!(Condition::parse("totallyMadeUp").is_err());
    }

    #[test]
    fn always_and_never_ignore_value() {
        let c = ctx(dec!(0), dec!(100), dec!(101));
        assert!(Condition::Always.evaluate(&c, "").unwrap());
        assert!(!Condition::Never.evaluate(&c, "").unwrap());
    }

    #[test]
    fn position_sign_predicates() {
        let long = ctx(dec!(5), dec!(100), dec!(101));
        let short = ctx(dec!(-5), dec!(100), dec!(101));
        let flat = ctx(dec!(0), dec!(100), dec!(101));
        assert!(Condition::PositionLong.evaluate(&long, "").unwrap());
        assert!(Condition::PositionShort.evaluate(&short, "").unwrap());
        assert!(Condition::PositionNone.evaluate(&flat, "").unwrap());
    }

    #[test]
    fn price_uses_mid_of_bid_ask() {
        let c = ctx(dec!(0), dec!(100), dec!(102));
        assert!(Condition::PriceGreaterThan.evaluate(&c, "100").unwrap());
        assert!(!Condition::PriceGreaterThan.evaluate(&c, "101.5").unwrap());
        assert!(Condition::PriceLessThanEq.evaluate(&c, "101").unwrap());
    }

    #[test]
    fn position_threshold_predicates() {
        let c = ctx(dec!(42), dec!(1), dec!(1));
        assert!(Condition::PositionGreaterThanEq.evaluate(&c, "42").unwrap());
        assert!(Condition::PositionLessThan.evaluate(&c, "43").unwrap());
        assert!(!Condition::PositionLessThan.evaluate(&c, "42").unwrap());
    }
}
