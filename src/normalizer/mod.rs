//! Argument normalizer (§4.1): merges a command's declared defaults with
//! the parser's positional/named arguments, then runs the fixed validation
//! pipeline every command shares (`side`, `trigger`, `background`,
//! `position`→amount, `offset`→price, balance-clamped `amount`).

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::warn;

use crate::context::CommandCtx;
use crate::domain::types::{Side, Trigger};
use crate::error::Error;
use crate::expr::offset::{offset_to_absolute_price, OffsetSpec};
use crate::parser::ParsedArg;

/// A command's argument table after §4.1's merge + validation pipeline.
/// Backed by a plain string map — mirrors the source's dynamically-typed
/// argument bag (§9 design note); typed accessors below do the parsing.
#[derive(Debug, Clone, Default)]
pub struct Args(HashMap<String, String>);

impl Args {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key) && !self.0[key].is_empty()
    }

    pub fn decimal(&self, key: &str) -> Result<Decimal, Error> {
        let raw = self
            .get(key)
            .ok_or_else(|| Error::InvalidArgument(format!("missing argument: {key}")))?;
        Decimal::from_str(raw.trim())
            .map_err(|_| Error::InvalidArgument(format!("bad number for {key}: {raw}")))
    }

    pub fn decimal_or(&self, key: &str, default: Decimal) -> Decimal {
        self.get(key)
            .and_then(|v| Decimal::from_str(v.trim()).ok())
            .unwrap_or(default)
    }

    pub fn bool_flag(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn side(&self) -> Option<Side> {
        self.get("side").and_then(Side::parse)
    }

    pub fn opposite_side(&self) -> Option<Side> {
        self.get("oppositeSide").and_then(Side::parse)
    }

    pub fn trigger(&self) -> Trigger {
        self.get("trigger")
            .map(Trigger::parse_or_default)
            .unwrap_or_default()
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }
}

/// §4.1 step 0: merge `defaults` (in declaration order) with the parser's
/// `parsed` items. Positional items bind to defaults by position; named
/// items override by name; unknown names are discarded.
pub fn merge_args(defaults: &[(&str, &str)], parsed: &[ParsedArg]) -> Args {
    let mut values: HashMap<String, String> = defaults
        .iter()
        .map(|&(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let default_keys: Vec<&str> = defaults.iter().map(|&(k, _)| k).collect();

    let mut ordered: Vec<&ParsedArg> = parsed.iter().collect();
    ordered.sort_by_key(|a| a.index);

    let mut next_positional = 0usize;
    for arg in ordered {
        match &arg.name {
            None => {
                if let Some(key) = default_keys.get(next_positional) {
                    values.insert((*key).to_string(), arg.value.clone());
                }
                next_positional += 1;
            }
            Some(name) => {
                if default_keys.contains(&name.as_str()) {
                    values.insert(name.clone(), arg.value.clone());
                }
            }
        }
    }

    Args(values)
}

/// §4.1 step 1: lowercase, require `buy`/`sell`, set `oppositeSide`.
pub fn validate_side(args: &mut Args) -> Result<Side, Error> {
    let raw = args
        .get("side")
        .ok_or_else(|| Error::InvalidArgument("missing side".into()))?;
    let side = Side::parse(raw)
        .ok_or_else(|| Error::InvalidArgument(format!("side must be buy or sell, got {raw}")))?;
    args.set("side", side.to_string());
    args.set("oppositeSide", side.opposite().to_string());
    Ok(side)
}

/// §4.1 step 2: coerce anything outside the trigger enum to `last`, with a
/// warning rather than a failure.
pub fn validate_trigger(args: &mut Args) -> Trigger {
    let trigger = match args.get("trigger") {
        Some(raw) => {
            let parsed = Trigger::parse_or_default(raw);
            if !raw.trim().is_empty() && parsed.to_string() != raw.to_ascii_lowercase() {
                warn!(raw, "unrecognized trigger, coercing to last");
            }
            parsed
        }
        None => Trigger::Last,
    };
    args.set("trigger", trigger.to_string());
    trigger
}

/// §4.1 step 3: the literal string `"true"` (case-insensitive) becomes
/// true; everything else becomes false.
pub fn validate_background(args: &mut Args) -> bool {
    let background = args.bool_flag("background");
    args.set("background", background.to_string());
    background
}

/// §4.1 step 4: only runs if `side`, `amount`, `position` are all present.
/// Replaces `side`/`amount`/`oppositeSide` with the exchange's computed
/// values; fails with `ZeroSize` if the computed amount is zero.
pub async fn calculate_position(ctx: &CommandCtx, args: &mut Args, side: Side) -> Result<(), Error> {
    if !args.has("amount") || !args.has("position") {
        return Ok(());
    }
    let position_spec = args.get("position").unwrap_or_default().to_string();
    let amount_spec = args.get("amount").unwrap_or_default().to_string();

    let computed = ctx
        .exchange
        .api()
        .position_to_amount(&ctx.symbol, &position_spec, side, &amount_spec)
        .await?;

    if computed.amount.is_zero() {
        return Err(Error::ZeroSize(format!(
            "position {position_spec} resolves to zero size for {}",
            ctx.symbol
        )));
    }

    args.set("side", computed.side.to_string());
    args.set("oppositeSide", computed.side.opposite().to_string());
    args.set("amount", computed.amount.to_string());
    Ok(())
}

/// §4.1 step 5: convert `offset` into an absolute `orderPrice` for `side`.
/// Only runs if `offset` is present. Returns the computed price.
pub async fn offset_to_price(ctx: &CommandCtx, args: &mut Args, side: Side) -> Result<Option<Decimal>, Error> {
    let Some(raw) = args.get("offset").filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let spec = OffsetSpec::parse(raw)?;
    let ticker = ctx.exchange.api().ticker(&ctx.symbol).await?;
    let price = offset_to_absolute_price(side, &ticker, spec);
    let price = ctx.exchange.round_price(&ctx.symbol, price);
    args.set("orderPrice", price.to_string());
    Ok(Some(price))
}

/// §4.1 step 6: only runs if `side`, `orderPrice`, `amount` are all
/// present. Clamps `amount` to available balance and the symbol's minimum
/// order size; stores the pre-clamp value as `originalAmount`. Fails with
/// `ZeroSize` if clamped to zero.
pub async fn calculate_amount(ctx: &CommandCtx, args: &mut Args) -> Result<Option<Decimal>, Error> {
    if !args.has("orderPrice") || !args.has("amount") {
        return Ok(None);
    }
    let requested = args.decimal("amount")?;
    args.set("originalAmount", requested.to_string());

    let balances = ctx.exchange.api().wallet_balances().await?;
    let symbol_upper = ctx.symbol.to_ascii_uppercase();
    let available = balances
        .iter()
        .find(|b| symbol_upper.contains(&b.currency.to_ascii_uppercase()))
        .map(|b| b.available)
        .unwrap_or(requested);

    let clamped = ctx
        .exchange
        .round_amount(&ctx.symbol, requested.min(available));
    let min_size = ctx.exchange.min_order_size(&ctx.symbol);

    if clamped.is_zero() || clamped < min_size {
        return Err(Error::ZeroSize(format!(
            "amount clamped below minimum order size for {}",
            ctx.symbol
        )));
    }

    args.set("amount", clamped.to_string());
    Ok(Some(clamped))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg(name: Option<&str>, value: &str, index: usize) -> ParsedArg {
        ParsedArg {
            name: name.map(str::to_string),
            value: value.to_string(),
            index,
        }
    }

    #[test]
    fn positional_args_bind_in_declaration_order() {
        let defaults = [("side", "buy"), ("amount", "0"), ("offset", "")];
        let parsed = vec![arg(None, "sell", 0), arg(None, "5", 1)];
        let args = merge_args(&defaults, &parsed);
        assert_eq!(args.get("side"), Some("sell"));
        assert_eq!(args.get("amount"), Some("5"));
        assert_eq!(args.get("offset"), Some(""));
    }

    #[test]
    fn named_args_override_positional() {
        let defaults = [("side", "buy"), ("amount", "0")];
        let parsed = vec![arg(None, "sell", 0), arg(Some("side"), "buy", 1)];
        let args = merge_args(&defaults, &parsed);
        assert_eq!(args.get("side"), Some("buy"));
    }

    #[test]
    fn unknown_names_are_discarded() {
        let defaults = [("side", "buy")];
        let parsed = vec![arg(Some("bogus"), "x", 0)];
        let args = merge_args(&defaults, &parsed);
        assert_eq!(args.get("bogus"), None);
        assert_eq!(args.get("side"), Some("buy"));
    }

    #[test]
    fn validate_side_sets_opposite() {
        let defaults = [("side", "buy")];
        let mut args = merge_args(&defaults, &[]);
        let side = validate_side(&mut args).unwrap();
        assert_eq!(side, Side::Buy);
        assert_eq!(args.get("oppositeSide"), Some("sell"));
    }

    #[test]
    fn validate_side_rejects_garbage() {
        let defaults = [("side", "sideways")];
        let mut args = merge_args(&defaults, &[]);
        assert!(validate_side(&mut args).is_err());
    }

    #[test]
    fn validate_trigger_coerces_unknown_to_last() {
        let defaults = [("trigger", "bogus")];
        let mut args = merge_args(&defaults, &[]);
        assert_eq!(validate_trigger(&mut args), Trigger::Last);
        assert_eq!(args.get("trigger"), Some("last"));
    }

    #[test]
    fn validate_background_is_case_insensitive() {
        let defaults = [("background", "TRUE")];
        let mut args = merge_args(&defaults, &[]);
        assert!(validate_background(&mut args));
    }

    mod async_steps {
        use super::*;
        use crate::context::CommandCtx;
        use crate::domain::exchange::{Exchange, PollingBounds};
        use crate::domain::session::Session;
        use crate::port::exchange::{Balance, BalanceType, PositionToAmount, Ticker};
        use crate::port::notifier::LoggingNotifier;
        use crate::testkit::exchange::FakeExchangeApi;
        use rust_decimal_macros::dec;
        use std::sync::Arc;

        fn ctx(fake: Arc<FakeExchangeApi>) -> CommandCtx {
            let exchange = Arc::new(Exchange::new("deribit", fake, PollingBounds { min: 1, max: 5 }));
            CommandCtx {
                exchange,
                symbol: "BTC-PERP".into(),
                session: Arc::new(parking_lot::Mutex::new(Session::new())),
                notifier: Arc::new(LoggingNotifier),
            }
        }

        /// §8 scenario 6: defaults `{side:buy, amount:0, position:""}`, passed
        /// `position=42` → the exchange resolves that to a buy of 32 (to reach
        /// position 42 from a current 10), and the normalizer adopts that
        /// side/amount verbatim.
        #[tokio::test]
        async fn calculate_position_adopts_the_exchanges_resolved_side_and_amount() {
            let fake = Arc::new(FakeExchangeApi::new().with_position_to_amount(PositionToAmount {
                side: Side::Buy,
                amount: dec!(32),
            }));
            let ctx = ctx(fake);

            let defaults = [("side", "buy"), ("amount", "0"), ("position", "")];
            let mut args = merge_args(&defaults, &[arg(Some("position"), "42", 0)]);
            let side = validate_side(&mut args).unwrap();

            calculate_position(&ctx, &mut args, side).await.unwrap();

            assert_eq!(args.side(), Some(Side::Buy));
            assert_eq!(args.get("amount"), Some("32"));
            assert_eq!(args.get("position"), Some("42"));
        }

        #[tokio::test]
        async fn calculate_position_is_skipped_when_position_is_absent() {
            let fake = Arc::new(FakeExchangeApi::new());
            let ctx = ctx(fake.clone());

            let defaults = [("side", "buy"), ("amount", "1")];
            let mut args = merge_args(&defaults, &[]);
            calculate_position(&ctx, &mut args, Side::Buy).await.unwrap();

            assert_eq!(args.get("amount"), Some("1"));
            assert_eq!(fake.calls().position_to_amount, 0);
        }

        #[tokio::test]
        async fn offset_to_price_quotes_off_the_bid_for_a_buy() {
            let fake = Arc::new(FakeExchangeApi::new().with_ticker(Ticker {
                bid: dec!(1000),
                ask: dec!(1001),
                last_price: dec!(1000),
            }));
            let ctx = ctx(fake);

            let defaults = [("offset", "")];
            let mut args = merge_args(&defaults, &[arg(Some("offset"), "100", 0)]);
            let price = offset_to_price(&ctx, &mut args, Side::Buy).await.unwrap();

            assert_eq!(price, Some(dec!(900)));
            assert_eq!(args.get("orderPrice"), Some("900"));
        }

        #[tokio::test]
        async fn calculate_amount_clamps_to_available_balance() {
            let fake = Arc::new(FakeExchangeApi::new().with_wallet_balances(vec![Balance {
                currency: "BTC".into(),
                balance_type: BalanceType::Spot,
                amount: dec!(0.5),
                available: dec!(0.5),
            }]));
            let ctx = ctx(fake);

            let defaults = [("orderPrice", "1000"), ("amount", "2")];
            let mut args = merge_args(&defaults, &[]);
            let clamped = calculate_amount(&ctx, &mut args).await.unwrap();

            assert_eq!(clamped, Some(dec!(0.5)));
            assert_eq!(args.get("originalAmount"), Some("2"));
        }

        #[tokio::test]
        async fn calculate_amount_fails_with_zero_size_when_clamped_to_nothing() {
            let fake = Arc::new(FakeExchangeApi::new().with_wallet_balances(vec![]));
            let ctx = ctx(fake);

            let defaults = [("orderPrice", "1000"), ("amount", "0")];
            let mut args = merge_args(&defaults, &[]);
            assert!(calculate_amount(&ctx, &mut args).await.is_err());
        }
    }
}
