//! Small enums validated by the argument normalizer (§4.1).

use std::fmt;

/// Order side. Normalization guarantees that any `side` reaching a command
/// body is exactly one of these two values (§3 invariants, §8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Parse a lowercased side string. Anything other than `buy`/`sell` is
    /// rejected by the caller (`validateSide`, §4.1 step 1) — this helper
    /// does not coerce.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "buy" => Some(Self::Buy),
            "sell" => Some(Self::Sell),
            _ => None,
        }
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        })
    }
}

/// Exchange-side trigger reference for a stop order. Any input that does not
/// match one of these three literals coerces to `Last` with a warning
/// (§4.1 step 2, §8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trigger {
    Mark,
    Index,
    #[default]
    Last,
}

impl Trigger {
    /// Parse a lowercased trigger literal, coercing anything unrecognized to
    /// `Last` rather than failing — this never returns `None`.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "mark" => Self::Mark,
            "index" => Self::Index,
            "last" => Self::Last,
            _ => Self::Last,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mark => "mark",
            Self::Index => "index",
            Self::Last => "last",
        })
    }
}
