//! Flat error taxonomy for the command execution engine.
//!
//! Mirrors §7 of the specification: `InvalidArgument` and `ZeroSize` abort a
//! single command, `ApiTransient` wraps a failed exchange API call, and
//! `AbortSequence` is a distinguished non-error outcome (see
//! [`AbortSequence`]) rather than a variant of [`Error`] — a `stopIf`/
//! `continueIf` short-circuit is not a bug and must never be logged as one.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("zero size: {0}")]
    ZeroSize(String),

    #[error("exchange api call failed: {0}")]
    ApiTransient(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Distinguished non-error control-flow outcome raised by `stopIf`/`continueIf`
/// (§7). Carried as the `Err` arm of a dedicated `Result` so it can never be
/// mistaken for, or silently coerced into, [`Error`] — the sequence runner
/// matches on it explicitly and does not log it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbortSequence;

/// Outcome of running a single command to its synchronous completion point:
/// either it produced a scheduler state, or it asked to abort the block.
pub type CommandResult<T> = std::result::Result<T, CommandOutcome>;

#[derive(Debug)]
pub enum CommandOutcome {
    /// A real failure: `InvalidArgument`, `ZeroSize`, or `ApiTransient`.
    Failed(Error),
    /// `stopIf`/`continueIf` requested a silent, clean stop of the block.
    Abort(AbortSequence),
}

impl From<Error> for CommandOutcome {
    fn from(e: Error) -> Self {
        CommandOutcome::Failed(e)
    }
}

impl From<AbortSequence> for CommandOutcome {
    fn from(a: AbortSequence) -> Self {
        CommandOutcome::Abort(a)
    }
}
