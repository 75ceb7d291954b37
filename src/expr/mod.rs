//! Expression evaluator (§2.1): normalizes offsets, durations, and
//! conditions out of the loosely-typed strings the parser produces.

pub mod condition;
pub mod duration;
pub mod offset;

pub use condition::Condition;
pub use duration::parse_duration_secs;
pub use offset::OffsetSpec;
