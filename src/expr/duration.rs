//! Duration parsing (GLOSSARY grammar: `NUMBER ("s"|"m"|"h"|"d")?`, seconds
//! default).

use crate::error::Error;

/// Parse a duration literal into whole seconds. Used by `wait(duration)`
/// and `aggressiveEntry`'s `timeLimit`.
pub fn parse_duration_secs(raw: &str) -> Result<u64, Error> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::InvalidArgument("empty duration".into()));
    }
    let (digits, unit) = match raw.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => (&raw[..raw.len() - 1], c.to_ascii_lowercase()),
        _ => (raw, 's'),
    };
    let n: u64 = digits
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("bad duration: {raw}")))?;
    let secs = match unit {
        's' => n,
        'm' => n * 60,
        'h' => n * 3600,
        'd' => n * 86400,
        other => {
            return Err(Error::InvalidArgument(format!(
                "unknown duration unit: {other}"
            )))
        }
    };
    Ok(secs)
}
