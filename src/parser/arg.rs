//! Argument splitting (§4.4 pass 3): comma-separated tokens honoring a
//! single level of double-quoted values. Each token is `name = "value"`,
//! `name = value`, `"value"`, or bare `value`; indices are assigned in
//! textual order.

use crate::parser::ParsedArg;

/// Split `params` (the text between an action's parens) into positional
/// and named arguments, honoring one level of double quotes around commas
/// and `=` signs within a value.
pub(super) fn split_args(params: &str) -> Vec<ParsedArg> {
    split_top_level(params)
        .into_iter()
        .enumerate()
        .filter_map(|(index, token)| parse_token(token.trim(), index))
        .collect()
}

/// Split on commas that are not inside a double-quoted span.
fn split_top_level(s: &str) -> Vec<&str> {
    if s.trim().is_empty() {
        return Vec::new();
    }
    let mut tokens = Vec::new();
    let mut in_quotes = false;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                tokens.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    tokens.push(&s[start..]);
    tokens
}

fn parse_token(token: &str, index: usize) -> Option<ParsedArg> {
    if token.is_empty() {
        return None;
    }
    if let Some(eq) = find_top_level_eq(token) {
        let name = token[..eq].trim();
        if name.is_empty() {
            return None;
        }
        let value = unquote(token[eq + 1..].trim());
        return Some(ParsedArg {
            name: Some(name.to_string()),
            value,
            index,
        });
    }
    Some(ParsedArg {
        name: None,
        value: unquote(token),
        index,
    })
}

/// Find the `=` that separates `name` from `value`, ignoring one inside a
/// quoted value (e.g. `tag = "a=b"`).
fn find_top_level_eq(token: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (i, c) in token.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '=' if !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}
