//! Block and action splitting (§4.4 passes 1-2). Hand-rolled scanner
//! implementing the same "find all non-overlapping matches" semantics the
//! spec describes as regex passes, since the grammar (no nested parens,
//! no nested braces) is simple enough that a scanner is clearer than
//! escaping it into a regex literal.

use crate::parser::arg::split_args;
use crate::parser::{ParsedAction, ParsedBlock};

pub(super) struct RawBlock<'a> {
    pub exchange: &'a str,
    pub symbol: &'a str,
    pub body: &'a str,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_lowercase()
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

/// Scan `message` for `NAME "(" [^()]* ")" WS? "{" [^{}]* "}"` spans,
/// left-to-right, non-overlapping (§4.4 pass 1).
pub(super) fn split_blocks(message: &str) -> Vec<RawBlock<'_>> {
    scan_block_spans(message)
        .into_iter()
        .filter_map(|span| {
            let exchange = &message[span.name_start..span.name_end];
            let symbol = message[span.paren_open + 1..span.paren_close].trim();
            let body = &message[span.brace_open + 1..span.brace_close];
            if exchange.is_empty() || symbol.is_empty() || body.trim().is_empty() {
                return None;
            }
            Some(RawBlock {
                exchange,
                symbol,
                body,
            })
        })
        .collect()
}

/// Byte ranges of every structurally complete `NAME "(" ... ")" "{" ... "}"`
/// span, whether or not its parts are non-empty (the alert extractor, §4.10,
/// strips every such span regardless of emptiness).
pub(super) fn block_spans(message: &str) -> Vec<(usize, usize)> {
    scan_block_spans(message)
        .into_iter()
        .map(|s| (s.name_start, s.brace_close + 1))
        .collect()
}

struct BlockSpan {
    name_start: usize,
    name_end: usize,
    paren_open: usize,
    paren_close: usize,
    brace_open: usize,
    brace_close: usize,
}

fn scan_block_spans(message: &str) -> Vec<BlockSpan> {
    let bytes = message.as_bytes();
    let mut blocks = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        if !is_ident_start(bytes[i] as char) {
            i += 1;
            continue;
        }
        let name_start = i;
        let mut j = i + 1;
        while j < bytes.len() && is_ident_continue(bytes[j] as char) {
            j += 1;
        }
        if j >= bytes.len() || bytes[j] as char != '(' {
            i = name_start + 1;
            continue;
        }
        let paren_open = j;
        let Some(paren_close) = find_unnested(message, paren_open + 1, '(', ')') else {
            i = name_start + 1;
            continue;
        };

        let mut k = paren_close + 1;
        while k < bytes.len() && (bytes[k] as char).is_whitespace() {
            k += 1;
        }
        if k >= bytes.len() || bytes[k] as char != '{' {
            i = name_start + 1;
            continue;
        }
        let brace_open = k;
        let Some(brace_close) = find_unnested(message, brace_open + 1, '{', '}') else {
            i = name_start + 1;
            continue;
        };

        blocks.push(BlockSpan {
            name_start,
            name_end: j,
            paren_open,
            paren_close,
            brace_open,
            brace_close,
        });
        i = brace_close + 1;
    }

    blocks
}

/// Find the index of `close` that terminates the span started by the
/// character before `start`, failing if a nested `open` appears first (the
/// grammar's content classes are `[^()]*`/`[^{}]*` — no nesting allowed).
fn find_unnested(s: &str, start: usize, open: char, close: char) -> Option<usize> {
    for (offset, c) in s[start..].char_indices() {
        if c == open {
            return None;
        }
        if c == close {
            return Some(start + offset);
        }
    }
    None
}

pub(super) fn parse_block(raw: RawBlock<'_>) -> Option<ParsedBlock> {
    let actions = split_actions(raw.body)
        .into_iter()
        .filter_map(parse_action)
        .collect::<Vec<_>>();

    Some(ParsedBlock {
        exchange: raw.exchange.to_string(),
        symbol: raw.symbol.to_string(),
        actions,
    })
}

struct RawAction<'a> {
    name: &'a str,
    params: &'a str,
}

/// `([a-z]+) "(" ([^)]*) ")"` found-all within a block body (§4.4 pass 2).
fn split_actions(body: &str) -> Vec<RawAction<'_>> {
    let bytes = body.as_bytes();
    let mut actions = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        if !(bytes[i] as char).is_ascii_lowercase() {
            i += 1;
            continue;
        }
        let name_start = i;
        let mut j = i + 1;
        while j < bytes.len() && (bytes[j] as char).is_ascii_lowercase() {
            j += 1;
        }
        if j >= bytes.len() || bytes[j] as char != '(' {
            i = name_start + 1;
            continue;
        }
        let name = &body[name_start..j];
        let Some(close) = find_unnested(body, j + 1, '(', ')') else {
            i = name_start + 1;
            continue;
        };
        actions.push(RawAction {
            name,
            params: &body[j + 1..close],
        });
        i = close + 1;
    }

    actions
}

fn parse_action(raw: RawAction<'_>) -> Option<ParsedAction> {
    if raw.name.is_empty() {
        return None;
    }
    Some(ParsedAction {
        name: raw.name.to_string(),
        args: split_args(raw.params),
    })
}
