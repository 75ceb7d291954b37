//! Message parser (§4.4): splits a raw webhook message into per-exchange
//! command blocks, each block into an ordered action list, and each action
//! into named/positional arguments. Parser failures never throw — malformed
//! blocks/actions/args are silently dropped (§4.4).

pub mod alert;
pub mod arg;

mod block;

pub use alert::extract_alert;

/// One parsed argument. `name` is `None` for a positional item; `index` is
/// the item's position in the textual argument list (§4.1, §4.4 step 3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArg {
    pub name: Option<String>,
    pub value: String,
    pub index: usize,
}

/// One parsed action: `name(arglist)` inside a block's body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAction {
    pub name: String,
    pub args: Vec<ParsedArg>,
}

impl ParsedAction {
    /// Re-serialize to the canonical `name(k=v, …)` form (§8 invariant:
    /// "Parser round-trip"). Positional args (`name: None`) are emitted bare;
    /// args are emitted in `index` order.
    pub fn to_canonical_string(&self) -> String {
        let mut args = self.args.iter().collect::<Vec<_>>();
        args.sort_by_key(|a| a.index);
        let rendered: Vec<String> = args
            .into_iter()
            .map(|a| match &a.name {
                Some(name) => format!("{name}={}", a.value),
                None => a.value.clone(),
            })
            .collect();
        format!("{}({})", self.name, rendered.join(", "))
    }
}

/// One parsed `exchange(symbol) { action; action; }` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBlock {
    pub exchange: String,
    pub symbol: String,
    pub actions: Vec<ParsedAction>,
}

/// Parse all command blocks out of a raw message. Blocks that don't match
/// the grammar (missing exchange/symbol/body) are silently skipped rather
/// than reported (§4.4).
pub fn parse_blocks(message: &str) -> Vec<ParsedBlock> {
    block::split_blocks(message)
        .into_iter()
        .filter_map(|raw| block::parse_block(raw))
        .collect()
}
