//! Alert extractor (§2 item 10, §6 Outbound): if the message contains the
//! token `{!}`, strip every command-block span and the marker itself,
//! collapse whitespace, and return the remainder for the notifier.

use crate::parser::block;

const MARKER: &str = "{!}";

/// Returns `None` if `message` doesn't contain `{!}` — the notifier is
/// never invoked in that case (§6 Outbound: "when `{!}` appears").
pub fn extract_alert(message: &str) -> Option<String> {
    if !message.contains(MARKER) {
        return None;
    }

    let mut spans = block::block_spans(message);
    spans.sort_by_key(|s| s.0);

    let mut stripped = String::with_capacity(message.len());
    let mut cursor = 0usize;
    for (start, end) in spans {
        if start < cursor {
            continue; // defensive: overlapping spans shouldn't occur
        }
        stripped.push_str(&message[cursor..start]);
        cursor = end;
    }
    stripped.push_str(&message[cursor..]);

    let stripped = stripped.replace(MARKER, " ");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    Some(collapsed)
}
